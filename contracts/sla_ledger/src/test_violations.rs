use rust_decimal::Decimal;

use crate::invariants::{assert_counters_consistent, assert_ledger_sound, total_supply};
use crate::policy::PolicyKind;
use crate::test_contracts::sla_json;
use crate::{Amount, ErrorKind, Invocation, Ledger, LedgerConfig, MemoryStore, SlaLedger};

fn setup(policy: PolicyKind) -> (SlaLedger, MemoryStore) {
    let ledger = SlaLedger::new(LedgerConfig::default().with_compensation(policy));
    let mut store = MemoryStore::new();
    ledger
        .create_contract(&mut store, &sla_json("c1", "p1", "cl1", "started"))
        .unwrap();
    (ledger, store)
}

fn violation(sla_id: &str, importance: &str) -> String {
    weighted_violation(sla_id, importance, 1)
}

fn weighted_violation(sla_id: &str, name: &str, weight: i64) -> String {
    format!(
        concat!(
            r#"{{"id":"v1","sla_id":"{}","guarantee_id":"availability","#,
            r#""importanceName":"{}","importance":{},"appID":"app-1"}}"#
        ),
        sla_id, name, weight
    )
}

#[test]
fn test_flat_violation_pays_client_immediately() {
    let (ledger, mut store) = setup(PolicyKind::Flat {
        value: Amount::from(20),
    });
    let supply = total_supply(&store);

    let contract = ledger.sla_violated(&mut store, "c1").unwrap();

    assert_eq!(contract.violation_count, 1);
    assert_eq!(ledger.user_balance(&store, "p1").unwrap(), Amount::from(480));
    assert_eq!(ledger.user_balance(&store, "cl1").unwrap(), Amount::from(520));
    assert_eq!(total_supply(&store), supply);
    assert_ledger_sound(&store);
}

#[test]
fn test_violation_document_is_counted_by_severity() {
    let (ledger, mut store) = setup(PolicyKind::Flat {
        value: Amount::from(20),
    });

    ledger
        .sla_violated(&mut store, &violation("c1", "Serious"))
        .unwrap();
    let contract = ledger
        .sla_violated(&mut store, &violation("c1", "serious"))
        .unwrap();

    assert_eq!(contract.violation_count, 2);
    assert_eq!(contract.daily_violations, [0, 2, 0, 0]);
    assert_counters_consistent(&contract);
}

#[test]
fn test_tiered_warning_accrues_without_transfer() {
    let (ledger, mut store) = setup(PolicyKind::SeverityTiered {
        value: Amount::from(100),
    });

    let contract = ledger
        .sla_violated(&mut store, &violation("c1", "Warning"))
        .unwrap();

    assert_eq!(contract.daily_value, Decimal::new(15, 1));
    assert_eq!(contract.daily_violations, [1, 0, 0, 0]);
    assert_eq!(ledger.user_balance(&store, "p1").unwrap(), Amount::from(500));
    assert_eq!(ledger.user_balance(&store, "cl1").unwrap(), Amount::from(500));
}

#[test]
fn test_tiered_accruals_add_up() {
    let (ledger, mut store) = setup(PolicyKind::SeverityTiered {
        value: Amount::from(100),
    });
    for importance in ["Warning", "Serious", "Catastrophic"] {
        ledger
            .sla_violated(&mut store, &violation("c1", importance))
            .unwrap();
    }
    let contract = ledger.read_contract(&store, "c1").unwrap();
    assert_eq!(contract.daily_value, Decimal::new(105, 1));
    assert_eq!(contract.daily_violations, [1, 1, 1, 0]);
}

#[test]
fn test_unknown_severity_lands_in_fallback_bucket() {
    let (ledger, mut store) = setup(PolicyKind::SeverityTiered {
        value: Amount::from(100),
    });
    let contract = ledger
        .sla_violated(&mut store, &violation("c1", "Cosmetic"))
        .unwrap();
    assert_eq!(contract.daily_violations, [0, 0, 0, 1]);
    assert_eq!(contract.daily_value, Amount::ZERO);
}

#[test]
fn test_violation_on_missing_contract() {
    let (ledger, mut store) = setup(PolicyKind::default());
    let err = ledger.sla_violated(&mut store, "nope").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_violation_on_stopped_contract_is_rejected() {
    let (ledger, mut store) = setup(PolicyKind::default());
    ledger
        .create_or_update_contract(&mut store, &sla_json("c1", "p1", "cl1", "stopped"))
        .unwrap();
    let snapshot = store.clone();

    let err = ledger.sla_violated(&mut store, "c1").unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ContractTerminal);
    assert_eq!(store, snapshot);
}

#[test]
fn test_unpayable_violation_changes_nothing() {
    let engine = SlaLedger::new(
        LedgerConfig {
            party_mode: crate::PartyMode::AutoCreate {
                starting_balance: Amount::from(5),
            },
            ..LedgerConfig::default()
        }
        .with_compensation(PolicyKind::Flat {
            value: Amount::from(20),
        }),
    );
    let mut ledger = Ledger::new(engine, MemoryStore::new());
    ledger
        .submit(&Invocation::CreateContract(sla_json(
            "c1", "p1", "cl1", "started",
        )))
        .unwrap();
    let before = ledger.world().clone();

    let err = ledger
        .submit(&Invocation::SlaViolated("c1".into()))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(ledger.world(), &before);
    let contract = ledger.engine().read_contract(ledger.world(), "c1").unwrap();
    assert_eq!(contract.violation_count, 0);
}

#[test]
fn test_importance_weighted_violation_scales_payment() {
    let (ledger, mut store) = setup(PolicyKind::ImportanceWeighted {
        value: Amount::from(10),
    });
    let supply = total_supply(&store);

    ledger
        .sla_violated(&mut store, &weighted_violation("c1", "Catastrophic", 3))
        .unwrap();
    assert_eq!(ledger.user_balance(&store, "p1").unwrap(), Amount::from(470));
    assert_eq!(ledger.user_balance(&store, "cl1").unwrap(), Amount::from(530));

    // A bare id weighs 1.
    ledger.sla_violated(&mut store, "c1").unwrap();
    assert_eq!(ledger.user_balance(&store, "cl1").unwrap(), Amount::from(540));

    // No importance on the document: counted, nothing paid.
    let contract = ledger
        .sla_violated(&mut store, &weighted_violation("c1", "Warning", 0))
        .unwrap();
    assert_eq!(contract.violation_count, 3);
    assert_eq!(ledger.user_balance(&store, "cl1").unwrap(), Amount::from(540));
    assert_eq!(total_supply(&store), supply);
    assert_ledger_sound(&store);
}

#[test]
fn test_overflowing_compensation_fails_cleanly() {
    let (ledger, mut store) = setup(PolicyKind::ImportanceWeighted {
        value: Decimal::MAX,
    });
    let snapshot = store.clone();

    let err = ledger
        .sla_violated(&mut store, &weighted_violation("c1", "Serious", 2))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidAmount);
    assert_eq!(store, snapshot);
}
