use rust_decimal::Decimal;

use crate::invariants::{assert_counters_consistent, assert_ledger_sound, total_supply};
use crate::policy::PolicyKind;
use crate::test_contracts::sla_json;
use crate::{
    Amount, ErrorKind, Invocation, Ledger, LedgerConfig, MemoryStore, PartyMode, RefundReport,
    SlaLedger, SweepMode,
};

fn tiered(sweep: SweepMode) -> SlaLedger {
    SlaLedger::new(
        LedgerConfig::default()
            .with_compensation(PolicyKind::SeverityTiered {
                value: Amount::from(100),
            })
            .with_sweep(sweep),
    )
}

fn warning(sla_id: &str) -> String {
    format!(r#"{{"sla_id":"{sla_id}","importanceName":"Warning"}}"#)
}

#[test]
fn test_refund_settles_accrual_and_resets_day() {
    let ledger = tiered(SweepMode::Abort);
    let mut store = MemoryStore::new();
    ledger
        .create_contract(&mut store, &sla_json("c1", "p1", "cl1", "started"))
        .unwrap();
    ledger.sla_violated(&mut store, &warning("c1")).unwrap();

    let refunded = ledger.refund_sla(&mut store, "c1").unwrap();

    assert_eq!(refunded, Decimal::new(15, 1));
    assert_eq!(ledger.user_balance(&store, "p1").unwrap(), Decimal::new(4985, 1));
    assert_eq!(ledger.user_balance(&store, "cl1").unwrap(), Decimal::new(5015, 1));

    let contract = ledger.read_contract(&store, "c1").unwrap();
    assert_eq!(contract.daily_value, Amount::ZERO);
    assert_eq!(contract.daily_violations, [0; 4]);
    assert_eq!(contract.total_violations, [1, 0, 0, 0]);
    assert_counters_consistent(&contract);
}

#[test]
fn test_second_refund_moves_nothing() {
    let ledger = tiered(SweepMode::Abort);
    let mut store = MemoryStore::new();
    ledger
        .create_contract(&mut store, &sla_json("c1", "p1", "cl1", "started"))
        .unwrap();
    ledger.sla_violated(&mut store, &warning("c1")).unwrap();
    ledger.refund_sla(&mut store, "c1").unwrap();
    let snapshot = store.clone();

    assert_eq!(ledger.refund_sla(&mut store, "c1").unwrap(), Amount::ZERO);
    assert_eq!(store, snapshot);
}

#[test]
fn test_refund_on_stopped_contract_is_rejected() {
    let ledger = tiered(SweepMode::Abort);
    let mut store = MemoryStore::new();
    ledger
        .create_contract(&mut store, &sla_json("c1", "p1", "cl1", "stopped"))
        .unwrap();
    assert_eq!(
        ledger.refund_sla(&mut store, "c1").unwrap_err().kind(),
        ErrorKind::ContractTerminal
    );
}

#[test]
fn test_sweep_refunds_live_and_skips_stopped() {
    let ledger = tiered(SweepMode::Abort);
    let mut store = MemoryStore::new();
    ledger
        .create_contract(&mut store, &sla_json("c1", "p1", "cl1", "started"))
        .unwrap();
    ledger
        .create_contract(&mut store, &sla_json("c2", "p1", "cl1", "ongoing"))
        .unwrap();
    ledger
        .create_contract(&mut store, &sla_json("c3", "p1", "cl1", "stopped"))
        .unwrap();
    ledger.sla_violated(&mut store, &warning("c1")).unwrap();
    ledger.sla_violated(&mut store, &warning("c2")).unwrap();
    let supply = total_supply(&store);

    let report = ledger.refund_all_slas(&mut store).unwrap();

    assert_eq!(report.refunded.len(), 2);
    assert_eq!(report.skipped, ["c3"]);
    assert!(report.failed.is_empty());
    assert_eq!(report.total_refunded(), Decimal::new(3, 0));
    assert_eq!(ledger.user_balance(&store, "cl1").unwrap(), Amount::from(503));
    assert_eq!(total_supply(&store), supply);
    assert_ledger_sound(&store);
}

#[test]
fn test_empty_registry_sweep() {
    let ledger = tiered(SweepMode::Abort);
    let mut store = MemoryStore::new();
    assert_eq!(
        ledger.refund_all_slas(&mut store).unwrap(),
        RefundReport::default()
    );
}

/// Contract c2's provider can't cover its accrual.
fn sweep_with_one_broke_provider(sweep: SweepMode) -> Ledger<MemoryStore> {
    let engine = SlaLedger::new(
        LedgerConfig {
            party_mode: PartyMode::Strict,
            bootstrap_mint: None,
            ..LedgerConfig::default()
        }
        .with_compensation(PolicyKind::SeverityTiered {
            value: Amount::from(100),
        })
        .with_sweep(sweep),
    );
    let mut ledger = Ledger::new(engine, MemoryStore::new());
    let setup = [
        Invocation::CreateUser {
            name: "rich".into(),
            id: "rich".into(),
            public_key: String::new(),
            initial_balance: Amount::from(500),
        },
        Invocation::CreateUser {
            name: "broke".into(),
            id: "broke".into(),
            public_key: String::new(),
            initial_balance: Amount::from(1),
        },
        Invocation::CreateUser {
            name: "client".into(),
            id: "client".into(),
            public_key: String::new(),
            initial_balance: Amount::ZERO,
        },
        Invocation::CreateContract(sla_json("c1", "rich", "client", "started")),
        Invocation::CreateContract(sla_json("c2", "broke", "client", "started")),
        Invocation::SlaViolated(warning("c1")),
        Invocation::SlaViolated(warning("c2")),
        Invocation::SlaViolated(warning("c2")),
    ];
    for invocation in &setup {
        ledger.submit(invocation).unwrap();
    }
    ledger
}

#[test]
fn test_abort_sweep_rolls_back_everything() {
    let mut ledger = sweep_with_one_broke_provider(SweepMode::Abort);
    let before = ledger.world().clone();

    let err = ledger.submit(&Invocation::RefundAllSlas).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(ledger.world(), &before);
}

#[test]
fn test_best_effort_sweep_reports_failures() {
    let mut ledger = sweep_with_one_broke_provider(SweepMode::BestEffort);

    let response = ledger.submit(&Invocation::RefundAllSlas).unwrap();
    let report: serde_json::Value = serde_json::from_slice(&response).unwrap();

    assert_eq!(report["refunded"][0]["contract_id"], "c1");
    assert_eq!(report["failed"][0]["contract_id"], "c2");
    assert_eq!(report["failed"][0]["kind"], "insufficient_funds");

    let engine = ledger.engine();
    let c1 = engine.read_contract(ledger.world(), "c1").unwrap();
    let c2 = engine.read_contract(ledger.world(), "c2").unwrap();
    assert_eq!(c1.daily_value, Amount::ZERO);
    assert_eq!(c2.daily_value, Decimal::new(3, 0));
    assert_eq!(c2.daily_violations, [2, 0, 0, 0]);
    assert_eq!(
        engine.user_balance(ledger.world(), "client").unwrap(),
        Decimal::new(15, 1)
    );
}
