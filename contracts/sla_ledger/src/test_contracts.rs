use crate::invariants::assert_ledger_sound;
use crate::policy::PolicyKind;
use crate::{
    Amount, ErrorKind, LedgerConfig, MemoryStore, PartyMode, SlaLedger, SlaState, StateStore,
};

pub(crate) fn sla_json(id: &str, provider: &str, client: &str, state: &str) -> String {
    format!(
        r#"{{"id":"{id}","name":"Agreement {id}","state":"{state}",
            "details":{{"id":"{id}","type":"agreement","name":"Agreement {id}",
                "provider":{{"id":"{provider}","name":"{provider}"}},
                "client":{{"id":"{client}","name":"{client}"}},
                "guarantees":[{{"name":"availability","constraint":"[uptime] > 0.99"}}]}}}}"#
    )
}

fn flat(value: i64) -> SlaLedger {
    SlaLedger::new(LedgerConfig::default().with_compensation(PolicyKind::Flat {
        value: Amount::from(value),
    }))
}

#[test]
fn test_create_contract_auto_registers_parties() {
    let ledger = SlaLedger::default();
    let mut store = MemoryStore::new();

    let contract = ledger
        .create_contract(&mut store, &sla_json("c1", "p1", "cl1", "started"))
        .unwrap();

    assert!(ledger.contract_exists(&store, "c1").unwrap());
    assert_eq!(contract.state, SlaState::Started);
    assert_eq!(contract.violation_count, 0);
    assert_eq!(contract.daily_value, Amount::ZERO);
    assert_eq!(ledger.user_balance(&store, "p1").unwrap(), Amount::from(500));
    assert_eq!(ledger.user_balance(&store, "cl1").unwrap(), Amount::from(500));
    assert_ledger_sound(&store);
}

#[test]
fn test_create_contract_stamps_policy_value() {
    let ledger = flat(20);
    let mut store = MemoryStore::new();
    let contract = ledger
        .create_contract(&mut store, &sla_json("c1", "p1", "cl1", "started"))
        .unwrap();
    assert_eq!(contract.compensation_value, Amount::from(20));
}

#[test]
fn test_derived_value_is_reproducible_across_ledgers() {
    let config = LedgerConfig::default().with_compensation(PolicyKind::Derived {
        min: Amount::from(10),
        span: 20,
    });
    let sla = sla_json("c7", "p1", "cl1", "started");

    let a = SlaLedger::new(config.clone())
        .create_contract(&mut MemoryStore::new(), &sla)
        .unwrap();
    let b = SlaLedger::new(config)
        .create_contract(&mut MemoryStore::new(), &sla)
        .unwrap();

    assert_eq!(a.compensation_value, b.compensation_value);
    assert!(a.compensation_value >= Amount::from(10));
    assert!(a.compensation_value < Amount::from(30));
}

#[test]
fn test_duplicate_contract_is_rejected() {
    let ledger = SlaLedger::default();
    let mut store = MemoryStore::new();
    let sla = sla_json("c1", "p1", "cl1", "started");
    ledger.create_contract(&mut store, &sla).unwrap();

    let err = ledger.create_contract(&mut store, &sla).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[test]
fn test_strict_parties_must_exist() {
    let ledger = SlaLedger::new(LedgerConfig {
        party_mode: PartyMode::Strict,
        ..LedgerConfig::default()
    });
    let mut store = MemoryStore::new();
    ledger
        .create_user(&mut store, "p1", "p1", "", Amount::from(50))
        .unwrap();

    let err = ledger
        .create_contract(&mut store, &sla_json("c1", "p1", "cl1", "started"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PartyNotFound);
    assert!(!ledger.contract_exists(&store, "c1").unwrap());
}

#[test]
fn test_empty_provider_is_bootstrapped() {
    let ledger = SlaLedger::new(LedgerConfig {
        party_mode: PartyMode::Strict,
        ..LedgerConfig::default()
    });
    let mut store = MemoryStore::new();
    ledger
        .create_user(&mut store, "p1", "p1", "", Amount::ZERO)
        .unwrap();
    ledger
        .create_user(&mut store, "cl1", "cl1", "", Amount::ZERO)
        .unwrap();

    ledger
        .create_contract(&mut store, &sla_json("c1", "p1", "cl1", "started"))
        .unwrap();

    assert_eq!(ledger.user_balance(&store, "p1").unwrap(), Amount::from(100));
    assert_eq!(ledger.user_balance(&store, "cl1").unwrap(), Amount::ZERO);
}

#[test]
fn test_bootstrap_can_be_disabled() {
    let ledger = SlaLedger::new(
        LedgerConfig {
            party_mode: PartyMode::AutoCreate {
                starting_balance: Amount::ZERO,
            },
            ..LedgerConfig::default()
        }
        .with_bootstrap_mint(None),
    );
    let mut store = MemoryStore::new();
    ledger
        .create_contract(&mut store, &sla_json("c1", "p1", "cl1", "started"))
        .unwrap();
    assert_eq!(ledger.user_balance(&store, "p1").unwrap(), Amount::ZERO);
}

#[test]
fn test_upsert_keeps_counters_and_value() {
    let ledger = flat(20);
    let mut store = MemoryStore::new();
    ledger
        .create_or_update_contract(&mut store, &sla_json("c1", "p1", "cl1", "started"))
        .unwrap();
    ledger.sla_violated(&mut store, "c1").unwrap();

    let updated = ledger
        .create_or_update_contract(&mut store, &sla_json("c1", "p1", "cl1", "ongoing"))
        .unwrap();

    assert_eq!(updated.state, SlaState::Ongoing);
    assert_eq!(updated.violation_count, 1);
    assert_eq!(updated.compensation_value, Amount::from(20));
    assert_eq!(ledger.read_contract(&store, "c1").unwrap(), updated);
    assert_ledger_sound(&store);
}

#[test]
fn test_upsert_is_idempotent() {
    let ledger = SlaLedger::default();
    let mut store = MemoryStore::new();
    let sla = sla_json("c1", "p1", "cl1", "started");

    ledger.create_or_update_contract(&mut store, &sla).unwrap();
    let snapshot = store.clone();
    ledger.create_or_update_contract(&mut store, &sla).unwrap();

    assert_eq!(store, snapshot);
}

#[test]
fn test_upsert_can_stop_a_contract() {
    let ledger = SlaLedger::default();
    let mut store = MemoryStore::new();
    ledger
        .create_or_update_contract(&mut store, &sla_json("c1", "p1", "cl1", "started"))
        .unwrap();
    let stopped = ledger
        .create_or_update_contract(&mut store, &sla_json("c1", "p1", "cl1", "stopped"))
        .unwrap();
    assert!(stopped.state.is_terminal());
}

#[test]
fn test_read_missing_contract() {
    let ledger = SlaLedger::default();
    let store = MemoryStore::new();
    assert_eq!(
        ledger.read_contract(&store, "nope").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(!ledger.contract_exists(&store, "nope").unwrap());
}

#[test]
fn test_delete_contract_keeps_users() {
    let ledger = SlaLedger::default();
    let mut store = MemoryStore::new();
    ledger
        .create_contract(&mut store, &sla_json("c1", "p1", "cl1", "started"))
        .unwrap();

    ledger.delete_contract(&mut store, "c1").unwrap();

    assert!(!ledger.contract_exists(&store, "c1").unwrap());
    assert!(ledger.user_exists(&store, "p1").unwrap());
    assert_eq!(
        ledger.delete_contract(&mut store, "c1").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_get_all_contracts_lists_only_contracts() {
    let ledger = SlaLedger::default();
    let mut store = MemoryStore::new();
    for id in ["c2", "c1", "c3"] {
        ledger
            .create_contract(&mut store, &sla_json(id, "p1", "cl1", "started"))
            .unwrap();
    }

    let ids: Vec<String> = ledger
        .get_all_contracts(&store)
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, ["c1", "c2", "c3"]);
}

#[test]
fn test_malformed_sla_writes_nothing() {
    let ledger = SlaLedger::default();
    let mut store = MemoryStore::new();
    let err = ledger
        .create_contract(&mut store, r#"{"id":"c1","details":{}}"#)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedPayload);
    assert!(store.get_state_by_range("", "").unwrap().is_empty());
}
