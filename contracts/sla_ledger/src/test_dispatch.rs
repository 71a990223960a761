use crate::test_contracts::sla_json;
use crate::{Amount, ErrorKind, Invocation, Ledger, MemoryStore, SlaLedger, User};

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn setup() -> Ledger<MemoryStore> {
    Ledger::new(SlaLedger::default(), MemoryStore::new())
}

#[test]
fn test_parse_known_functions() {
    assert_eq!(
        Invocation::parse("SLAViolated", &args(&["c1"])).unwrap(),
        Invocation::SlaViolated("c1".into())
    );
    assert_eq!(
        Invocation::parse("RefundAllSLAs", &[]).unwrap(),
        Invocation::RefundAllSlas
    );
    assert_eq!(
        Invocation::parse("TransferTokens", &args(&["a", "b", "2.5"])).unwrap(),
        Invocation::TransferTokens {
            from: "a".into(),
            to: "b".into(),
            amount: Amount::new(25, 1),
        }
    );
}

#[test]
fn test_create_user_three_args_uses_name_as_id() {
    let invocation = Invocation::parse("CreateUser", &args(&["alice", "PK", "10000"])).unwrap();
    assert_eq!(
        invocation,
        Invocation::CreateUser {
            name: "alice".into(),
            id: "alice".into(),
            public_key: "PK".into(),
            initial_balance: Amount::from(10000),
        }
    );
}

#[test]
fn test_parse_rejects_bad_calls() {
    for (function, arguments) in [
        ("Burn", args(&["x"])),
        ("ReadContract", args(&[])),
        ("Mint", args(&["a", "lots"])),
        ("CreateUser", args(&["only-name"])),
    ] {
        let err = Invocation::parse(function, &arguments).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedPayload, "{function}");
    }
}

#[test]
fn test_function_name_round_trips() {
    for (function, arguments) in [
        ("InitLedger", args(&[])),
        ("UserBalance", args(&["u"])),
        ("CreateOrUpdateContract", args(&["{}"])),
        ("RefundSLA", args(&["c1"])),
        ("GetAllContracts", args(&[])),
    ] {
        let invocation = Invocation::parse(function, &arguments).unwrap();
        assert_eq!(invocation.function(), function);
    }
}

#[test]
fn test_submit_and_evaluate_by_name() {
    let mut ledger = setup();
    let created = ledger
        .submit_transaction("CreateUser", &args(&["alice", "alice-id", "PK", "500"]))
        .unwrap();
    let user: User = serde_json::from_slice(&created).unwrap();
    assert_eq!(user.id, "alice-id");

    let exists = ledger
        .evaluate_transaction("UserExists", &args(&["PK"]))
        .unwrap();
    assert_eq!(exists, b"true");

    let balance = ledger
        .evaluate_transaction("UserBalance", &args(&["alice-id"]))
        .unwrap();
    assert_eq!(balance, br#""500""#);
}

#[test]
fn test_evaluate_never_commits() {
    let ledger = setup();
    let response = ledger
        .evaluate(&Invocation::Mint {
            account: "fresh".into(),
            amount: Amount::from(10),
        })
        .unwrap();
    assert_eq!(response, br#""10""#);
    assert!(ledger.world().is_empty());
}

#[test]
fn test_prepare_then_commit() {
    let mut ledger = setup();
    let prepared = ledger
        .prepare(&Invocation::CreateContract(sla_json(
            "c1", "p1", "cl1", "started",
        )))
        .unwrap();
    assert!(ledger.world().is_empty());
    // Contract plus both auto-created parties.
    assert_eq!(prepared.write_set.len(), 3);

    ledger.commit(&prepared.write_set).unwrap();
    let exists = ledger
        .evaluate(&Invocation::ContractExists("c1".into()))
        .unwrap();
    assert_eq!(exists, b"true");
}

#[test]
fn test_read_only_classification() {
    assert!(Invocation::ReadContract("c1".into()).is_read_only());
    assert!(Invocation::GetAllContracts.is_read_only());
    assert!(!Invocation::RefundAllSlas.is_read_only());
    assert!(!Invocation::SlaViolated("c1".into()).is_read_only());
}

#[test]
fn test_init_ledger_is_a_no_op() {
    let mut ledger = setup();
    assert_eq!(ledger.submit(&Invocation::InitLedger).unwrap(), b"null");
    assert!(ledger.world().is_empty());
}
