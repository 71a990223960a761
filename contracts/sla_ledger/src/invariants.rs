#![allow(dead_code)]

use std::collections::HashSet;

use crate::storage::{all_contracts, all_users};
use crate::store::StateStore;
use crate::types::{ContractRecord, SEVERITY_BUCKETS};
use crate::Amount;

/// No account may ever hold a negative balance.
pub fn assert_balances_non_negative<S: StateStore + ?Sized>(store: &S) {
    for user in all_users(store).unwrap() {
        assert!(
            user.balance >= Amount::ZERO,
            "user {} has negative balance ({})",
            user.id,
            user.balance
        );
    }
}

/// Names and non-empty public keys identify at most one user.
pub fn assert_users_unique<S: StateStore + ?Sized>(store: &S) {
    let users = all_users(store).unwrap();
    let mut names = HashSet::new();
    let mut keys = HashSet::new();
    for user in &users {
        assert!(
            names.insert(user.name.as_str()),
            "name {} is held by more than one user",
            user.name
        );
        if !user.public_key.is_empty() {
            assert!(
                keys.insert(user.public_key.as_str()),
                "public key of {} is held by more than one user",
                user.id
            );
        }
    }
}

/// Sum of all balances in the world state.
pub fn total_supply<S: StateStore + ?Sized>(store: &S) -> Amount {
    all_users(store).unwrap().iter().map(|u| u.balance).sum()
}

/// Transfers move tokens, they never create or destroy them.
pub fn assert_supply_conserved<S: StateStore + ?Sized>(store: &S, before: Amount) {
    let after = total_supply(store);
    assert_eq!(
        after, before,
        "token supply changed from {before} to {after} without a mint"
    );
}

/// The lifetime counter equals all violations seen, settled or not.
pub fn assert_counters_consistent(contract: &ContractRecord) {
    let bucketed: u64 = (0..SEVERITY_BUCKETS)
        .map(|b| contract.daily_violations[b] + contract.total_violations[b])
        .sum();
    assert_eq!(
        contract.violation_count, bucketed,
        "contract {} counts {} violations but its buckets hold {}",
        contract.id, contract.violation_count, bucketed
    );
    assert!(
        contract.daily_value >= Amount::ZERO,
        "contract {} has negative accrual",
        contract.id
    );
}

pub fn assert_all_contracts_consistent<S: StateStore + ?Sized>(store: &S) {
    for contract in all_contracts(store).unwrap() {
        assert_counters_consistent(&contract);
    }
}

/// Every contract references two distinct registered parties.
pub fn assert_parties_registered<S: StateStore + ?Sized>(store: &S) {
    let ids: HashSet<String> = all_users(store).unwrap().into_iter().map(|u| u.id).collect();
    for contract in all_contracts(store).unwrap() {
        assert_ne!(contract.provider.id, contract.client.id);
        assert!(
            ids.contains(&contract.provider.id),
            "provider {} of {} is not registered",
            contract.provider.id,
            contract.id
        );
        assert!(
            ids.contains(&contract.client.id),
            "client {} of {} is not registered",
            contract.client.id,
            contract.id
        );
    }
}

pub fn assert_ledger_sound<S: StateStore + ?Sized>(store: &S) {
    assert_balances_non_negative(store);
    assert_users_unique(store);
    assert_all_contracts_consistent(store);
    assert_parties_registered(store);
}
