//! # Storage
//!
//! Typed helpers over the world state. Keys are partitioned by a tagged
//! prefix so each record kind lives in its own keyspace:
//!
//! | Key                 | Type             | Description                   |
//! |---------------------|------------------|-------------------------------|
//! | `user_<id>`         | `User`           | User record and token account |
//! | `contract_<id>`     | `ContractRecord` | SLA contract and its counters |
//!
//! Scans over one keyspace use a partial-key query on its prefix, so a
//! contract sweep never decodes a user record and vice versa.
//!
//! Records are JSON. A stored value that fails to decode is reported as a
//! world-state failure, not as a caller error.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::errors::{Result, StoreError};
use crate::store::{RichQuery, StateStore};
use crate::types::{ContractRecord, User, USER_DOC_TYPE};

const USER_PREFIX: &str = "user_";
const CONTRACT_PREFIX: &str = "contract_";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    User(String),
    Contract(String),
}

impl DataKey {
    pub fn user(id: &str) -> Self {
        Self::User(id.to_string())
    }

    pub fn contract(id: &str) -> Self {
        Self::Contract(id.to_string())
    }

    pub fn to_key(&self) -> String {
        match self {
            Self::User(id) => format!("{USER_PREFIX}{id}"),
            Self::Contract(id) => format!("{CONTRACT_PREFIX}{id}"),
        }
    }

    /// Recover the typed key from a raw world-state key.
    pub fn parse(raw: &str) -> Option<Self> {
        if let Some(id) = raw.strip_prefix(USER_PREFIX) {
            return Some(Self::User(id.to_string()));
        }
        raw.strip_prefix(CONTRACT_PREFIX)
            .map(|id| Self::Contract(id.to_string()))
    }
}

// ── Encoding ─────────────────────────────────────────────────────────

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| StoreError::new(format!("failed to encode {key}: {e}")).into())
}

fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::new(format!("failed to decode {key}: {e}")).into())
}

fn load<T, S>(store: &S, key: &DataKey) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: StateStore + ?Sized,
{
    let key = key.to_key();
    match store.get_state(&key)? {
        Some(bytes) => decode(&key, &bytes).map(Some),
        None => Ok(None),
    }
}

fn save<T, S>(store: &mut S, key: &DataKey, value: &T) -> Result<()>
where
    T: Serialize,
    S: StateStore + ?Sized,
{
    let key = key.to_key();
    let bytes = encode(&key, value)?;
    debug!(key = %key, bytes = bytes.len(), "put state");
    store.put_state(&key, bytes)?;
    Ok(())
}

// ── Users ────────────────────────────────────────────────────────────

pub fn load_user<S: StateStore + ?Sized>(store: &S, id: &str) -> Result<Option<User>> {
    load(store, &DataKey::user(id))
}

pub fn save_user<S: StateStore + ?Sized>(store: &mut S, user: &User) -> Result<()> {
    save(store, &DataKey::user(&user.id), user)
}

pub fn user_key_exists<S: StateStore + ?Sized>(store: &S, id: &str) -> Result<bool> {
    Ok(store.get_state(&DataKey::user(id).to_key())?.is_some())
}

/// First user whose `field` equals `value`, via the rich-query index.
pub fn find_user_by<S: StateStore + ?Sized>(
    store: &S,
    field: &str,
    value: &str,
) -> Result<Option<User>> {
    let query = RichQuery::equals(&[("docType", USER_DOC_TYPE), (field, value)]);
    let hits = store.get_query_result(&query)?;
    match hits.first() {
        Some(kv) => decode(&kv.key, &kv.value).map(Some),
        None => Ok(None),
    }
}

pub fn all_users<S: StateStore + ?Sized>(store: &S) -> Result<Vec<User>> {
    store
        .get_state_by_partial_key(USER_PREFIX)?
        .iter()
        .map(|kv| decode(&kv.key, &kv.value))
        .collect()
}

// ── Contracts ────────────────────────────────────────────────────────

pub fn load_contract<S: StateStore + ?Sized>(
    store: &S,
    id: &str,
) -> Result<Option<ContractRecord>> {
    load(store, &DataKey::contract(id))
}

pub fn save_contract<S: StateStore + ?Sized>(
    store: &mut S,
    contract: &ContractRecord,
) -> Result<()> {
    save(store, &DataKey::contract(&contract.id), contract)
}

pub fn contract_key_exists<S: StateStore + ?Sized>(store: &S, id: &str) -> Result<bool> {
    Ok(store.get_state(&DataKey::contract(id).to_key())?.is_some())
}

pub fn delete_contract<S: StateStore + ?Sized>(store: &mut S, id: &str) -> Result<()> {
    store.delete_state(&DataKey::contract(id).to_key())?;
    Ok(())
}

/// Ids of every contract, in key order.
pub fn contract_ids<S: StateStore + ?Sized>(store: &S) -> Result<Vec<String>> {
    Ok(store
        .get_state_by_partial_key(CONTRACT_PREFIX)?
        .into_iter()
        .filter_map(|kv| match DataKey::parse(&kv.key) {
            Some(DataKey::Contract(id)) => Some(id),
            _ => None,
        })
        .collect())
}

pub fn all_contracts<S: StateStore + ?Sized>(store: &S) -> Result<Vec<ContractRecord>> {
    store
        .get_state_by_partial_key(CONTRACT_PREFIX)?
        .iter()
        .map(|kv| decode(&kv.key, &kv.value))
        .collect()
}
