//! # World state
//!
//! The ledger never owns persisted bytes. It reads and writes through the
//! [`StateStore`] trait, which mirrors the key-value interface a permissioned
//! ledger peer hands to its contracts:
//!
//! | Operation                  | Meaning                                          |
//! |----------------------------|--------------------------------------------------|
//! | `get_state`                | point read, `None` when absent                   |
//! | `put_state`                | point write                                      |
//! | `delete_state`             | point delete                                     |
//! | `get_state_by_range`       | ordered scan of `[start, end)`, empty = open     |
//! | `get_state_by_partial_key` | ordered scan of every key under a prefix         |
//! | `get_query_result`         | rich query over JSON documents (`{"selector":…}`) |
//!
//! [`MemoryStore`] is the ordered in-memory implementation used by the
//! bridge host and by the tests.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::errors::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One entry returned by a scan or a rich query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

pub trait StateStore {
    fn get_state(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> StoreResult<()>;

    fn delete_state(&mut self, key: &str) -> StoreResult<()>;

    /// Ordered scan over `[start, end)`. An empty `start` or `end` leaves
    /// that side of the range open.
    fn get_state_by_range(&self, start: &str, end: &str) -> StoreResult<Vec<KeyValue>>;

    fn get_state_by_partial_key(&self, prefix: &str) -> StoreResult<Vec<KeyValue>> {
        let end = prefix_end(prefix);
        self.get_state_by_range(prefix, &end)
    }

    /// Evaluate a rich query against every JSON document in the store.
    fn get_query_result(&self, query: &str) -> StoreResult<Vec<KeyValue>> {
        let query = RichQuery::parse(query)?;
        Ok(self
            .get_state_by_range("", "")?
            .into_iter()
            .filter(|kv| query.matches(&kv.value))
            .collect())
    }
}

/// Exclusive upper bound for a prefix scan.
pub fn prefix_end(prefix: &str) -> String {
    let mut end = prefix.to_string();
    end.push(char::MAX);
    end
}

pub(crate) fn in_range(key: &str, start: &str, end: &str) -> bool {
    (start.is_empty() || key >= start) && (end.is_empty() || key < end)
}

/// A CouchDB-style selector: every listed field must equal the given value.
#[derive(Debug, Clone, PartialEq)]
pub struct RichQuery {
    selector: Map<String, Value>,
}

impl RichQuery {
    pub fn parse(raw: &str) -> StoreResult<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| StoreError::new(format!("invalid rich query: {e}")))?;
        match value.get("selector") {
            Some(Value::Object(selector)) => Ok(Self {
                selector: selector.clone(),
            }),
            _ => Err(StoreError::new("rich query has no selector object")),
        }
    }

    /// Build the query string for an equality selector.
    pub fn equals(fields: &[(&str, &str)]) -> String {
        let selector: Map<String, Value> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        serde_json::json!({ "selector": selector }).to_string()
    }

    /// Non-JSON values never match.
    pub fn matches(&self, doc: &[u8]) -> bool {
        let Ok(Value::Object(doc)) = serde_json::from_slice::<Value>(doc) else {
            return false;
        };
        self.selector
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }
}

/// Ordered in-memory world state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from previously persisted entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StateStore for MemoryStore {
    fn get_state(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        if key.is_empty() {
            return Err(StoreError::new("empty key"));
        }
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete_state(&mut self, key: &str) -> StoreResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn get_state_by_range(&self, start: &str, end: &str) -> StoreResult<Vec<KeyValue>> {
        Ok(self
            .entries
            .iter()
            .filter(|(k, _)| in_range(k, start, end))
            .map(|(k, v)| KeyValue {
                key: k.clone(),
                value: v.clone(),
            })
            .collect())
    }
}
