//! Buffered transaction over a read-only world state.
//!
//! A [`Transaction`] reads through to its base store and keeps every write
//! in a private write-set. Nothing reaches the base until the caller takes
//! the [`WriteSet`] and applies it, so a failed invocation is discarded by
//! simply dropping the transaction. Transactions nest: a transaction over a
//! transaction acts as a savepoint.

use std::collections::BTreeMap;

use crate::store::{in_range, KeyValue, RichQuery, StateStore, StoreResult};

/// Pending writes; `None` marks a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSet {
    writes: BTreeMap<String, Option<Vec<u8>>>,
}

impl WriteSet {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&[u8]>)> {
        self.writes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    pub fn apply<S: StateStore + ?Sized>(&self, store: &mut S) -> StoreResult<()> {
        for (key, value) in &self.writes {
            match value {
                Some(bytes) => store.put_state(key, bytes.clone())?,
                None => store.delete_state(key)?,
            }
        }
        Ok(())
    }
}

pub struct Transaction<'a, S: StateStore + ?Sized> {
    base: &'a S,
    pending: WriteSet,
}

impl<'a, S: StateStore + ?Sized> Transaction<'a, S> {
    pub fn new(base: &'a S) -> Self {
        Self {
            base,
            pending: WriteSet::default(),
        }
    }

    pub fn into_write_set(self) -> WriteSet {
        self.pending
    }

    /// Overlay pending writes on a base scan restricted to `[start, end)`.
    fn overlay(&self, base: Vec<KeyValue>, start: &str, end: &str) -> Vec<KeyValue> {
        let mut merged: BTreeMap<String, Vec<u8>> =
            base.into_iter().map(|kv| (kv.key, kv.value)).collect();
        for (key, value) in &self.pending.writes {
            if !in_range(key, start, end) {
                continue;
            }
            match value {
                Some(bytes) => {
                    merged.insert(key.clone(), bytes.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged
            .into_iter()
            .map(|(key, value)| KeyValue { key, value })
            .collect()
    }
}

impl<S: StateStore + ?Sized> StateStore for Transaction<'_, S> {
    fn get_state(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        match self.pending.writes.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => self.base.get_state(key),
        }
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.pending.writes.insert(key.to_string(), Some(value));
        Ok(())
    }

    fn delete_state(&mut self, key: &str) -> StoreResult<()> {
        self.pending.writes.insert(key.to_string(), None);
        Ok(())
    }

    fn get_state_by_range(&self, start: &str, end: &str) -> StoreResult<Vec<KeyValue>> {
        let base = self.base.get_state_by_range(start, end)?;
        Ok(self.overlay(base, start, end))
    }

    // Delegated so a store with a real index answers the base part; pending
    // writes are then re-checked against the selector.
    fn get_query_result(&self, query: &str) -> StoreResult<Vec<KeyValue>> {
        let selector = RichQuery::parse(query)?;
        let base = self.base.get_query_result(query)?;
        Ok(self
            .overlay(base, "", "")
            .into_iter()
            .filter(|kv| selector.matches(&kv.value))
            .collect())
    }
}
