//! User registry.
//!
//! Users are keyed by id. Name and public key are unique across all users;
//! both are checked through the rich-query index before a user is written.

use tracing::{debug, info};

use crate::errors::{LedgerError, Result};
use crate::storage::{find_user_by, load_user, save_user, user_key_exists};
use crate::store::StateStore;
use crate::types::User;
use crate::{Amount, SlaLedger};

/// Public keys travel as PEM bodies; the ledger stores them on one line.
pub(crate) fn normalize_public_key(public_key: &str) -> String {
    public_key.replace(&['\n', '\r'][..], "").trim().to_string()
}

impl SlaLedger {
    pub fn user_exists<S: StateStore + ?Sized>(&self, store: &S, identifier: &str) -> Result<bool> {
        Ok(self.resolve_user(store, identifier)?.is_some())
    }

    pub fn create_user<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        name: &str,
        id: &str,
        public_key: &str,
        initial_balance: Amount,
    ) -> Result<User> {
        if initial_balance < Amount::ZERO {
            return Err(LedgerError::InvalidAmount {
                amount: initial_balance,
                reason: "initial balance must be zero or positive",
            });
        }
        if id.trim().is_empty() {
            return Err(LedgerError::MalformedPayload("user id is empty".into()));
        }
        if user_key_exists(store, id)? {
            return Err(LedgerError::AlreadyExists {
                entity: "user",
                id: id.to_string(),
            });
        }
        if let Some(owner) = find_user_by(store, "name", name)? {
            return Err(LedgerError::AlreadyExists {
                entity: "user name",
                id: format!("{name} (held by {})", owner.id),
            });
        }

        let public_key = normalize_public_key(public_key);
        if !public_key.is_empty() {
            if let Some(owner) = self.query_user_by_public_key(store, &public_key)? {
                return Err(LedgerError::DuplicateKey { owner: owner.id });
            }
        }

        let user = User::new(id, name, &public_key, initial_balance);
        save_user(store, &user)?;
        info!(id, name, balance = %initial_balance, "user created");
        Ok(user)
    }

    /// `None` means the key is free.
    pub fn query_user_by_public_key<S: StateStore + ?Sized>(
        &self,
        store: &S,
        public_key: &str,
    ) -> Result<Option<User>> {
        let public_key = normalize_public_key(public_key);
        if public_key.is_empty() {
            return Ok(None);
        }
        find_user_by(store, "pubkey", &public_key)
    }

    pub fn read_user<S: StateStore + ?Sized>(&self, store: &S, identifier: &str) -> Result<User> {
        self.resolve_user(store, identifier)?
            .ok_or_else(|| LedgerError::user_not_found(identifier))
    }

    /// Look up by id first, then by public key.
    pub(crate) fn resolve_user<S: StateStore + ?Sized>(
        &self,
        store: &S,
        identifier: &str,
    ) -> Result<Option<User>> {
        if let Some(user) = load_user(store, identifier)? {
            return Ok(Some(user));
        }
        debug!(identifier, "no user under id, trying public key");
        self.query_user_by_public_key(store, identifier)
    }
}
