//! Ledger error types.
//!
//! Every entry point returns [`LedgerError`]. The variant carries the
//! human-readable context; [`LedgerError::kind`] exposes the bare category
//! for callers that branch on it (the bridge records it next to each
//! processed event).

use serde::Serialize;
use thiserror::Error;

use crate::Amount;

/// Opaque failure reported by a [`StateStore`](crate::store::StateStore)
/// implementation. Passed through unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: String },

    #[error("{role} {id} is not a registered user")]
    PartyNotFound { role: &'static str, id: String },

    #[error("public key already belongs to user {owner}")]
    DuplicateKey { owner: String },

    #[error("invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Amount, reason: &'static str },

    #[error("cannot transfer from and to the same account {0}")]
    SameAccount(String),

    #[error("account {account} holds {balance}, cannot transfer {requested}")]
    InsufficientFunds {
        account: String,
        balance: Amount,
        requested: Amount,
    },

    #[error("the contract {0} is stopped, no violations or refunds can happen")]
    ContractTerminal(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("world state failure: {0}")]
    Store(#[from] StoreError),
}

/// Category tag of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    PartyNotFound,
    DuplicateKey,
    InvalidAmount,
    SameAccount,
    InsufficientFunds,
    ContractTerminal,
    MalformedPayload,
    StoreFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "already_exists",
            Self::NotFound => "not_found",
            Self::PartyNotFound => "party_not_found",
            Self::DuplicateKey => "duplicate_key",
            Self::InvalidAmount => "invalid_amount",
            Self::SameAccount => "same_account",
            Self::InsufficientFunds => "insufficient_funds",
            Self::ContractTerminal => "contract_terminal",
            Self::MalformedPayload => "malformed_payload",
            Self::StoreFailure => "store_failure",
        }
    }
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PartyNotFound { .. } => ErrorKind::PartyNotFound,
            Self::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            Self::InvalidAmount { .. } => ErrorKind::InvalidAmount,
            Self::SameAccount(_) => ErrorKind::SameAccount,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::ContractTerminal(_) => ErrorKind::ContractTerminal,
            Self::MalformedPayload(_) => ErrorKind::MalformedPayload,
            Self::Store(_) => ErrorKind::StoreFailure,
        }
    }

    pub(crate) fn user_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "user",
            id: id.to_string(),
        }
    }

    /// Decimal arithmetic left the representable range.
    pub(crate) fn overflow(amount: Amount) -> Self {
        Self::InvalidAmount {
            amount,
            reason: "amount overflows",
        }
    }

    pub(crate) fn contract_not_found(id: &str) -> Self {
        Self::NotFound {
            entity: "contract",
            id: id.to_string(),
        }
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedPayload(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
