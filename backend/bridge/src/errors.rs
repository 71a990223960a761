//! Application-wide error types.

use sla_ledger::LedgerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Ledger rejected the transaction: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Broker error: {0}")]
    Broker(String),

    #[error("Identity service error: {0}")]
    Identity(String),

    #[error("Payload error: {0}")]
    Payload(String),
}

impl BridgeError {
    /// Category stored next to a failed event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.kind().as_str(),
            Self::Json(_) | Self::Base64(_) | Self::Payload(_) => "malformed_payload",
            Self::Database(_) | Self::Migrate(_) => "database",
            Self::Http(_) | Self::Broker(_) => "broker",
            Self::Identity(_) => "identity",
            Self::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
