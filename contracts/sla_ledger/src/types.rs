//! # Types
//!
//! Records persisted in the world state.
//!
//! Both record kinds carry a `docType` discriminator so rich queries can
//! select one kind without relying on the key prefix.
//!
//! ### SLA lifecycle
//!
//! ```text
//! started ──► ongoing ──► stopped
//!     └──────────────────►┘
//! ```
//!
//! `stopped` is terminal: violations and refunds against a stopped contract
//! are rejected. Any other state string coming from the SLA producer is kept
//! verbatim and treated as live.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::payload::{Guarantee, SlaDescriptor};
use crate::Amount;

pub const USER_DOC_TYPE: &str = "user";
pub const CONTRACT_DOC_TYPE: &str = "contract";

/// Number of severity buckets kept per contract.
pub const SEVERITY_BUCKETS: usize = 4;

/// A registered user. The user record is also the token account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "docType")]
    pub doc_type: String,
    pub id: String,
    pub name: String,
    #[serde(rename = "pubkey", default)]
    pub public_key: String,
    pub balance: Amount,
}

impl User {
    pub fn new(id: &str, name: &str, public_key: &str, balance: Amount) -> Self {
        Self {
            doc_type: USER_DOC_TYPE.to_string(),
            id: id.to_string(),
            name: name.to_string(),
            public_key: public_key.to_string(),
            balance,
        }
    }
}

/// A contract party as referenced by the SLA.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl Party {
    /// Display name used when the party is auto-registered.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlaState {
    Started,
    Ongoing,
    Stopped,
    Other(String),
}

impl SlaState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Started => "started",
            Self::Ongoing => "ongoing",
            Self::Stopped => "stopped",
            Self::Other(s) => s,
        }
    }
}

impl Default for SlaState {
    fn default() -> Self {
        Self::Started
    }
}

impl From<String> for SlaState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "started" => Self::Started,
            "ongoing" => Self::Ongoing,
            "stopped" => Self::Stopped,
            _ => Self::Other(s),
        }
    }
}

impl From<SlaState> for String {
    fn from(state: SlaState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for SlaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity classification carried on a violation by its `importanceName`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Serious,
    Catastrophic,
    /// Fallback bucket for unrecognised classifications.
    Other,
}

impl Severity {
    pub fn from_importance_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "warning" => Self::Warning,
            "serious" => Self::Serious,
            "catastrophic" => Self::Catastrophic,
            _ => Self::Other,
        }
    }

    pub fn bucket(&self) -> usize {
        match self {
            Self::Warning => 0,
            Self::Serious => 1,
            Self::Catastrophic => 2,
            Self::Other => 3,
        }
    }
}

/// Full on-ledger representation of an SLA contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRecord {
    pub doc_type: String,
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: SlaState,
    pub provider: Party,
    pub client: Party,
    #[serde(default)]
    pub guarantees: Vec<Guarantee>,
    /// Base amount the compensation policy works from.
    pub compensation_value: Amount,
    pub violation_count: u64,
    /// Violations recorded since the last refund, per severity bucket.
    pub daily_violations: [u64; SEVERITY_BUCKETS],
    /// Violations settled by past refunds, per severity bucket.
    pub total_violations: [u64; SEVERITY_BUCKETS],
    /// Compensation accrued since the last refund.
    pub daily_value: Amount,
}

impl ContractRecord {
    /// Fresh record with zeroed counters.
    pub fn open(sla: &SlaDescriptor, compensation_value: Amount) -> Self {
        Self {
            doc_type: CONTRACT_DOC_TYPE.to_string(),
            id: sla.id.clone(),
            name: sla.name.clone(),
            state: sla.state.clone(),
            provider: sla.details.provider.clone(),
            client: sla.details.client.clone(),
            guarantees: sla.details.guarantees.clone(),
            compensation_value,
            violation_count: 0,
            daily_violations: [0; SEVERITY_BUCKETS],
            total_violations: [0; SEVERITY_BUCKETS],
            daily_value: Amount::ZERO,
        }
    }

    /// Refresh the SLA metadata, keeping value and counters.
    pub fn refresh(&mut self, sla: &SlaDescriptor) {
        self.name = sla.name.clone();
        self.state = sla.state.clone();
        self.provider = sla.details.provider.clone();
        self.client = sla.details.client.clone();
        self.guarantees = sla.details.guarantees.clone();
    }
}
