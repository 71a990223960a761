//! Bus events consumed by the bridge and the records kept about them.

use serde::{Deserialize, Serialize};
use sla_ledger::{SlaDescriptor, ViolationInput};

use crate::errors::BridgeError;

/// What a broker record asks the ledger to do, decided by its topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An SLA was created or changed (`sla_contracts` topic).
    SlaContract,
    /// A guarantee of an SLA was violated (`sla_violation` topic).
    SlaViolation,
    /// A record on a topic we are not subscribed to for any purpose.
    Unknown,
}

impl EventKind {
    pub fn from_topic(topic: &str, sla_topic: &str, violation_topic: &str) -> Self {
        if topic == sla_topic {
            Self::SlaContract
        } else if topic == violation_topic {
            Self::SlaViolation
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SlaContract => "sla_contract",
            Self::SlaViolation => "sla_violation",
            Self::Unknown => "unknown",
        }
    }

    /// Ledger function the event is submitted as.
    pub fn function(&self) -> Option<&'static str> {
        match self {
            Self::SlaContract => Some("CreateOrUpdateContract"),
            Self::SlaViolation => Some("SLAViolated"),
            Self::Unknown => None,
        }
    }

    /// Best-effort contract id for the event log; `None` when the payload
    /// does not parse.
    pub fn contract_id(&self, payload: &str) -> Option<String> {
        match self {
            Self::SlaContract => SlaDescriptor::parse(payload).ok().map(|sla| sla.id),
            Self::SlaViolation => ViolationInput::parse(payload)
                .ok()
                .map(|v| v.contract_id().to_string()),
            Self::Unknown => None,
        }
    }
}

/// A decoded broker record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusRecord {
    pub topic: String,
    pub partition: i64,
    pub offset: i64,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The ledger accepted and committed the transaction.
    Committed,
    /// The ledger refused the transaction; nothing was written.
    Rejected,
    /// The bridge could not deliver the event to the ledger.
    Failed,
    /// Nothing to do for this record.
    Ignored,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
            Self::Ignored => "ignored",
        }
    }

    pub fn of_error(e: &BridgeError) -> Self {
        match e {
            BridgeError::Ledger(_) => Self::Rejected,
            _ => Self::Failed,
        }
    }
}

/// A processed event, ready to be stored in the database.
#[derive(Debug, Clone)]
pub struct ProcessedEvent {
    pub topic: String,
    pub partition: i64,
    pub offset: i64,
    pub kind: EventKind,
    pub contract_id: Option<String>,
    pub outcome: Outcome,
    pub error_kind: Option<String>,
    pub error: Option<String>,
    pub tx_id: Option<String>,
}

impl ProcessedEvent {
    pub fn new(record: &BusRecord, kind: EventKind, contract_id: Option<String>) -> Self {
        Self {
            topic: record.topic.clone(),
            partition: record.partition,
            offset: record.offset,
            kind,
            contract_id,
            outcome: Outcome::Ignored,
            error_kind: None,
            error: None,
            tx_id: None,
        }
    }

    pub fn committed(mut self, tx_id: String) -> Self {
        self.outcome = Outcome::Committed;
        self.tx_id = Some(tx_id);
        self
    }

    pub fn failed(mut self, e: &BridgeError) -> Self {
        self.outcome = Outcome::of_error(e);
        self.error_kind = Some(e.kind().to_string());
        self.error = Some(e.to_string());
        self
    }
}

/// An event record as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub topic: String,
    pub record_partition: i64,
    pub record_offset: i64,
    pub event_type: String,
    pub contract_id: Option<String>,
    pub outcome: String,
    pub error_kind: Option<String>,
    pub error: Option<String>,
    pub tx_id: Option<String>,
    pub created_at: i64,
}
