//! Event payloads produced upstream of the ledger.
//!
//! The SLA and violation documents arrive as JSON from the SLA manager via
//! the broker. Their field layout belongs to the producer, so unknown fields
//! are ignored and everything except the identifiers defaults when absent.

use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::types::{Party, SlaState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Importance {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub constraint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guarantee {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub constraint: String,
    #[serde(default)]
    pub importance: Vec<Importance>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    #[serde(default)]
    pub first_execution: Option<String>,
    #[serde(default)]
    pub last_execution: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaDetails {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, alias = "Name")]
    pub name: String,
    pub provider: Party,
    pub client: Party,
    #[serde(default)]
    pub creation: Option<String>,
    #[serde(default)]
    pub guarantees: Vec<Guarantee>,
    #[serde(default)]
    pub service: String,
}

/// SLA descriptor as published on the `sla_contracts` topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: SlaState,
    #[serde(default)]
    pub assessment: Assessment,
    pub details: SlaDetails,
}

impl SlaDescriptor {
    /// Parse and check the structural rules the ledger relies on.
    pub fn parse(json: &str) -> Result<Self> {
        let sla: SlaDescriptor = serde_json::from_str(json)?;
        if sla.id.trim().is_empty() {
            return Err(LedgerError::MalformedPayload("SLA has no id".into()));
        }
        let (provider, client) = (&sla.details.provider, &sla.details.client);
        if provider.id.is_empty() || client.id.is_empty() {
            return Err(LedgerError::MalformedPayload(format!(
                "SLA {} is missing a provider or client id",
                sla.id
            )));
        }
        if provider.id == client.id {
            return Err(LedgerError::MalformedPayload(format!(
                "SLA {} names {} as both provider and client",
                sla.id, provider.id
            )));
        }
        Ok(sla)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasuredValue {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub datetime: Option<String>,
}

/// Violation descriptor as published on the `sla_violation` topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(default)]
    pub id: String,
    pub sla_id: String,
    #[serde(default)]
    pub guarantee_id: String,
    #[serde(default)]
    pub constraint: String,
    #[serde(default)]
    pub values: Vec<MeasuredValue>,
    #[serde(rename = "importanceName", default)]
    pub importance_name: String,
    #[serde(default)]
    pub importance: i64,
    #[serde(rename = "appID", default)]
    pub app_id: String,
}

/// Argument of `SLAViolated`: a full violation document or a bare contract id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationInput {
    Event(Violation),
    ContractId(String),
}

impl ViolationInput {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') {
            let violation: Violation = serde_json::from_str(trimmed)?;
            if violation.sla_id.is_empty() {
                return Err(LedgerError::MalformedPayload(
                    "violation has no sla_id".into(),
                ));
            }
            return Ok(Self::Event(violation));
        }
        if trimmed.is_empty() {
            return Err(LedgerError::MalformedPayload("empty contract id".into()));
        }
        Ok(Self::ContractId(trimmed.to_string()))
    }

    pub fn contract_id(&self) -> &str {
        match self {
            Self::Event(v) => &v.sla_id,
            Self::ContractId(id) => id,
        }
    }

    /// Numeric weight of the violation. A bare id weighs 1.
    pub fn importance(&self) -> i64 {
        match self {
            Self::Event(v) => v.importance,
            Self::ContractId(_) => 1,
        }
    }

    /// Severity label, empty for a bare id.
    pub fn importance_name(&self) -> &str {
        match self {
            Self::Event(v) => &v.importance_name,
            Self::ContractId(_) => "",
        }
    }
}
