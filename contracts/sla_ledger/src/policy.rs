//! Compensation policies.
//!
//! A policy decides two things: the `compensationValue` stamped on a contract
//! when it is created, and what a single violation costs the provider.
//!
//! | Policy                | Contract value              | Per violation                      |
//! |-----------------------|-----------------------------|------------------------------------|
//! | `flat`                | configured constant         | transfer the value now             |
//! | `derived`             | `min + sha256(id) mod span` | transfer the value now             |
//! | `importance_weighted` | configured constant         | transfer value × importance now    |
//! | `severity_tiered`     | configured constant         | accrue a tier percentage           |
//!
//! The derived value depends only on the contract id, so every peer that
//! executes the creation computes the same number.

use std::fmt;

use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::errors::{LedgerError, Result};
use crate::types::{ContractRecord, Severity};
use crate::Amount;

pub const DEFAULT_FLAT_VALUE: i64 = 10;
pub const DEFAULT_DERIVED_MIN: i64 = 10;
pub const DEFAULT_DERIVED_SPAN: u64 = 20;
pub const DEFAULT_WEIGHTED_VALUE: i64 = 10;
pub const DEFAULT_TIERED_VALUE: i64 = 100;

/// What a violation does to the balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Move this amount from provider to client inside the same transaction.
    Transfer(Amount),
    /// Add this amount to the contract's daily accrual.
    Accrue(Amount),
}

pub trait CompensationPolicy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Value stamped on a newly created contract.
    fn compensation_value(&self, contract_id: &str) -> Amount;

    /// `importance` is the violation's numeric weight, 1 for a bare id.
    fn settle(
        &self,
        contract: &ContractRecord,
        severity: Severity,
        importance: i64,
    ) -> Result<Settlement>;
}

#[derive(Debug, Clone)]
pub struct FlatValue {
    pub value: Amount,
}

impl CompensationPolicy for FlatValue {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn compensation_value(&self, _contract_id: &str) -> Amount {
        self.value
    }

    fn settle(&self, contract: &ContractRecord, _: Severity, _: i64) -> Result<Settlement> {
        Ok(Settlement::Transfer(contract.compensation_value))
    }
}

#[derive(Debug, Clone)]
pub struct DerivedValue {
    pub min: Amount,
    pub span: u64,
}

impl DerivedValue {
    fn offset(&self, contract_id: &str) -> u64 {
        if self.span == 0 {
            return 0;
        }
        let digest = Sha256::digest(contract_id.as_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(head) % self.span
    }
}

impl CompensationPolicy for DerivedValue {
    fn name(&self) -> &'static str {
        "derived"
    }

    fn compensation_value(&self, contract_id: &str) -> Amount {
        self.min + Amount::from(self.offset(contract_id))
    }

    fn settle(&self, contract: &ContractRecord, _: Severity, _: i64) -> Result<Settlement> {
        Ok(Settlement::Transfer(contract.compensation_value))
    }
}

#[derive(Debug, Clone)]
pub struct ImportanceWeighted {
    pub value: Amount,
}

impl CompensationPolicy for ImportanceWeighted {
    fn name(&self) -> &'static str {
        "importance_weighted"
    }

    fn compensation_value(&self, _contract_id: &str) -> Amount {
        self.value
    }

    fn settle(
        &self,
        contract: &ContractRecord,
        _: Severity,
        importance: i64,
    ) -> Result<Settlement> {
        let amount = contract
            .compensation_value
            .checked_mul(Decimal::from(importance))
            .ok_or_else(|| LedgerError::overflow(contract.compensation_value))?;
        Ok(Settlement::Transfer(amount))
    }
}

#[derive(Debug, Clone)]
pub struct SeverityTiered {
    pub value: Amount,
}

impl SeverityTiered {
    /// Share of the contract value owed per violation of each tier.
    pub fn rate(severity: Severity) -> Decimal {
        match severity {
            Severity::Warning => Decimal::new(15, 3),
            Severity::Serious => Decimal::new(35, 3),
            Severity::Catastrophic => Decimal::new(55, 3),
            Severity::Other => Decimal::ZERO,
        }
    }
}

impl CompensationPolicy for SeverityTiered {
    fn name(&self) -> &'static str {
        "severity_tiered"
    }

    fn compensation_value(&self, _contract_id: &str) -> Amount {
        self.value
    }

    fn settle(&self, contract: &ContractRecord, severity: Severity, _: i64) -> Result<Settlement> {
        let amount = contract
            .compensation_value
            .checked_mul(Self::rate(severity))
            .ok_or_else(|| LedgerError::overflow(contract.compensation_value))?;
        Ok(Settlement::Accrue(amount.normalize()))
    }
}

/// Serializable policy selector.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PolicyKind {
    Flat { value: Amount },
    Derived { min: Amount, span: u64 },
    ImportanceWeighted { value: Amount },
    SeverityTiered { value: Amount },
}

impl Default for PolicyKind {
    fn default() -> Self {
        Self::Flat {
            value: Amount::from(DEFAULT_FLAT_VALUE),
        }
    }
}

impl PolicyKind {
    pub fn build(&self) -> Box<dyn CompensationPolicy> {
        match self {
            Self::Flat { value } => Box::new(FlatValue { value: *value }),
            Self::Derived { min, span } => Box::new(DerivedValue {
                min: *min,
                span: *span,
            }),
            Self::ImportanceWeighted { value } => Box::new(ImportanceWeighted { value: *value }),
            Self::SeverityTiered { value } => Box::new(SeverityTiered { value: *value }),
        }
    }
}
