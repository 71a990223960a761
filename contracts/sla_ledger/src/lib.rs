//! # SLA Ledger
//!
//! Token balances and SLA compensation bookkeeping kept in a ledger's
//! key-value world state. The single engine type [`SlaLedger`] exposes the
//! entry points the message bridges submit as transactions:
//!
//! | Area         | Entry point(s)                                                   |
//! |--------------|------------------------------------------------------------------|
//! | Accounts     | `mint`, `transfer_tokens`, `user_balance`                        |
//! | Users        | `create_user`, `user_exists`, `read_user`, `query_user_by_public_key` |
//! | Contracts    | `create_contract`, `create_or_update_contract`, `read_contract`, `contract_exists`, `delete_contract`, `get_all_contracts` |
//! | Violations   | `sla_violated`                                                   |
//! | Refunds      | `refund_sla`, `refund_all_slas`                                  |
//!
//! ## Architecture
//!
//! Entry points take the world state as a [`StateStore`] argument and keep
//! nothing between calls. Record encoding and key layout live in
//! [`storage`]; the variant-specific behaviour (missing parties, missing
//! accounts, compensation pricing, sweep failure handling) comes from the
//! [`LedgerConfig`] the engine is built with.
//!
//! Atomicity is the host's job. [`host::Ledger`] runs each invocation on a
//! [`txn::Transaction`] and only applies the write-set when the entry point
//! returned `Ok`, so an error never leaves a partial update behind.

use tracing::info;

mod accounts;
mod contracts;
mod refunds;
mod users;
mod violations;

pub mod config;
pub mod dispatch;
pub mod errors;
pub mod host;
pub mod payload;
pub mod policy;
pub mod storage;
pub mod store;
pub mod txn;
pub mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_contracts;
#[cfg(test)]
mod test_dispatch;
#[cfg(test)]
mod test_refunds;
#[cfg(test)]
mod test_violations;

pub use config::{AccountMode, LedgerConfig, PartyMode, SweepMode};
pub use dispatch::Invocation;
pub use errors::{ErrorKind, LedgerError, Result, StoreError};
pub use host::{Ledger, Prepared};
pub use payload::{SlaDescriptor, Violation, ViolationInput};
pub use policy::{CompensationPolicy, PolicyKind, Settlement};
pub use refunds::{RefundFailure, RefundReport, Refunded};
pub use store::{KeyValue, MemoryStore, StateStore};
pub use txn::{Transaction, WriteSet};
pub use types::{ContractRecord, Party, Severity, SlaState, User};

/// Token amount. Exact decimal so tiered accruals such as 1.5 settle exactly.
pub type Amount = rust_decimal::Decimal;

/// The ledger engine for one deployed variant.
#[derive(Debug)]
pub struct SlaLedger {
    config: LedgerConfig,
    policy: Box<dyn CompensationPolicy>,
}

impl SlaLedger {
    pub fn new(config: LedgerConfig) -> Self {
        let policy = config.compensation.build();
        info!(
            policy = policy.name(),
            account_mode = ?config.account_mode,
            sweep = ?config.refund_sweep,
            "ledger engine configured"
        );
        Self { config, policy }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn policy(&self) -> &dyn CompensationPolicy {
        self.policy.as_ref()
    }
}

impl Default for SlaLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}
