//! Ledger policy configuration.
//!
//! The deployed contract variants differ only in these knobs, so one
//! engine is built from a [`LedgerConfig`] instead of keeping a copy of the
//! contract per variant.

use serde::Deserialize;

use crate::policy::PolicyKind;
use crate::Amount;

/// Starting balance for parties auto-registered by `CreateContract`.
pub const DEFAULT_STARTING_BALANCE: i64 = 500;
/// Liquidity minted for a provider that has no tokens yet.
pub const DEFAULT_BOOTSTRAP_MINT: i64 = 100;

/// How reads of a missing account behave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountMode {
    /// A missing account reads as balance 0 and is created by `Mint`.
    #[default]
    Permissive,
    /// A missing account is `NotFound`.
    Strict,
}

/// What `CreateContract` does with unregistered parties.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum PartyMode {
    AutoCreate { starting_balance: Amount },
    Strict,
}

impl Default for PartyMode {
    fn default() -> Self {
        Self::AutoCreate {
            starting_balance: Amount::from(DEFAULT_STARTING_BALANCE),
        }
    }
}

/// Failure handling of the `RefundAllSLAs` sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// The first failing contract fails the whole sweep.
    #[default]
    Abort,
    /// Each contract is refunded in its own savepoint; failures are reported.
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub account_mode: AccountMode,
    pub party_mode: PartyMode,
    pub bootstrap_mint: Option<Amount>,
    pub compensation: PolicyKind,
    pub refund_sweep: SweepMode,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            account_mode: AccountMode::default(),
            party_mode: PartyMode::default(),
            bootstrap_mint: Some(Amount::from(DEFAULT_BOOTSTRAP_MINT)),
            compensation: PolicyKind::default(),
            refund_sweep: SweepMode::default(),
        }
    }
}

impl LedgerConfig {
    /// Reject every missing party and every missing account.
    pub fn strict() -> Self {
        Self {
            account_mode: AccountMode::Strict,
            party_mode: PartyMode::Strict,
            bootstrap_mint: None,
            ..Self::default()
        }
    }

    pub fn with_compensation(mut self, compensation: PolicyKind) -> Self {
        self.compensation = compensation;
        self
    }

    pub fn with_sweep(mut self, refund_sweep: SweepMode) -> Self {
        self.refund_sweep = refund_sweep;
        self
    }

    pub fn with_bootstrap_mint(mut self, bootstrap_mint: Option<Amount>) -> Self {
        self.bootstrap_mint = bootstrap_mint;
        self
    }
}
