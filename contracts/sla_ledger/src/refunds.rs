//! Daily refund settlement.
//!
//! Violations under the severity-tiered policy only accrue value. The
//! refund moves the accrued value from provider to client, folds the daily
//! counters into the totals and starts a new day. The timer that triggers
//! the sweep lives outside the ledger.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SweepMode;
use crate::errors::{LedgerError, Result};
use crate::storage::{contract_ids, load_contract, save_contract};
use crate::store::StateStore;
use crate::txn::Transaction;
use crate::types::SEVERITY_BUCKETS;
use crate::{Amount, SlaLedger};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Refunded {
    pub contract_id: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefundFailure {
    pub contract_id: String,
    pub kind: crate::ErrorKind,
    pub error: String,
}

/// Outcome of a refund sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefundReport {
    pub refunded: Vec<Refunded>,
    /// Stopped contracts.
    pub skipped: Vec<String>,
    /// Only populated in best-effort mode.
    pub failed: Vec<RefundFailure>,
}

impl RefundReport {
    pub fn total_refunded(&self) -> Amount {
        self.refunded
            .iter()
            .fold(Amount::ZERO, |total, r| total.saturating_add(r.amount))
    }
}

impl SlaLedger {
    /// Settle one contract's accrued value. Returns the amount transferred.
    pub fn refund_sla<S: StateStore + ?Sized>(&self, store: &mut S, id: &str) -> Result<Amount> {
        let mut contract = self.read_contract(store, id)?;
        if contract.state.is_terminal() {
            return Err(LedgerError::ContractTerminal(contract.id));
        }

        let amount = contract.daily_value;
        if amount > Amount::ZERO {
            self.transfer_tokens(store, &contract.provider.id, &contract.client.id, amount)?;
        }

        for bucket in 0..SEVERITY_BUCKETS {
            contract.total_violations[bucket] =
                contract.total_violations[bucket].saturating_add(contract.daily_violations[bucket]);
        }
        contract.daily_violations = [0; SEVERITY_BUCKETS];
        contract.daily_value = Amount::ZERO;
        save_contract(store, &contract)?;

        info!(contract = %contract.id, %amount, "daily refund settled");
        Ok(amount)
    }

    /// Refund every live contract in the registry.
    pub fn refund_all_slas<S: StateStore + ?Sized>(&self, store: &mut S) -> Result<RefundReport> {
        let mut report = RefundReport::default();

        for id in contract_ids(store)? {
            let Some(contract) = load_contract(store, &id)? else {
                continue;
            };
            if contract.state.is_terminal() {
                debug!(contract = %id, "skipping stopped contract");
                report.skipped.push(id);
                continue;
            }

            match self.config.refund_sweep {
                SweepMode::Abort => {
                    let amount = self.refund_sla(store, &id)?;
                    report.refunded.push(Refunded {
                        contract_id: id,
                        amount,
                    });
                }
                SweepMode::BestEffort => {
                    let mut savepoint = Transaction::new(&*store);
                    match self.refund_sla(&mut savepoint, &id) {
                        Ok(amount) => {
                            let writes = savepoint.into_write_set();
                            writes.apply(store)?;
                            report.refunded.push(Refunded {
                                contract_id: id,
                                amount,
                            });
                        }
                        Err(e) => {
                            warn!(contract = %id, error = %e, "refund failed, continuing sweep");
                            report.failed.push(RefundFailure {
                                contract_id: id,
                                kind: e.kind(),
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        info!(
            refunded = report.refunded.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            total = %report.total_refunded(),
            "refund sweep finished"
        );
        Ok(report)
    }
}
