//! Violation handling and compensation.

use tracing::{info, warn};

use crate::errors::{LedgerError, Result};
use crate::payload::ViolationInput;
use crate::policy::Settlement;
use crate::storage::save_contract;
use crate::store::StateStore;
use crate::types::{ContractRecord, Severity};
use crate::SlaLedger;

impl SlaLedger {
    /// Record a violation against a contract and compensate the client.
    ///
    /// `input` is either a violation document or a bare contract id. With an
    /// immediate-transfer policy the provider pays inside this call and an
    /// unpayable compensation fails the whole violation.
    pub fn sla_violated<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        input: &str,
    ) -> Result<ContractRecord> {
        let input = ViolationInput::parse(input)?;
        self.record_violation(store, &input)
    }

    pub fn record_violation<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        input: &ViolationInput,
    ) -> Result<ContractRecord> {
        let mut contract = self.read_contract(store, input.contract_id())?;
        if contract.state.is_terminal() {
            return Err(LedgerError::ContractTerminal(contract.id));
        }

        let severity = Severity::from_importance_name(input.importance_name());
        if severity == Severity::Other && !input.importance_name().is_empty() {
            warn!(
                contract = %contract.id,
                importance = input.importance_name(),
                "unrecognised severity, counted in fallback bucket"
            );
        }
        contract.violation_count += 1;
        contract.daily_violations[severity.bucket()] += 1;

        match self.policy.settle(&contract, severity, input.importance())? {
            Settlement::Transfer(amount) if amount.is_zero() => {}
            Settlement::Transfer(amount) => {
                self.transfer_tokens(
                    store,
                    &contract.provider.id,
                    &contract.client.id,
                    amount,
                )?;
                info!(
                    contract = %contract.id,
                    %amount,
                    count = contract.violation_count,
                    "violation compensated"
                );
            }
            Settlement::Accrue(amount) => {
                contract.daily_value = contract
                    .daily_value
                    .checked_add(amount)
                    .ok_or_else(|| LedgerError::overflow(amount))?;
                info!(
                    contract = %contract.id,
                    %amount,
                    daily_value = %contract.daily_value,
                    "violation accrued"
                );
            }
        }

        save_contract(store, &contract)?;
        Ok(contract)
    }
}
