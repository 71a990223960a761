//! Contract registry: SLA creation, upsert, lookup and removal.

use tracing::{debug, info};

use crate::config::PartyMode;
use crate::errors::{LedgerError, Result};
use crate::payload::SlaDescriptor;
use crate::storage::{
    all_contracts, contract_key_exists, delete_contract, load_contract, load_user, save_contract,
};
use crate::store::StateStore;
use crate::types::{ContractRecord, Party};
use crate::{Amount, SlaLedger};

impl SlaLedger {
    pub fn contract_exists<S: StateStore + ?Sized>(&self, store: &S, id: &str) -> Result<bool> {
        contract_key_exists(store, id)
    }

    /// Register a new SLA contract from its JSON descriptor.
    pub fn create_contract<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        sla_json: &str,
    ) -> Result<ContractRecord> {
        let sla = SlaDescriptor::parse(sla_json)?;
        if contract_key_exists(store, &sla.id)? {
            return Err(LedgerError::AlreadyExists {
                entity: "contract",
                id: sla.id,
            });
        }
        self.open_contract(store, &sla)
    }

    /// Create the contract, or refresh the SLA metadata of an existing one.
    ///
    /// An existing contract keeps its compensation value, violation counters
    /// and accrued daily value.
    pub fn create_or_update_contract<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        sla_json: &str,
    ) -> Result<ContractRecord> {
        let sla = SlaDescriptor::parse(sla_json)?;
        let Some(mut contract) = load_contract(store, &sla.id)? else {
            return self.open_contract(store, &sla);
        };

        self.ensure_party(store, "provider", &sla.details.provider)?;
        self.ensure_party(store, "client", &sla.details.client)?;

        contract.refresh(&sla);
        save_contract(store, &contract)?;
        info!(id = %contract.id, state = %contract.state, "contract updated");
        Ok(contract)
    }

    pub fn read_contract<S: StateStore + ?Sized>(
        &self,
        store: &S,
        id: &str,
    ) -> Result<ContractRecord> {
        load_contract(store, id)?.ok_or_else(|| LedgerError::contract_not_found(id))
    }

    pub fn delete_contract<S: StateStore + ?Sized>(&self, store: &mut S, id: &str) -> Result<()> {
        if !contract_key_exists(store, id)? {
            return Err(LedgerError::contract_not_found(id));
        }
        delete_contract(store, id)?;
        info!(id, "contract deleted");
        Ok(())
    }

    pub fn get_all_contracts<S: StateStore + ?Sized>(
        &self,
        store: &S,
    ) -> Result<Vec<ContractRecord>> {
        all_contracts(store)
    }

    fn open_contract<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        sla: &SlaDescriptor,
    ) -> Result<ContractRecord> {
        let provider = &sla.details.provider;
        self.ensure_party(store, "provider", provider)?;
        self.ensure_party(store, "client", &sla.details.client)?;

        if let Some(liquidity) = self.config.bootstrap_mint {
            if self.user_balance(store, &provider.id)? == Amount::ZERO {
                debug!(provider = %provider.id, "provider holds no tokens, bootstrapping");
                self.mint(store, &provider.id, liquidity)?;
            }
        }

        let value = self.policy.compensation_value(&sla.id);
        let contract = ContractRecord::open(sla, value);
        save_contract(store, &contract)?;
        info!(
            id = %contract.id,
            provider = %contract.provider.id,
            client = %contract.client.id,
            compensation_value = %value,
            "contract created"
        );
        Ok(contract)
    }

    fn ensure_party<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        role: &'static str,
        party: &Party,
    ) -> Result<()> {
        if load_user(store, &party.id)?.is_some() {
            return Ok(());
        }
        match &self.config.party_mode {
            PartyMode::Strict => Err(LedgerError::PartyNotFound {
                role,
                id: party.id.clone(),
            }),
            PartyMode::AutoCreate { starting_balance } => {
                self.create_user(store, party.display_name(), &party.id, "", *starting_balance)?;
                Ok(())
            }
        }
    }
}
