//! Invocation by function name.
//!
//! Ledger clients submit transactions as a function name plus string
//! arguments (`SubmitTransaction("SLAViolated", json)`). [`Invocation`] is
//! the typed form of such a call; [`SlaLedger::invoke`] runs it and encodes
//! the result as JSON.

use std::str::FromStr;

use serde::Serialize;
use tracing::debug;

use crate::errors::{LedgerError, Result};
use crate::store::StateStore;
use crate::{Amount, SlaLedger};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    InitLedger,
    CreateUser {
        name: String,
        id: String,
        public_key: String,
        initial_balance: Amount,
    },
    UserExists(String),
    ReadUser(String),
    UserBalance(String),
    Mint {
        account: String,
        amount: Amount,
    },
    TransferTokens {
        from: String,
        to: String,
        amount: Amount,
    },
    CreateContract(String),
    CreateOrUpdateContract(String),
    ReadContract(String),
    ContractExists(String),
    GetAllContracts,
    DeleteContract(String),
    SlaViolated(String),
    RefundSla(String),
    RefundAllSlas,
}

fn parse_amount(raw: &str) -> Result<Amount> {
    Amount::from_str(raw.trim())
        .map_err(|e| LedgerError::MalformedPayload(format!("invalid amount {raw:?}: {e}")))
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn arity(function: &str, args: &[String], expected: usize) -> Result<()> {
    if args.len() != expected {
        return Err(LedgerError::MalformedPayload(format!(
            "{function} takes {expected} argument(s), got {}",
            args.len()
        )));
    }
    Ok(())
}

impl Invocation {
    /// Build an invocation from the wire form of a transaction proposal.
    pub fn parse(function: &str, args: &[String]) -> Result<Self> {
        let one = |args: &[String]| -> Result<String> {
            arity(function, args, 1)?;
            Ok(args[0].clone())
        };

        let invocation = match function {
            "InitLedger" => {
                arity(function, args, 0)?;
                Self::InitLedger
            }
            // The bridge registers users as (name, publicKey, balance) with
            // the name doubling as id.
            "CreateUser" => match args {
                [name, public_key, balance] => Self::CreateUser {
                    name: name.clone(),
                    id: name.clone(),
                    public_key: public_key.clone(),
                    initial_balance: parse_amount(balance)?,
                },
                [name, id, public_key, balance] => Self::CreateUser {
                    name: name.clone(),
                    id: id.clone(),
                    public_key: public_key.clone(),
                    initial_balance: parse_amount(balance)?,
                },
                _ => {
                    return Err(LedgerError::MalformedPayload(format!(
                        "CreateUser takes 3 or 4 arguments, got {}",
                        args.len()
                    )))
                }
            },
            "UserExists" => Self::UserExists(one(args)?),
            "ReadUser" => Self::ReadUser(one(args)?),
            "UserBalance" => Self::UserBalance(one(args)?),
            "Mint" => {
                arity(function, args, 2)?;
                Self::Mint {
                    account: args[0].clone(),
                    amount: parse_amount(&args[1])?,
                }
            }
            "TransferTokens" => {
                arity(function, args, 3)?;
                Self::TransferTokens {
                    from: args[0].clone(),
                    to: args[1].clone(),
                    amount: parse_amount(&args[2])?,
                }
            }
            "CreateContract" => Self::CreateContract(one(args)?),
            "CreateOrUpdateContract" => Self::CreateOrUpdateContract(one(args)?),
            "ReadContract" => Self::ReadContract(one(args)?),
            "ContractExists" => Self::ContractExists(one(args)?),
            "GetAllContracts" => {
                arity(function, args, 0)?;
                Self::GetAllContracts
            }
            "DeleteContract" => Self::DeleteContract(one(args)?),
            "SLAViolated" => Self::SlaViolated(one(args)?),
            "RefundSLA" => Self::RefundSla(one(args)?),
            "RefundAllSLAs" => {
                arity(function, args, 0)?;
                Self::RefundAllSlas
            }
            other => {
                return Err(LedgerError::MalformedPayload(format!(
                    "unknown function {other}"
                )))
            }
        };
        Ok(invocation)
    }

    pub fn function(&self) -> &'static str {
        match self {
            Self::InitLedger => "InitLedger",
            Self::CreateUser { .. } => "CreateUser",
            Self::UserExists(_) => "UserExists",
            Self::ReadUser(_) => "ReadUser",
            Self::UserBalance(_) => "UserBalance",
            Self::Mint { .. } => "Mint",
            Self::TransferTokens { .. } => "TransferTokens",
            Self::CreateContract(_) => "CreateContract",
            Self::CreateOrUpdateContract(_) => "CreateOrUpdateContract",
            Self::ReadContract(_) => "ReadContract",
            Self::ContractExists(_) => "ContractExists",
            Self::GetAllContracts => "GetAllContracts",
            Self::DeleteContract(_) => "DeleteContract",
            Self::SlaViolated(_) => "SLAViolated",
            Self::RefundSla(_) => "RefundSLA",
            Self::RefundAllSlas => "RefundAllSLAs",
        }
    }

    /// Queries never write; the host may evaluate them without committing.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::InitLedger
                | Self::UserExists(_)
                | Self::ReadUser(_)
                | Self::UserBalance(_)
                | Self::ReadContract(_)
                | Self::ContractExists(_)
                | Self::GetAllContracts
        )
    }
}

impl SlaLedger {
    /// Run an invocation against `store` and encode its result as JSON.
    pub fn invoke<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        invocation: &Invocation,
    ) -> Result<Vec<u8>> {
        debug!(function = invocation.function(), "invoke");
        let response = match invocation {
            Invocation::InitLedger => encode(&())?,
            Invocation::CreateUser {
                name,
                id,
                public_key,
                initial_balance,
            } => encode(&self.create_user(store, name, id, public_key, *initial_balance)?)?,
            Invocation::UserExists(id) => encode(&self.user_exists(store, id)?)?,
            Invocation::ReadUser(id) => encode(&self.read_user(store, id)?)?,
            Invocation::UserBalance(id) => encode(&self.user_balance(store, id)?)?,
            Invocation::Mint { account, amount } => encode(&self.mint(store, account, *amount)?)?,
            Invocation::TransferTokens { from, to, amount } => {
                self.transfer_tokens(store, from, to, *amount)?;
                encode(&())?
            }
            Invocation::CreateContract(sla) => encode(&self.create_contract(store, sla)?)?,
            Invocation::CreateOrUpdateContract(sla) => {
                encode(&self.create_or_update_contract(store, sla)?)?
            }
            Invocation::ReadContract(id) => encode(&self.read_contract(store, id)?)?,
            Invocation::ContractExists(id) => encode(&self.contract_exists(store, id)?)?,
            Invocation::GetAllContracts => encode(&self.get_all_contracts(store)?)?,
            Invocation::DeleteContract(id) => {
                self.delete_contract(store, id)?;
                encode(&())?
            }
            Invocation::SlaViolated(input) => encode(&self.sla_violated(store, input)?)?,
            Invocation::RefundSla(id) => encode(&self.refund_sla(store, id)?)?,
            Invocation::RefundAllSlas => encode(&self.refund_all_slas(store)?)?,
        };
        Ok(response)
    }
}
