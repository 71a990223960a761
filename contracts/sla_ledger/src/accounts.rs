//! Account ledger: balances, minting and transfers.
//!
//! The user record doubles as the account, keyed by the user id. An account
//! key resolves like any user identifier: by id, then by public key. In
//! permissive mode an account that was never written reads as balance 0 and
//! is opened by the first credit.

use tracing::info;

use crate::config::AccountMode;
use crate::errors::{LedgerError, Result};
use crate::storage::{find_user_by, save_user};
use crate::store::StateStore;
use crate::types::User;
use crate::{Amount, SlaLedger};

impl SlaLedger {
    /// Balance of the user keyed by `identifier`, or holding it as public key.
    pub fn user_balance<S: StateStore + ?Sized>(
        &self,
        store: &S,
        identifier: &str,
    ) -> Result<Amount> {
        match self.resolve_user(store, identifier)? {
            Some(user) => Ok(user.balance),
            None => match self.config.account_mode {
                AccountMode::Permissive => Ok(Amount::ZERO),
                AccountMode::Strict => Err(LedgerError::user_not_found(identifier)),
            },
        }
    }

    /// Create `amount` new tokens on `account`. Returns the new balance.
    pub fn mint<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        account: &str,
        amount: Amount,
    ) -> Result<Amount> {
        if amount <= Amount::ZERO {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "mint amount must be positive",
            });
        }
        let mut user = self.load_account(store, account)?;
        user.balance = user
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::overflow(amount))?;
        save_user(store, &user)?;

        info!(account, %amount, balance = %user.balance, "minted");
        Ok(user.balance)
    }

    pub fn transfer_tokens<S: StateStore + ?Sized>(
        &self,
        store: &mut S,
        from: &str,
        to: &str,
        amount: Amount,
    ) -> Result<()> {
        if from == to {
            return Err(LedgerError::SameAccount(from.to_string()));
        }
        if amount <= Amount::ZERO {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "transfer amount must be positive",
            });
        }

        let mut sender = self.load_account(store, from)?;
        let mut receiver = self.load_account(store, to)?;
        if sender.id == receiver.id {
            return Err(LedgerError::SameAccount(sender.id));
        }
        if sender.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                account: from.to_string(),
                balance: sender.balance,
                requested: amount,
            });
        }

        sender.balance = sender
            .balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::overflow(amount))?;
        receiver.balance = receiver
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::overflow(amount))?;
        save_user(store, &sender)?;
        save_user(store, &receiver)?;

        info!(from, to, %amount, "tokens transferred");
        Ok(())
    }

    /// Resolve the account's user record, opening an empty one in
    /// permissive mode.
    fn load_account<S: StateStore + ?Sized>(&self, store: &S, account: &str) -> Result<User> {
        if let Some(user) = self.resolve_user(store, account)? {
            return Ok(user);
        }
        match self.config.account_mode {
            AccountMode::Strict => Err(LedgerError::user_not_found(account)),
            AccountMode::Permissive => {
                // The implicit account is named after its key; keep names unique.
                if let Some(owner) = find_user_by(store, "name", account)? {
                    return Err(LedgerError::AlreadyExists {
                        entity: "user name",
                        id: format!("{account} (held by {})", owner.id),
                    });
                }
                Ok(User::new(account, account, "", Amount::ZERO))
            }
        }
    }
}
