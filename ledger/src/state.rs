//! # Ledger State
//!
//! Authoritative balances, total supply, the holder registry and the set of
//! bank transaction ids already credited.
//!
//! Every mutating method validates first and writes second. If validation
//! fails nothing has been touched, which is what lets the processor promise
//! all-or-nothing semantics without snapshots or rollbacks.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::address::Address;
use crate::config::TransferPolicy;
use crate::error::LedgerError;

/// Per-address account record. Created implicitly on first reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Current balance in whole token units.
    pub balance: u64,
    /// Set the first time a deposit or transfer targets the account. Never
    /// cleared, even when the balance returns to zero.
    pub holder: bool,
}

/// Balances, supply and dedup registry for one token instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerState {
    accounts: HashMap<Address, Account>,
    /// Holders in the order they were first registered.
    holders: Vec<Address>,
    total_supply: u64,
    holder_cap: u64,
    used_bank_transaction_ids: HashSet<String>,
}

impl LedgerState {
    /// Creates an empty ledger with the given per-account cap.
    pub fn new(holder_cap: u64) -> Self {
        Self {
            accounts: HashMap::new(),
            holders: Vec::new(),
            total_supply: 0,
            holder_cap,
            used_bank_transaction_ids: HashSet::new(),
        }
    }

    // -- Queries -------------------------------------------------------------

    pub fn balance_of(&self, address: &Address) -> u64 {
        self.accounts.get(address).map(|a| a.balance).unwrap_or(0)
    }

    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    pub fn holder_cap(&self) -> u64 {
        self.holder_cap
    }

    pub fn is_holder(&self, address: &Address) -> bool {
        self.accounts.get(address).is_some_and(|a| a.holder)
    }

    pub fn has_bank_transaction_id(&self, bank_transaction_id: &str) -> bool {
        self.used_bank_transaction_ids.contains(bank_transaction_id)
    }

    /// Returns the account record, or `None` if the address was never seen.
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Every holder with its current balance, in first-holder order.
    pub fn holder_balances(&self) -> Vec<(Address, u64)> {
        self.holders
            .iter()
            .map(|a| (a.clone(), self.balance_of(a)))
            .collect()
    }

    pub fn holder_count(&self) -> usize {
        self.holders.len()
    }

    /// Recomputes the sum of all balances and compares it with the tracked
    /// total supply.
    pub fn supply_is_consistent(&self) -> bool {
        let sum = self
            .accounts
            .values()
            .try_fold(0u64, |acc, a| acc.checked_add(a.balance));
        sum == Some(self.total_supply)
    }

    // -- Mutations -----------------------------------------------------------

    /// Credits `amount` to `to` against a bank transaction.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DuplicateTransaction`] if the bank transaction id was
    ///   already used.
    /// - [`LedgerError::CapExceeded`] if `to` would end up above the cap.
    /// - [`LedgerError::SupplyOverflow`] if total supply would overflow.
    pub fn deposit(
        &mut self,
        to: &Address,
        amount: u64,
        bank_transaction_id: &str,
    ) -> Result<(), LedgerError> {
        if self.has_bank_transaction_id(bank_transaction_id) {
            return Err(LedgerError::DuplicateTransaction(
                bank_transaction_id.to_string(),
            ));
        }
        let resulting = self.capped_credit(to, amount)?;
        let supply = self.checked_supply_increase(amount)?;

        self.used_bank_transaction_ids
            .insert(bank_transaction_id.to_string());
        self.set_balance(to, resulting);
        self.mark_holder(to);
        self.total_supply = supply;
        self.debug_check_supply();
        Ok(())
    }

    /// Moves `amount` from `from` to `to`. Supply is unchanged.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InsufficientBalance`] if `from` holds less than
    ///   `amount`.
    /// - [`LedgerError::RecipientNotHolder`] under
    ///   [`TransferPolicy::HoldersOnly`] when `to` is not a holder.
    /// - [`LedgerError::CapExceeded`] if `to` would end up above the cap.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: u64,
        policy: TransferPolicy,
    ) -> Result<(), LedgerError> {
        let from_balance = self.checked_debit(from, amount)?;

        if policy == TransferPolicy::HoldersOnly && !self.is_holder(to) {
            return Err(LedgerError::RecipientNotHolder(to.clone()));
        }

        if from == to {
            // Balance is unchanged, but the resulting balance still has to
            // respect the cap.
            self.ensure_within_cap(to, self.balance_of(to))?;
            self.mark_holder(to);
            return Ok(());
        }

        let to_balance = self.capped_credit(to, amount)?;

        self.set_balance(from, from_balance);
        self.set_balance(to, to_balance);
        self.mark_holder(to);
        self.debug_check_supply();
        Ok(())
    }

    /// Removes `amount` from `from` and from total supply.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientBalance`] if `from` holds less than `amount`.
    pub fn burn(&mut self, from: &Address, amount: u64) -> Result<(), LedgerError> {
        let remaining = self.checked_debit(from, amount)?;
        self.set_balance(from, remaining);
        // Cannot underflow: supply is the sum of balances and one of them
        // covers `amount`.
        self.total_supply -= amount;
        self.debug_check_supply();
        Ok(())
    }

    /// Returns previously burned funds to `to`. The cap does not apply: the
    /// account already held these tokens before they were burned.
    ///
    /// # Errors
    ///
    /// [`LedgerError::SupplyOverflow`] if balance or supply would overflow.
    pub fn restore(&mut self, to: &Address, amount: u64) -> Result<(), LedgerError> {
        let balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::SupplyOverflow { amount })?;
        let supply = self.checked_supply_increase(amount)?;

        self.set_balance(to, balance);
        self.total_supply = supply;
        self.debug_check_supply();
        Ok(())
    }

    // -- Internals -----------------------------------------------------------

    fn checked_debit(&self, from: &Address, amount: u64) -> Result<u64, LedgerError> {
        let balance = self.balance_of(from);
        balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                address: from.clone(),
                balance,
                requested: amount,
            })
    }

    /// Balance `to` would have after receiving `amount`, if within the cap.
    fn capped_credit(&self, to: &Address, amount: u64) -> Result<u64, LedgerError> {
        let current = self.balance_of(to);
        let resulting = current.checked_add(amount).unwrap_or(u64::MAX);
        self.ensure_within_cap(to, resulting)?;
        Ok(resulting)
    }

    fn ensure_within_cap(&self, to: &Address, resulting: u64) -> Result<(), LedgerError> {
        if resulting > self.holder_cap {
            return Err(LedgerError::CapExceeded {
                address: to.clone(),
                resulting,
                cap: self.holder_cap,
            });
        }
        Ok(())
    }

    fn checked_supply_increase(&self, amount: u64) -> Result<u64, LedgerError> {
        self.total_supply
            .checked_add(amount)
            .ok_or(LedgerError::SupplyOverflow { amount })
    }

    fn set_balance(&mut self, address: &Address, balance: u64) {
        self.accounts.entry(address.clone()).or_default().balance = balance;
    }

    fn mark_holder(&mut self, address: &Address) {
        let account = self.accounts.entry(address.clone()).or_default();
        if !account.holder {
            account.holder = true;
            self.holders.push(address.clone());
        }
    }

    fn debug_check_supply(&self) {
        debug_assert!(
            self.supply_is_consistent(),
            "total supply {} diverged from the sum of balances",
            self.total_supply
        );
    }
}
