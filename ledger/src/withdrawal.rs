//! # Withdrawal Registry
//!
//! Sequenced withdrawal records. Counters are assigned `0, 1, 2, …` in
//! request order and double as the index into the registry, so lookups are
//! O(1) and records are never removed.
//!
//! The lifecycle is deliberately tiny:
//!
//! ```text
//! (none) --request--> Pending --confirm--> Confirmed
//!                     Pending --reject---> Rejected
//! ```
//!
//! Both resolutions are terminal. Balance and supply effects live in the
//! processor; this module only tracks records and their status.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::error::LedgerError;

/// Resolution status of a withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WithdrawalStatus {
    /// Funds are out of circulation, awaiting bank settlement.
    Pending,
    /// The bank paid out. Terminal.
    Confirmed,
    /// The withdrawal was refused and funds restored. Terminal.
    Rejected,
}

impl WithdrawalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WithdrawalStatus::Pending)
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "Pending"),
            WithdrawalStatus::Confirmed => write!(f, "Confirmed"),
            WithdrawalStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

/// A withdrawal request and its current status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWithdrawal {
    /// Sequence number assigned at request time.
    pub counter: u64,
    /// Account the funds were taken from.
    pub withdrawer: Address,
    /// Amount withdrawn.
    pub amount: u64,
    /// Current status.
    pub status: WithdrawalStatus,
    /// Hash of the request transaction.
    pub request_transaction_hash: String,
}

/// All withdrawal records of one token instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WithdrawalRegistry {
    records: Vec<PendingWithdrawal>,
}

impl WithdrawalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The counter the next request will receive. Equal to the number of
    /// requests made so far.
    pub fn next_counter(&self) -> u64 {
        self.records.len() as u64
    }

    /// Records a new Pending withdrawal and returns its counter.
    pub fn open(
        &mut self,
        withdrawer: Address,
        amount: u64,
        request_transaction_hash: String,
    ) -> u64 {
        let counter = self.next_counter();
        self.records.push(PendingWithdrawal {
            counter,
            withdrawer,
            amount,
            status: WithdrawalStatus::Pending,
            request_transaction_hash,
        });
        counter
    }

    pub fn get(&self, counter: u64) -> Option<&PendingWithdrawal> {
        usize::try_from(counter)
            .ok()
            .and_then(|i| self.records.get(i))
    }

    /// Returns the record if it exists and is still Pending.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] for an unknown counter.
    /// - [`LedgerError::InvalidState`] if the record is already resolved.
    pub fn ensure_pending(&self, counter: u64) -> Result<&PendingWithdrawal, LedgerError> {
        let record = self.get(counter).ok_or(LedgerError::NotFound(counter))?;
        if record.status.is_terminal() {
            return Err(LedgerError::InvalidState {
                counter,
                status: record.status,
            });
        }
        Ok(record)
    }

    /// Moves a Pending record to a terminal status.
    ///
    /// # Errors
    ///
    /// Same as [`ensure_pending`](Self::ensure_pending).
    pub fn resolve(
        &mut self,
        counter: u64,
        status: WithdrawalStatus,
    ) -> Result<&PendingWithdrawal, LedgerError> {
        self.ensure_pending(counter)?;
        debug_assert!(status.is_terminal(), "resolve() needs a terminal status");
        // ensure_pending proved the index is in range.
        let index = counter as usize;
        self.records[index].status = status;
        Ok(&self.records[index])
    }

    /// True iff the withdrawal exists and was confirmed.
    pub fn has_confirmed(&self, counter: u64) -> bool {
        self.get(counter)
            .is_some_and(|r| r.status == WithdrawalStatus::Confirmed)
    }

    /// Records still awaiting resolution, in counter order.
    pub fn pending(&self) -> impl Iterator<Item = &PendingWithdrawal> {
        self.records
            .iter()
            .filter(|r| r.status == WithdrawalStatus::Pending)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(n: u64) -> WithdrawalRegistry {
        let mut reg = WithdrawalRegistry::new();
        for i in 0..n {
            reg.open(Address::new("d1"), 100 + i, format!("0x{:02x}", i));
        }
        reg
    }

    #[test]
    fn counters_are_sequential_from_zero() {
        let mut reg = WithdrawalRegistry::new();
        assert_eq!(reg.next_counter(), 0);
        assert_eq!(reg.open(Address::new("a"), 1, "0x0".into()), 0);
        assert_eq!(reg.open(Address::new("b"), 2, "0x1".into()), 1);
        assert_eq!(reg.next_counter(), 2);
        assert_eq!(reg.get(1).unwrap().withdrawer, Address::new("b"));
    }

    #[test]
    fn confirm_is_terminal() {
        let mut reg = registry_with(1);
        assert!(!reg.has_confirmed(0));
        reg.resolve(0, WithdrawalStatus::Confirmed).unwrap();
        assert!(reg.has_confirmed(0));

        let err = reg.resolve(0, WithdrawalStatus::Rejected).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidState {
                counter: 0,
                status: WithdrawalStatus::Confirmed,
            }
        );
        assert_eq!(reg.get(0).unwrap().status, WithdrawalStatus::Confirmed);
    }

    #[test]
    fn reject_is_terminal() {
        let mut reg = registry_with(2);
        reg.resolve(1, WithdrawalStatus::Rejected).unwrap();
        assert!(!reg.has_confirmed(1));
        assert!(reg.resolve(1, WithdrawalStatus::Confirmed).is_err());
        assert!(reg.resolve(1, WithdrawalStatus::Rejected).is_err());
    }

    #[test]
    fn unknown_counter_not_found() {
        let mut reg = registry_with(1);
        assert_eq!(
            reg.resolve(5, WithdrawalStatus::Confirmed).unwrap_err(),
            LedgerError::NotFound(5)
        );
        assert!(!reg.has_confirmed(5));
        assert!(reg.get(u64::MAX).is_none());
    }

    #[test]
    fn pending_lists_unresolved_in_order() {
        let mut reg = registry_with(3);
        reg.resolve(1, WithdrawalStatus::Confirmed).unwrap();
        let pending: Vec<u64> = reg.pending().map(|r| r.counter).collect();
        assert_eq!(pending, vec![0, 2]);
    }
}
