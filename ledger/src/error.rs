//! Error types for the bank token ledger.
//!
//! Every mutating operation that can fail returns a [`LedgerError`]. All of
//! them are raised during validation, before anything is written.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::withdrawal::WithdrawalStatus;

/// Errors returned by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A gated operation was invoked by someone other than the owner.
    #[error("unauthorized: {caller} is not the owner and cannot {operation}")]
    Unauthorized {
        /// The identity that made the call.
        caller: Address,
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// The bank transaction id was already credited by an earlier deposit.
    #[error("duplicate bank transaction id: {0}")]
    DuplicateTransaction(String),

    /// The receiving account would end up above the holder cap.
    #[error("holder cap exceeded: {address} would hold {resulting}, cap is {cap}")]
    CapExceeded {
        /// The account that would be credited.
        address: Address,
        /// Balance the account would have after the operation.
        resulting: u64,
        /// The configured cap.
        cap: u64,
    },

    /// The debited account does not hold enough tokens.
    #[error("insufficient balance: {address} has {balance}, requested {requested}")]
    InsufficientBalance {
        /// The account that would be debited.
        address: Address,
        /// Its current balance.
        balance: u64,
        /// Amount the caller tried to move.
        requested: u64,
    },

    /// No withdrawal has been requested under this counter.
    #[error("withdrawal not found: {0}")]
    NotFound(u64),

    /// The withdrawal has already been confirmed or rejected.
    #[error("withdrawal {counter} is {status}, expected Pending")]
    InvalidState {
        /// The withdrawal counter.
        counter: u64,
        /// Its current status.
        status: WithdrawalStatus,
    },

    /// Transfers are restricted to holders and the recipient is not one.
    #[error("recipient {0} is not a registered holder")]
    RecipientNotHolder(Address),

    /// Total supply would overflow `u64`.
    #[error("supply overflow: adding {amount} would exceed u64::MAX")]
    SupplyOverflow {
        /// The amount that was attempted.
        amount: u64,
    },
}

/// Field-less classification of [`LedgerError`], used for wire codes and
/// metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Unauthorized,
    DuplicateTransaction,
    CapExceeded,
    InsufficientBalance,
    NotFound,
    InvalidState,
    RecipientNotHolder,
    SupplyOverflow,
}

impl ErrorKind {
    /// Stable name for logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::DuplicateTransaction => "DuplicateTransaction",
            ErrorKind::CapExceeded => "CapExceeded",
            ErrorKind::InsufficientBalance => "InsufficientBalance",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::InvalidState => "InvalidState",
            ErrorKind::RecipientNotHolder => "RecipientNotHolder",
            ErrorKind::SupplyOverflow => "SupplyOverflow",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LedgerError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Unauthorized { .. } => ErrorKind::Unauthorized,
            LedgerError::DuplicateTransaction(_) => ErrorKind::DuplicateTransaction,
            LedgerError::CapExceeded { .. } => ErrorKind::CapExceeded,
            LedgerError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::InvalidState { .. } => ErrorKind::InvalidState,
            LedgerError::RecipientNotHolder(_) => ErrorKind::RecipientNotHolder,
            LedgerError::SupplyOverflow { .. } => ErrorKind::SupplyOverflow,
        }
    }
}
