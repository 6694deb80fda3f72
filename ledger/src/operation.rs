//! The closed set of mutating ledger operations.
//!
//! Every state change goes through one of these variants, and the processor
//! matches on them exhaustively. There is no "unknown method" path.

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// A mutating ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    /// Mint tokens against a bank transaction. Owner only.
    #[serde(rename_all = "camelCase")]
    Deposit {
        to: Address,
        amount: u64,
        external_id: String,
        bank_transaction_id: String,
    },
    /// Move tokens between accounts. Open to any caller.
    Transfer {
        from: Address,
        to: Address,
        amount: u64,
    },
    /// Burn tokens pending bank settlement. Owner only.
    RequestWithdrawal { withdrawer: Address, amount: u64 },
    /// Mark a pending withdrawal as settled. Owner only.
    ConfirmWithdrawal { counter: u64 },
    /// Refuse a pending withdrawal and restore the funds. Owner only.
    RejectWithdrawal { counter: u64 },
}

impl Operation {
    /// Stable operation name for logs, receipts and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Deposit { .. } => "deposit",
            Operation::Transfer { .. } => "transfer",
            Operation::RequestWithdrawal { .. } => "requestWithdrawal",
            Operation::ConfirmWithdrawal { .. } => "confirmWithdrawal",
            Operation::RejectWithdrawal { .. } => "rejectWithdrawal",
        }
    }

    /// Whether only the owner may submit this operation.
    pub fn requires_owner(&self) -> bool {
        match self {
            Operation::Transfer { .. } => false,
            Operation::Deposit { .. }
            | Operation::RequestWithdrawal { .. }
            | Operation::ConfirmWithdrawal { .. }
            | Operation::RejectWithdrawal { .. } => true,
        }
    }

    /// Canonical byte encoding, hashed into the transaction hash. Addresses
    /// enter in folded form.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let canonical = match self {
            Operation::Deposit {
                to,
                amount,
                external_id,
                bank_transaction_id,
            } => format!(
                "{}:{}:{}:{}:{}",
                self.name(),
                to.key(),
                amount,
                external_id,
                bank_transaction_id
            ),
            Operation::Transfer { from, to, amount } => {
                format!("{}:{}:{}:{}", self.name(), from.key(), to.key(), amount)
            }
            Operation::RequestWithdrawal { withdrawer, amount } => {
                format!("{}:{}:{}", self.name(), withdrawer.key(), amount)
            }
            Operation::ConfirmWithdrawal { counter } | Operation::RejectWithdrawal { counter } => {
                format!("{}:{}", self.name(), counter)
            }
        };
        canonical.into_bytes()
    }
}
