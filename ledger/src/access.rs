//! Owner gate for privileged operations.
//!
//! The owner is fixed at deployment. There is no ownership transfer: a new
//! owner means a new deployment, and only the current owner may replace the
//! instance with one.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::LedgerError;
use crate::operation::Operation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    owner: Address,
}

impl AccessControl {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn is_owner(&self, caller: &Address) -> bool {
        &self.owner == caller
    }

    /// Rejects `caller` if `operation` is gated and `caller` is not the owner.
    pub fn authorize(&self, caller: &Address, operation: &Operation) -> Result<(), LedgerError> {
        if operation.requires_owner() && !self.is_owner(caller) {
            return Err(LedgerError::Unauthorized {
                caller: caller.clone(),
                operation: operation.name(),
            });
        }
        Ok(())
    }

    /// Rejects `caller` unless it may replace this instance with a fresh
    /// deployment.
    pub fn authorize_redeploy(&self, caller: &Address) -> Result<(), LedgerError> {
        if !self.is_owner(caller) {
            return Err(LedgerError::Unauthorized {
                caller: caller.clone(),
                operation: "redeploy",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> AccessControl {
        AccessControl::new(Address::new("owner"))
    }

    #[test]
    fn owner_passes_gated_operations() {
        let op = Operation::ConfirmWithdrawal { counter: 0 };
        assert!(gate().authorize(&Address::new("OWNER"), &op).is_ok());
    }

    #[test]
    fn stranger_blocked_from_gated_operations() {
        let op = Operation::Deposit {
            to: Address::new("d1"),
            amount: 30,
            external_id: "111".into(),
            bank_transaction_id: "10004".into(),
        };
        let err = gate().authorize(&Address::new("d1"), &op).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Unauthorized {
                caller: Address::new("d1"),
                operation: "deposit",
            }
        );
    }

    #[test]
    fn only_owner_may_redeploy() {
        assert!(gate().authorize_redeploy(&Address::new("Owner")).is_ok());
        let err = gate()
            .authorize_redeploy(&Address::new("attacker"))
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Unauthorized {
                caller: Address::new("attacker"),
                operation: "redeploy",
            }
        );
    }

    #[test]
    fn transfer_is_open_to_anyone() {
        let op = Operation::Transfer {
            from: Address::new("d1"),
            to: Address::new("d2"),
            amount: 1,
        };
        assert!(gate().authorize(&Address::new("nobody"), &op).is_ok());
    }
}
