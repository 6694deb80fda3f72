//! Thread-safe hosting for a single token instance.
//!
//! The ledger is a single logical writer. [`LedgerHandle`] wraps the active
//! [`BankToken`] in a `parking_lot::RwLock`: each mutating operation holds
//! the write lock for its whole authorize-validate-apply sequence, and
//! queries share the read lock, so readers always see the last committed
//! write and never a half-applied one.
//!
//! Commit hooks passed to [`LedgerHandle::execute_then`] run before the
//! write lock is released. Anything they publish is therefore observed in
//! commit order.
//!
//! Redeploying swaps in a fresh instance under the write lock. That is the
//! only way to reset a ledger, and only the current owner may do it.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::address::Address;
use crate::config::TokenConfig;
use crate::error::LedgerError;
use crate::operation::Operation;
use crate::receipt::{DeploymentReceipt, Receipt};
use crate::token::BankToken;

/// Cheap-to-clone shared handle to the active token instance.
#[derive(Debug, Clone)]
pub struct LedgerHandle {
    inner: Arc<RwLock<BankToken>>,
}

impl LedgerHandle {
    /// Deploys a new instance and wraps it.
    pub fn deploy(config: TokenConfig) -> (Self, DeploymentReceipt) {
        let (token, receipt) = BankToken::deploy(config);
        let handle = Self {
            inner: Arc::new(RwLock::new(token)),
        };
        (handle, receipt)
    }

    /// Runs one mutating operation under the write lock.
    pub fn execute(&self, caller: &Address, operation: Operation) -> Result<Receipt, LedgerError> {
        self.inner.write().execute(caller, operation)
    }

    /// Runs one mutating operation and, if it commits, calls `on_commit`
    /// with the post-commit state and the receipt before releasing the
    /// write lock. The appended event sits at `receipt.event_index`.
    pub fn execute_then<R>(
        &self,
        caller: &Address,
        operation: Operation,
        on_commit: impl FnOnce(&BankToken, &Receipt) -> R,
    ) -> Result<(Receipt, R), LedgerError> {
        let mut token = self.inner.write();
        let receipt = token.execute(caller, operation)?;
        let out = on_commit(&token, &receipt);
        Ok((receipt, out))
    }

    /// Runs a read-only closure against the current committed state.
    pub fn read<R>(&self, f: impl FnOnce(&BankToken) -> R) -> R {
        f(&self.inner.read())
    }

    /// Replaces the hosted instance with a fresh deployment. Every balance,
    /// withdrawal and event of the previous instance is discarded.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Unauthorized`] unless `caller` owns the current
    /// instance. Nothing changes in that case.
    pub fn redeploy(
        &self,
        caller: &Address,
        config: TokenConfig,
    ) -> Result<DeploymentReceipt, LedgerError> {
        let mut current = self.inner.write();
        current.authorize_redeploy(caller)?;
        let (token, receipt) = BankToken::deploy(config);
        *current = token;
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::thread;

    const OWNER: &str = "owner";

    fn deposit(to: &str, amount: u64, bank_tx: &str) -> Operation {
        Operation::Deposit {
            to: Address::new(to),
            amount,
            external_id: "e".into(),
            bank_transaction_id: bank_tx.into(),
        }
    }

    #[test]
    fn concurrent_writers_preserve_supply_invariant() {
        let (handle, _) = LedgerHandle::deploy(TokenConfig::new(OWNER));
        let owner = Address::new(OWNER);

        let workers: Vec<_> = (0..8)
            .map(|w| {
                let handle = handle.clone();
                let owner = owner.clone();
                thread::spawn(move || {
                    let account = format!("acct-{}", w);
                    for i in 0..50 {
                        let op = deposit(&account, 10, &format!("{}-{}", w, i));
                        handle.execute(&owner, op).unwrap();
                        let op = Operation::Transfer {
                            from: Address::new(&account),
                            to: Address::new("sink"),
                            amount: 1,
                        };
                        handle.execute(&Address::new(&account), op).unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        handle.read(|token| {
            assert!(token.state().supply_is_consistent());
            assert_eq!(token.total_supply(), 8 * 50 * 10);
            assert_eq!(token.balance_of("sink"), 8 * 50);
            assert_eq!(token.events().len(), 8 * 50 * 2);
        });
    }

    #[test]
    fn commit_hooks_observe_events_in_log_order() {
        let (handle, _) = LedgerHandle::deploy(TokenConfig::new(OWNER));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let workers: Vec<_> = (0..4)
            .map(|w| {
                let handle = handle.clone();
                let seen = Arc::clone(&seen);
                thread::spawn(move || {
                    for i in 0..100 {
                        let op = deposit(&format!("acct-{}", w), 1, &format!("{}-{}", w, i));
                        handle
                            .execute_then(&Address::new(OWNER), op, |token, receipt| {
                                let event = token.events().get(receipt.event_index).unwrap();
                                seen.lock().push(event.index);
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        let seen = seen.lock();
        assert_eq!(*seen, (0..400).collect::<Vec<u64>>());
    }

    #[test]
    fn commit_hook_sees_post_commit_state() {
        let (handle, _) = LedgerHandle::deploy(TokenConfig::new(OWNER));
        let (receipt, (supply, tx)) = handle
            .execute_then(&Address::new(OWNER), deposit("a", 7, "b"), |token, receipt| {
                let event = token.events().get(receipt.event_index).unwrap();
                (token.total_supply(), event.transaction_hash.clone())
            })
            .unwrap();
        assert_eq!(supply, 7);
        assert_eq!(tx, receipt.transaction_hash);
    }

    #[test]
    fn commit_hook_skipped_on_rejection() {
        let (handle, _) = LedgerHandle::deploy(TokenConfig::new(OWNER));
        let mut called = false;
        let err = handle
            .execute_then(&Address::new("stranger"), deposit("a", 7, "b"), |_, _| {
                called = true;
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
        assert!(!called);
    }

    #[test]
    fn redeploy_resets_everything() {
        let (handle, first) = LedgerHandle::deploy(TokenConfig::new(OWNER));
        handle
            .execute(&Address::new(OWNER), deposit("a", 5, "b"))
            .unwrap();

        let second = handle
            .redeploy(&Address::new(OWNER), TokenConfig::new(OWNER).with_symbol("Test"))
            .unwrap();
        assert_ne!(first.contract_address, second.contract_address);
        handle.read(|token| {
            assert_eq!(token.total_supply(), 0);
            assert_eq!(token.symbol(), "Test");
            assert!(!token.has_bank_transaction_id("b"));
            assert_eq!(token.contract_address(), second.contract_address);
        });
    }

    #[test]
    fn stranger_cannot_redeploy() {
        let (handle, first) = LedgerHandle::deploy(TokenConfig::new(OWNER));
        handle
            .execute(&Address::new(OWNER), deposit("a", 900, "b"))
            .unwrap();

        let takeover = TokenConfig::new("attacker").with_holder_cap(1_000_000);
        let err = handle
            .redeploy(&Address::new("attacker"), takeover)
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Unauthorized {
                caller: Address::new("attacker"),
                operation: "redeploy",
            }
        );

        handle.read(|token| {
            assert_eq!(token.contract_address(), first.contract_address);
            assert_eq!(token.owner(), &Address::new(OWNER));
            assert_eq!(token.balance_of("a"), 900);
        });
        let err = handle
            .execute(&Address::new("attacker"), deposit("attacker", 500_000, "c"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
    }
}
