//! # Bank Token Processor
//!
//! [`BankToken`] is one deployed token instance: configuration, owner gate,
//! ledger state, withdrawal registry and event log, plus the transaction
//! processor that drives them.
//!
//! Every mutating call funnels into [`BankToken::execute`]:
//!
//! 1. **Authorize**: gated operations must come from the owner.
//! 2. **Validate**: preconditions are checked against state and registry.
//! 3. **Apply**: all affected fields are written together.
//! 4. **Record**: one event is appended and a receipt returned.
//!
//! Steps 2 and 3 are fused inside the state and registry methods, which
//! validate fully before writing. A failure at any step leaves the instance
//! exactly as it was, including the event log and the commit sequence.
//!
//! Queries never go through the processor.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::access::AccessControl;
use crate::address::Address;
use crate::config::TokenConfig;
use crate::error::LedgerError;
use crate::event::{EventLog, EventQuery, EventType, LedgerEvent};
use crate::operation::Operation;
use crate::receipt::{self, DeploymentReceipt, Receipt, ReceiptStatus};
use crate::state::LedgerState;
use crate::withdrawal::{PendingWithdrawal, WithdrawalRegistry, WithdrawalStatus};

/// Process-wide deployment counter, mixed into contract addresses so two
/// deployments by the same owner get distinct addresses.
static DEPLOYMENT_NONCE: AtomicU64 = AtomicU64::new(0);

/// A deployed bank token instance.
#[derive(Debug, Clone)]
pub struct BankToken {
    config: TokenConfig,
    contract_address: String,
    access: AccessControl,
    state: LedgerState,
    withdrawals: WithdrawalRegistry,
    events: EventLog,
    /// Number of committed transactions.
    sequence: u64,
}

impl BankToken {
    /// Deploys a fresh, empty token instance.
    pub fn deploy(config: TokenConfig) -> (Self, DeploymentReceipt) {
        let nonce = DEPLOYMENT_NONCE.fetch_add(1, Ordering::Relaxed);
        let contract_address = receipt::contract_address(&config.owner, nonce);
        let transaction_hash =
            receipt::deployment_hash(&contract_address, &config.symbol, &config.name);

        let deployment = DeploymentReceipt {
            contract_address: contract_address.clone(),
            transaction_hash,
            owner: config.owner.clone(),
            symbol: config.symbol.clone(),
            name: config.name.clone(),
            decimals: config.decimals(),
            status: ReceiptStatus::Success,
            timestamp: Utc::now(),
        };

        tracing::info!(
            contract = %contract_address,
            owner = %config.owner,
            symbol = %config.symbol,
            holder_cap = config.holder_cap,
            transfer_policy = %config.transfer_policy,
            "bank token deployed"
        );

        let token = Self {
            access: AccessControl::new(config.owner.clone()),
            state: LedgerState::new(config.holder_cap),
            withdrawals: WithdrawalRegistry::new(),
            events: EventLog::new(),
            sequence: 0,
            contract_address,
            config,
        };
        (token, deployment)
    }

    // -----------------------------------------------------------------------
    // Transaction Processing
    // -----------------------------------------------------------------------

    /// Authorizes, validates and applies `operation` on behalf of `caller`.
    ///
    /// # Errors
    ///
    /// Any [`LedgerError`] the operation can raise. On error nothing has
    /// changed.
    pub fn execute(
        &mut self,
        caller: &Address,
        operation: Operation,
    ) -> Result<Receipt, LedgerError> {
        match self.apply(caller, &operation) {
            Ok(receipt) => {
                tracing::debug!(
                    contract = %self.contract_address,
                    operation = operation.name(),
                    caller = %caller,
                    tx = %receipt.transaction_hash,
                    sequence = receipt.sequence,
                    total_supply = self.state.total_supply(),
                    "operation committed"
                );
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!(
                    contract = %self.contract_address,
                    operation = operation.name(),
                    caller = %caller,
                    kind = %err.kind(),
                    "operation rejected: {}",
                    err
                );
                Err(err)
            }
        }
    }

    fn apply(&mut self, caller: &Address, operation: &Operation) -> Result<Receipt, LedgerError> {
        self.access.authorize(caller, operation)?;

        let sequence = self.sequence + 1;
        let transaction_hash =
            receipt::transaction_hash(&self.contract_address, sequence, operation);

        let (event, withdrawal_counter) = match operation {
            Operation::Deposit {
                to,
                amount,
                external_id,
                bank_transaction_id,
            } => {
                self.state.deposit(to, *amount, bank_transaction_id)?;
                let event = LedgerEvent::Deposit {
                    to_address: to.clone(),
                    amount: *amount,
                    external_id: external_id.clone(),
                    bank_transaction_id: bank_transaction_id.clone(),
                };
                (event, None)
            }
            Operation::Transfer { from, to, amount } => {
                self.state
                    .transfer(from, to, *amount, self.config.transfer_policy)?;
                let event = LedgerEvent::Transfer {
                    from_address: from.clone(),
                    to_address: to.clone(),
                    amount: *amount,
                };
                (event, None)
            }
            Operation::RequestWithdrawal { withdrawer, amount } => {
                self.state.burn(withdrawer, *amount)?;
                let counter = self.withdrawals.open(
                    withdrawer.clone(),
                    *amount,
                    transaction_hash.clone(),
                );
                let event = LedgerEvent::RequestWithdrawal {
                    withdrawal_number: counter,
                    withdrawer: withdrawer.clone(),
                    amount: *amount,
                };
                (event, Some(counter))
            }
            Operation::ConfirmWithdrawal { counter } => {
                let record = self
                    .withdrawals
                    .resolve(*counter, WithdrawalStatus::Confirmed)?;
                let event = LedgerEvent::ConfirmWithdrawal {
                    withdrawal_number: record.counter,
                    withdrawer: record.withdrawer.clone(),
                    amount: record.amount,
                };
                (event, Some(*counter))
            }
            Operation::RejectWithdrawal { counter } => {
                let record = self.withdrawals.ensure_pending(*counter)?.clone();
                self.state.restore(&record.withdrawer, record.amount)?;
                // Cannot fail: the record was proven Pending above and nothing
                // in between touches the registry.
                self.withdrawals.resolve(*counter, WithdrawalStatus::Rejected)?;
                let event = LedgerEvent::RejectWithdrawal {
                    withdrawal_number: record.counter,
                    withdrawer: record.withdrawer,
                    amount: record.amount,
                };
                (event, Some(*counter))
            }
        };

        self.sequence = sequence;
        let event_index = self.events.append(transaction_hash.clone(), event);

        Ok(Receipt {
            transaction_hash,
            sequence,
            operation: operation.name().to_string(),
            status: ReceiptStatus::Success,
            event_index,
            withdrawal_counter,
            timestamp: Utc::now(),
        })
    }

    /// Checks that `caller` may replace this instance with a new deployment.
    pub fn authorize_redeploy(&self, caller: &Address) -> Result<(), LedgerError> {
        self.access.authorize_redeploy(caller)
    }

    // -----------------------------------------------------------------------
    // Operation Shorthands
    // -----------------------------------------------------------------------

    /// Mints `amount` to `to` against `bank_transaction_id`. Owner only.
    pub fn deposit(
        &mut self,
        caller: impl Into<Address>,
        to: impl Into<Address>,
        amount: u64,
        external_id: impl Into<String>,
        bank_transaction_id: impl Into<String>,
    ) -> Result<Receipt, LedgerError> {
        let operation = Operation::Deposit {
            to: to.into(),
            amount,
            external_id: external_id.into(),
            bank_transaction_id: bank_transaction_id.into(),
        };
        self.execute(&caller.into(), operation)
    }

    /// Moves `amount` from `from` to `to`. Open to any caller.
    pub fn transfer(
        &mut self,
        caller: impl Into<Address>,
        from: impl Into<Address>,
        to: impl Into<Address>,
        amount: u64,
    ) -> Result<Receipt, LedgerError> {
        let operation = Operation::Transfer {
            from: from.into(),
            to: to.into(),
            amount,
        };
        self.execute(&caller.into(), operation)
    }

    /// Burns `amount` from `withdrawer` and opens a Pending withdrawal.
    /// Owner only. The receipt carries the assigned counter.
    pub fn request_withdrawal(
        &mut self,
        caller: impl Into<Address>,
        withdrawer: impl Into<Address>,
        amount: u64,
    ) -> Result<Receipt, LedgerError> {
        let operation = Operation::RequestWithdrawal {
            withdrawer: withdrawer.into(),
            amount,
        };
        self.execute(&caller.into(), operation)
    }

    /// Marks withdrawal `counter` as settled. Owner only.
    pub fn confirm_withdrawal(
        &mut self,
        caller: impl Into<Address>,
        counter: u64,
    ) -> Result<Receipt, LedgerError> {
        self.execute(&caller.into(), Operation::ConfirmWithdrawal { counter })
    }

    /// Refuses withdrawal `counter` and restores its funds. Owner only.
    pub fn reject_withdrawal(
        &mut self,
        caller: impl Into<Address>,
        counter: u64,
    ) -> Result<Receipt, LedgerError> {
        self.execute(&caller.into(), Operation::RejectWithdrawal { counter })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    pub fn contract_address(&self) -> &str {
        &self.contract_address
    }

    pub fn owner(&self) -> &Address {
        self.access.owner()
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn decimals(&self) -> u8 {
        self.config.decimals()
    }

    pub fn total_supply(&self) -> u64 {
        self.state.total_supply()
    }

    pub fn balance_of(&self, address: impl Into<Address>) -> u64 {
        self.state.balance_of(&address.into())
    }

    pub fn is_holder(&self, address: impl Into<Address>) -> bool {
        self.state.is_holder(&address.into())
    }

    pub fn has_bank_transaction_id(&self, bank_transaction_id: &str) -> bool {
        self.state.has_bank_transaction_id(bank_transaction_id)
    }

    /// Every holder with its balance, in first-holder order.
    pub fn holder_balances(&self) -> Vec<(Address, u64)> {
        self.state.holder_balances()
    }

    /// Next withdrawal counter; equals the number of requests made.
    pub fn withdrawal_counter(&self) -> u64 {
        self.withdrawals.next_counter()
    }

    pub fn withdrawal(&self, counter: u64) -> Option<&PendingWithdrawal> {
        self.withdrawals.get(counter)
    }

    pub fn has_confirmed_withdrawal(&self, counter: u64) -> bool {
        self.withdrawals.has_confirmed(counter)
    }

    pub fn pending_withdrawals(&self) -> impl Iterator<Item = &PendingWithdrawal> {
        self.withdrawals.pending()
    }

    /// Events of `event_type` from log index `from_index` onward.
    pub fn get_events(&self, event_type: EventType, from_index: u64) -> EventQuery<'_> {
        self.events.query(event_type, from_index)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Number of committed transactions.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}
