// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Bank Token: Restricted Ledger Engine
//!
//! A bank-issued, fiat-backed token whose every unit corresponds to money
//! sitting in a real bank account. That backing is why the ledger is so
//! strict about who can mint and how much anyone can hold:
//!
//! - **Deposits** are minted only by the issuing bank (the contract owner),
//!   and every deposit names the bank transaction that funded it. A bank
//!   transaction id is credited at most once, ever.
//! - **Holder cap**: no account may hold more than the configured cap
//!   (1000 units by default) right after receiving funds.
//! - **Withdrawals** are two-phase. The owner requests one (funds leave
//!   circulation immediately), then either confirms it once the bank has
//!   paid out, or rejects it and the funds come back.
//! - **Events**: every committed operation appends exactly one typed event
//!   to an append-only log that auditors can replay.
//!
//! ## Architecture
//!
//! - **address**: normalized account identifiers.
//! - **config**: deployment configuration and ledger constants.
//! - **error**: the closed error taxonomy.
//! - **event**: the append-only event log and its type/range query.
//! - **state**: balances, supply, holder registry, bank transaction dedup.
//! - **withdrawal**: sequenced withdrawal records and their status.
//! - **access**: owner gate for privileged operations.
//! - **operation**: the closed set of mutating operations.
//! - **receipt**: receipts and identifier derivation.
//! - **token**: the transaction processor tying it all together.
//! - **handle**: thread-safe hosting with an explicit redeploy lifecycle.
//!
//! ## Design Principles
//!
//! 1. Validate everything, then mutate. A failed call leaves every queryable
//!    value exactly as it was.
//! 2. Checked arithmetic on every balance and supply update.
//! 3. State transitions are enum variants, not boolean flags.
//! 4. Every public type is serializable (serde) for wire transport.

pub mod access;
pub mod address;
pub mod config;
pub mod error;
pub mod event;
pub mod handle;
pub mod operation;
pub mod receipt;
pub mod state;
pub mod token;
pub mod withdrawal;

pub use address::Address;
pub use config::{TokenConfig, TransferPolicy};
pub use error::{ErrorKind, LedgerError};
pub use event::{EventLog, EventType, LedgerEvent, LoggedEvent};
pub use handle::LedgerHandle;
pub use operation::Operation;
pub use receipt::{DeploymentReceipt, Receipt, ReceiptStatus};
pub use token::BankToken;
pub use withdrawal::{PendingWithdrawal, WithdrawalStatus};
