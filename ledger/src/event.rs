//! # Event Log
//!
//! Append-only record of every committed ledger operation. Exactly one entry
//! is appended per successful mutating call, in commit order, and entries
//! are never modified or removed.
//!
//! Queries are plain iterators over a slice of the log. They hold no cursor
//! state, so re-running a query from the same index always yields the same
//! prefix plus whatever has been committed since.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::address::Address;

// ---------------------------------------------------------------------------
// Event Types
// ---------------------------------------------------------------------------

/// A ledger state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    /// The owner credited an account against a bank transaction.
    #[serde(rename_all = "camelCase")]
    Deposit {
        to_address: Address,
        amount: u64,
        external_id: String,
        bank_transaction_id: String,
    },
    /// Tokens moved between two accounts.
    #[serde(rename_all = "camelCase")]
    Transfer {
        from_address: Address,
        to_address: Address,
        amount: u64,
    },
    /// Funds were taken out of circulation pending bank settlement.
    #[serde(rename_all = "camelCase")]
    RequestWithdrawal {
        withdrawal_number: u64,
        withdrawer: Address,
        amount: u64,
    },
    /// The bank paid out a requested withdrawal.
    #[serde(rename_all = "camelCase")]
    ConfirmWithdrawal {
        withdrawal_number: u64,
        withdrawer: Address,
        amount: u64,
    },
    /// A requested withdrawal was refused and the funds restored.
    #[serde(rename_all = "camelCase")]
    RejectWithdrawal {
        withdrawal_number: u64,
        withdrawer: Address,
        amount: u64,
    },
}

impl LedgerEvent {
    /// The type tag of this event.
    pub fn event_type(&self) -> EventType {
        match self {
            LedgerEvent::Deposit { .. } => EventType::Deposit,
            LedgerEvent::Transfer { .. } => EventType::Transfer,
            LedgerEvent::RequestWithdrawal { .. } => EventType::RequestWithdrawal,
            LedgerEvent::ConfirmWithdrawal { .. } => EventType::ConfirmWithdrawal,
            LedgerEvent::RejectWithdrawal { .. } => EventType::RejectWithdrawal,
        }
    }

    /// The amount carried by the event.
    pub fn amount(&self) -> u64 {
        match self {
            LedgerEvent::Deposit { amount, .. }
            | LedgerEvent::Transfer { amount, .. }
            | LedgerEvent::RequestWithdrawal { amount, .. }
            | LedgerEvent::ConfirmWithdrawal { amount, .. }
            | LedgerEvent::RejectWithdrawal { amount, .. } => *amount,
        }
    }
}

/// Event type filter used by [`EventLog::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Deposit,
    Transfer,
    RequestWithdrawal,
    ConfirmWithdrawal,
    RejectWithdrawal,
}

impl EventType {
    /// All event types, in declaration order.
    pub const ALL: [EventType; 5] = [
        EventType::Deposit,
        EventType::Transfer,
        EventType::RequestWithdrawal,
        EventType::ConfirmWithdrawal,
        EventType::RejectWithdrawal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Deposit => "Deposit",
            EventType::Transfer => "Transfer",
            EventType::RequestWithdrawal => "RequestWithdrawal",
            EventType::ConfirmWithdrawal => "ConfirmWithdrawal",
            EventType::RejectWithdrawal => "RejectWithdrawal",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown event type: {}", s))
    }
}

// ---------------------------------------------------------------------------
// Log Entries
// ---------------------------------------------------------------------------

/// An event together with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    /// Zero-based position in the log.
    pub index: u64,
    /// Hash of the transaction that emitted the event.
    pub transaction_hash: String,
    /// The event payload.
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// The append-only event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LoggedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and returns its log index.
    pub fn append(&mut self, transaction_hash: String, event: LedgerEvent) -> u64 {
        let index = self.entries.len() as u64;
        self.entries.push(LoggedEvent {
            index,
            transaction_hash,
            event,
        });
        index
    }

    /// Events of `event_type` whose log index is at least `from_index`, in
    /// commit order.
    pub fn query(&self, event_type: EventType, from_index: u64) -> EventQuery<'_> {
        EventQuery {
            entries: self.tail(from_index).iter(),
            event_type: Some(event_type),
        }
    }

    /// Every event whose log index is at least `from_index`.
    pub fn entries_from(&self, from_index: u64) -> EventQuery<'_> {
        EventQuery {
            entries: self.tail(from_index).iter(),
            event_type: None,
        }
    }

    /// Returns the entry at `index`, if any.
    pub fn get(&self, index: u64) -> Option<&LoggedEvent> {
        usize::try_from(index).ok().and_then(|i| self.entries.get(i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tail(&self, from_index: u64) -> &[LoggedEvent] {
        let start = usize::try_from(from_index)
            .unwrap_or(usize::MAX)
            .min(self.entries.len());
        &self.entries[start..]
    }
}

/// Lazy iterator returned by [`EventLog::query`] and
/// [`EventLog::entries_from`].
#[derive(Debug, Clone)]
pub struct EventQuery<'a> {
    entries: std::slice::Iter<'a, LoggedEvent>,
    event_type: Option<EventType>,
}

impl<'a> Iterator for EventQuery<'a> {
    type Item = &'a LoggedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.event_type {
            Some(wanted) => self
                .entries
                .by_ref()
                .find(|e| e.event.event_type() == wanted),
            None => self.entries.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit(to: &str, amount: u64, bank_tx: &str) -> LedgerEvent {
        LedgerEvent::Deposit {
            to_address: Address::new(to),
            amount,
            external_id: "ext".into(),
            bank_transaction_id: bank_tx.into(),
        }
    }

    fn transfer(from: &str, to: &str, amount: u64) -> LedgerEvent {
        LedgerEvent::Transfer {
            from_address: Address::new(from),
            to_address: Address::new(to),
            amount,
        }
    }

    fn sample_log() -> EventLog {
        let mut log = EventLog::new();
        log.append("0x01".into(), deposit("a", 100, "1"));
        log.append("0x02".into(), transfer("a", "b", 10));
        log.append("0x03".into(), deposit("b", 20, "2"));
        log.append("0x04".into(), transfer("b", "a", 5));
        log
    }

    #[test]
    fn append_assigns_sequential_indices() {
        let log = sample_log();
        assert_eq!(log.len(), 4);
        assert_eq!(log.get(0).unwrap().index, 0);
        assert_eq!(log.get(3).unwrap().index, 3);
        assert!(log.get(4).is_none());
    }

    #[test]
    fn query_filters_by_type_in_commit_order() {
        let log = sample_log();
        let deposits: Vec<_> = log.query(EventType::Deposit, 0).collect();
        assert_eq!(deposits.len(), 2);
        assert_eq!(deposits[0].index, 0);
        assert_eq!(deposits[1].index, 2);
        assert_eq!(deposits[1].event.amount(), 20);
    }

    #[test]
    fn query_respects_from_index() {
        let log = sample_log();
        let transfers: Vec<_> = log.query(EventType::Transfer, 2).collect();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].transaction_hash, "0x04");
        assert_eq!(log.query(EventType::Deposit, 100).count(), 0);
    }

    #[test]
    fn query_is_restartable() {
        let mut log = sample_log();
        assert_eq!(log.query(EventType::Deposit, 0).count(), 2);
        log.append("0x05".into(), deposit("c", 1, "3"));
        assert_eq!(log.query(EventType::Deposit, 0).count(), 3);
        assert_eq!(log.entries_from(0).count(), 5);
    }

    #[test]
    fn empty_log_yields_nothing() {
        let log = EventLog::new();
        assert!(log.is_empty());
        assert_eq!(log.query(EventType::RejectWithdrawal, 0).count(), 0);
    }

    #[test]
    fn event_type_parses_case_insensitively() {
        assert_eq!("deposit".parse::<EventType>(), Ok(EventType::Deposit));
        assert_eq!(
            "RequestWithdrawal".parse::<EventType>(),
            Ok(EventType::RequestWithdrawal)
        );
        assert!("Mint".parse::<EventType>().is_err());
    }

    #[test]
    fn events_serialize_with_camel_case_fields() {
        let json = serde_json::to_value(deposit("a", 100, "10000")).unwrap();
        assert_eq!(json["event"], "Deposit");
        assert_eq!(json["toAddress"], "a");
        assert_eq!(json["bankTransactionId"], "10000");
        assert_eq!(json["externalId"], "ext");
    }
}
