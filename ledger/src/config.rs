//! # Ledger Configuration & Constants
//!
//! Every magic number in the ledger lives here. Deployment-time choices
//! (owner, symbol, name, holder cap, transfer policy) are bundled into
//! [`TokenConfig`], which is accepted once when a token is deployed and is
//! immutable for the lifetime of that instance.

use serde::{Deserialize, Serialize};

use crate::address::Address;

// ---------------------------------------------------------------------------
// Token Metadata
// ---------------------------------------------------------------------------

/// Symbol used when the deployer does not pick one.
pub const DEFAULT_SYMBOL: &str = "DAD";

/// Display name used when the deployer does not pick one.
pub const DEFAULT_NAME: &str = "Digital Australian Dollar";

/// Decimal places. Always zero: one token is one whole currency unit, and
/// the bank does not issue fractions of it.
pub const DECIMALS: u8 = 0;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum balance any single account may hold immediately after a deposit
/// or an incoming transfer.
pub const DEFAULT_HOLDER_CAP: u64 = 1_000;

// ---------------------------------------------------------------------------
// Identifier Formats
// ---------------------------------------------------------------------------

/// Length of a rendered transaction hash: `0x` + 64 hex characters.
pub const TRANSACTION_HASH_LENGTH: usize = 66;

/// Length of a rendered contract address: `0x` + 40 hex characters.
pub const CONTRACT_ADDRESS_LENGTH: usize = 42;

// ---------------------------------------------------------------------------
// Transfer Policy
// ---------------------------------------------------------------------------

/// Who may receive tokens through a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPolicy {
    /// Any address may receive a transfer and becomes a holder on receipt.
    #[default]
    Open,
    /// Only addresses already registered as holders (through a deposit or an
    /// earlier transfer) may receive a transfer.
    HoldersOnly,
}

impl std::fmt::Display for TransferPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferPolicy::Open => write!(f, "open"),
            TransferPolicy::HoldersOnly => write!(f, "holders_only"),
        }
    }
}

impl std::str::FromStr for TransferPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "open" => Ok(TransferPolicy::Open),
            "holders_only" => Ok(TransferPolicy::HoldersOnly),
            other => Err(format!("unknown transfer policy: {}", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// TokenConfig
// ---------------------------------------------------------------------------

/// Deployment parameters for a token instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// The only identity allowed to deposit and to drive withdrawals.
    pub owner: Address,
    /// Ticker symbol.
    pub symbol: String,
    /// Human-readable token name.
    pub name: String,
    /// Per-account balance ceiling.
    pub holder_cap: u64,
    /// Recipient restrictions for transfers.
    #[serde(default)]
    pub transfer_policy: TransferPolicy,
}

impl TokenConfig {
    /// Default configuration for the given owner.
    pub fn new(owner: impl Into<Address>) -> Self {
        Self {
            owner: owner.into(),
            symbol: DEFAULT_SYMBOL.to_string(),
            name: DEFAULT_NAME.to_string(),
            holder_cap: DEFAULT_HOLDER_CAP,
            transfer_policy: TransferPolicy::Open,
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_holder_cap(mut self, holder_cap: u64) -> Self {
        self.holder_cap = holder_cap;
        self
    }

    pub fn with_transfer_policy(mut self, policy: TransferPolicy) -> Self {
        self.transfer_policy = policy;
        self
    }

    /// Token decimals. Fixed; present for API symmetry with symbol and name.
    pub fn decimals(&self) -> u8 {
        DECIMALS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_issued_currency() {
        let config = TokenConfig::new("owner");
        assert_eq!(config.symbol, "DAD");
        assert_eq!(config.name, "Digital Australian Dollar");
        assert_eq!(config.decimals(), 0);
        assert_eq!(config.holder_cap, 1_000);
        assert_eq!(config.transfer_policy, TransferPolicy::Open);
    }

    #[test]
    fn builders_override_defaults() {
        let config = TokenConfig::new("owner")
            .with_symbol("Test")
            .with_name("Test name")
            .with_holder_cap(50)
            .with_transfer_policy(TransferPolicy::HoldersOnly);
        assert_eq!(config.symbol, "Test");
        assert_eq!(config.name, "Test name");
        assert_eq!(config.holder_cap, 50);
        assert_eq!(config.transfer_policy, TransferPolicy::HoldersOnly);
    }

    #[test]
    fn transfer_policy_parses_both_spellings() {
        assert_eq!("open".parse::<TransferPolicy>(), Ok(TransferPolicy::Open));
        assert_eq!(
            "holders-only".parse::<TransferPolicy>(),
            Ok(TransferPolicy::HoldersOnly)
        );
        assert!("closed".parse::<TransferPolicy>().is_err());
    }

    #[test]
    fn missing_transfer_policy_deserializes_as_open() {
        let json = r#"{"owner":"o","symbol":"S","name":"N","holder_cap":10}"#;
        let config: TokenConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.transfer_policy, TransferPolicy::Open);
    }
}
