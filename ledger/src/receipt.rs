//! # Receipts
//!
//! Acknowledgements for committed operations, and the derivation of the
//! identifiers they carry.
//!
//! - **Transaction hash**: `0x` + 64 hex chars. BLAKE3 over the contract
//!   address, the transaction sequence number and the canonical operation
//!   bytes. The sequence number makes every hash unique within an instance;
//!   the contract address makes it unique across redeployments.
//! - **Contract address**: `0x` + 40 hex chars. The trailing 20 bytes of
//!   SHA-256 over the owner and a deployment nonce, the same shape an EVM
//!   deployer would hand back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::operation::Operation;

/// Outcome recorded on a receipt. Failed calls return an error instead of a
/// receipt, so this is always `Success` today; the field is kept so wire
/// consumers can branch on it the way they would on a chain receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptStatus {
    Success,
}

/// Receipt for a committed ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Unique transaction identifier.
    pub transaction_hash: String,
    /// Position of this transaction in the instance's commit sequence.
    pub sequence: u64,
    /// Name of the committed operation.
    pub operation: String,
    pub status: ReceiptStatus,
    /// Log index of the event the operation appended.
    pub event_index: u64,
    /// Counter of the withdrawal created or resolved, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withdrawal_counter: Option<u64>,
    /// Wall-clock commit time.
    pub timestamp: DateTime<Utc>,
}

/// Receipt for a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentReceipt {
    /// Address of the new token instance.
    pub contract_address: String,
    /// Identifier of the deployment transaction.
    pub transaction_hash: String,
    pub owner: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub status: ReceiptStatus,
    pub timestamp: DateTime<Utc>,
}

/// Derives the hash of the `sequence`-th transaction of an instance.
pub fn transaction_hash(contract_address: &str, sequence: u64, operation: &Operation) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(contract_address.as_bytes());
    hasher.update(&sequence.to_be_bytes());
    hasher.update(&operation.canonical_bytes());
    format!("0x{}", hex::encode(hasher.finalize().as_bytes()))
}

/// Derives the hash of a deployment transaction.
pub fn deployment_hash(contract_address: &str, symbol: &str, name: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(contract_address.as_bytes());
    hasher.update(b"deploy:");
    hasher.update(symbol.as_bytes());
    hasher.update(b":");
    hasher.update(name.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize().as_bytes()))
}

/// Derives a contract address from the owner and a deployment nonce.
pub fn contract_address(owner: &Address, nonce: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(owner.as_bytes());
    hasher.update(nonce.to_be_bytes());
    let digest = hasher.finalize();
    format!("0x{}", hex::encode(&digest[12..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CONTRACT_ADDRESS_LENGTH, TRANSACTION_HASH_LENGTH};

    #[test]
    fn identifier_lengths_match_evm_shapes() {
        let owner = Address::new("0xF55583FF8461DB9dfbBe90b5F3324f2A290c3356");
        let address = contract_address(&owner, 0);
        assert_eq!(address.len(), CONTRACT_ADDRESS_LENGTH);
        assert!(address.starts_with("0x"));

        let op = Operation::ConfirmWithdrawal { counter: 0 };
        let hash = transaction_hash(&address, 1, &op);
        assert_eq!(hash.len(), TRANSACTION_HASH_LENGTH);
        assert_eq!(deployment_hash(&address, "DAD", "n").len(), TRANSACTION_HASH_LENGTH);
    }

    #[test]
    fn nonce_changes_contract_address() {
        let owner = Address::new("owner");
        assert_ne!(contract_address(&owner, 0), contract_address(&owner, 1));
        assert_eq!(contract_address(&owner, 3), contract_address(&owner, 3));
    }

    #[test]
    fn sequence_changes_transaction_hash() {
        let op = Operation::Transfer {
            from: Address::new("a"),
            to: Address::new("b"),
            amount: 0,
        };
        assert_ne!(
            transaction_hash("0xc0ffee", 1, &op),
            transaction_hash("0xc0ffee", 2, &op)
        );
    }
}
