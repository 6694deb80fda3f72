//! Account identifiers.
//!
//! The ledger treats addresses as opaque strings. An [`Address`] keeps the
//! spelling it was first given, which is what events, holder listings and
//! API responses echo back. Identity is decided by a folded key (trimmed,
//! ASCII lower-case), so a checksummed hex address and its lower-case form
//! refer to the same account.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An account address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Address {
    spelling: String,
    key: String,
}

impl Address {
    /// Builds an address from any string-like identifier.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let spelling = raw.as_ref().trim().to_string();
        let key = spelling.to_ascii_lowercase();
        Self { spelling, key }
    }

    /// Returns the address as it was spelled, minus surrounding whitespace.
    pub fn as_str(&self) -> &str {
        &self.spelling
    }

    /// Returns the folded form that decides account identity.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the bytes of the folded form, used when deriving identifiers.
    pub fn as_bytes(&self) -> &[u8] {
        self.key.as_bytes()
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Address {}

impl Hash for Address {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for Address {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Address {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<&Address> for Address {
    fn from(a: &Address) -> Self {
        a.clone()
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.spelling
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.spelling
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spelling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const CHECKSUMMED: &str = "0x8Ae386892b59bD2A7546a9468E8e847D61955991";

    #[test]
    fn checksummed_and_lowercase_forms_are_equal() {
        let a = Address::new(CHECKSUMMED);
        let b = Address::new(CHECKSUMMED.to_lowercase());
        assert_eq!(a, b);

        let set: HashSet<Address> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn spelling_is_preserved() {
        let a = Address::new(CHECKSUMMED);
        assert_eq!(a.as_str(), CHECKSUMMED);
        assert_eq!(a.to_string(), CHECKSUMMED);
        assert_eq!(a.key(), CHECKSUMMED.to_lowercase());
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(Address::new("  alice \n").as_str(), "alice");
    }

    #[test]
    fn serde_uses_plain_string() {
        let a = Address::new("0xABC");
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"0xABC\"");
        let back: Address = serde_json::from_str("\"0xabc\"").unwrap();
        assert_eq!(back, a);
        assert_eq!(back.as_str(), "0xabc");
    }
}
