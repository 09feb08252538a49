use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use crate::error::LedgerError;

/// Sequential token identifier, assigned by the ledger starting at 1.
pub type TokenId = u64;

/// Sequential transfer identifier, assigned by the escrow starting at 1.
pub type TransferId = u64;

// PartyAddress uniquely identifies a participant in the supply chain.
// It is a 20 byte address-like key, resembling an account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyAddress([u8; 20]);

impl fmt::Display for PartyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Ord for PartyAddress {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for PartyAddress {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for PartyAddress {
    fn default() -> Self {
        PartyAddress([0; 20])
    }
}

impl Deref for PartyAddress {
    type Target = [u8; 20];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for PartyAddress {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|e| LedgerError::InvalidAddress(format!("{}: {}", s, e)))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| LedgerError::InvalidAddress(format!("{}: expected 20 bytes", s)))?;
        Ok(PartyAddress(bytes))
    }
}

impl PartyAddress {
    pub fn new(bytes: [u8; 20]) -> Self {
        PartyAddress(bytes)
    }

    /// Get a reference to the internal bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Derive a deterministic address from a list of seeds.
    ///
    /// The same seeds always produce the same address, which keeps test
    /// fixtures and externally derived identities stable.
    pub fn derive(seeds: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();

        // Domain separator
        hasher.update(b"PROVCHAIN_Party");

        for seed in seeds {
            hasher.update(seed);
        }

        let digest = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[..20]);
        PartyAddress(bytes)
    }

    /// Create a random PartyAddress for testing
    pub fn random() -> Self {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
            .to_le_bytes();

        Self::derive(&[&now, &[1, 2, 3, 4]])
    }
}
