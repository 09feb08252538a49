use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;
use crate::id::PartyAddress;

/// Declared role of a supply-chain participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Originates raw-material tokens (zero-parent mints)
    Producer,
    /// Manufactures derived tokens by consuming parent balances
    Factory,
    /// Distributes finished goods
    Retailer,
    /// End consumer, receives only
    Consumer,
}

/// What a role is allowed to originate.
///
/// This is the single authoritative table consulted by the ledger; role
/// checks must not be duplicated at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePermissions {
    /// May mint tokens with no parents (raw material)
    pub mint_origin: bool,
    /// May mint tokens that consume parent balances
    pub manufacture: bool,
}

impl Role {
    pub fn permissions(&self) -> RolePermissions {
        match self {
            Role::Producer => RolePermissions {
                mint_origin: true,
                manufacture: false,
            },
            Role::Factory => RolePermissions {
                mint_origin: false,
                manufacture: true,
            },
            Role::Retailer | Role::Consumer => RolePermissions {
                mint_origin: false,
                manufacture: false,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Producer => "Producer",
            Role::Factory => "Factory",
            Role::Retailer => "Retailer",
            Role::Consumer => "Consumer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Producer" => Ok(Role::Producer),
            "Factory" => Ok(Role::Factory),
            "Retailer" => Ok(Role::Retailer),
            "Consumer" => Ok(Role::Consumer),
            other => Err(LedgerError::Other(format!("unknown role: {}", other))),
        }
    }
}

/// Lifecycle status of a party record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartyStatus {
    /// Role requested, awaiting administrator review
    Pending,
    /// Cleared to call mutating operations
    Approved,
    /// Turned down by the administrator
    Rejected,
    /// Withdrawn; may re-request and become Pending again
    Canceled,
}

impl fmt::Display for PartyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PartyStatus::Pending => "Pending",
            PartyStatus::Approved => "Approved",
            PartyStatus::Rejected => "Rejected",
            PartyStatus::Canceled => "Canceled",
        };
        f.write_str(s)
    }
}

/// A registered supply-chain participant.
///
/// Records are created on first role request and never deleted; only the
/// status (and, on re-entry, the role) changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRecord {
    /// Sequential registry id, assigned on first request
    pub id: u64,

    /// Unique address-like key identifying the party
    pub address: PartyAddress,

    /// Declared role
    pub role: Role,

    /// Current lifecycle status
    pub status: PartyStatus,
}

impl PartyRecord {
    pub fn is_approved(&self) -> bool {
        self.status == PartyStatus::Approved
    }
}
