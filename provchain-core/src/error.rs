use std::io;
use thiserror::Error;

use crate::id::{PartyAddress, TokenId, TransferId};

/// Represents all possible errors surfaced by the PROVCHAIN ledger engine.
///
/// Variants fall into four groups: authorization failures, missing entities,
/// consistency violations, and state-machine misuse. No variant is ever
/// coerced into a silent success; callers get a definite failure with no
/// partial mutation behind it.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Caller is not permitted to perform the operation
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Party exists but is not in Approved status
    #[error("party {0} is not approved")]
    NotApproved(PartyAddress),

    /// The party's role does not permit the attempted action
    #[error("role {role} may not {action}")]
    RoleNotPermitted {
        role: crate::party::Role,
        action: &'static str,
    },

    /// No record for the given party address
    #[error("party not found: {0}")]
    PartyNotFound(PartyAddress),

    /// No record for the given token id
    #[error("token not found: {0}")]
    TokenNotFound(TokenId),

    /// No record for the given transfer id
    #[error("transfer not found: {0}")]
    TransferNotFound(TransferId),

    /// Re-requesting a role while a Pending/Approved record is still active
    #[error("party {0} already has an active role request")]
    AlreadyActive(PartyAddress),

    /// A transfer cannot be proposed from a party to itself
    #[error("sender and receiver are the same party")]
    SelfTransfer,

    /// Zero or otherwise invalid quantity supplied to a mutating call
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Creator does not hold enough of a parent token to consume it
    #[error("insufficient balance of parent token {token}: have {have}, need {need}")]
    InsufficientParentBalance {
        token: TokenId,
        have: u64,
        need: u64,
    },

    /// Sender's balance net of pending outgoing reservations is too small
    #[error(
        "insufficient unreserved balance of token {token}: {available} available, {requested} requested"
    )]
    InsufficientUnreservedBalance {
        token: TokenId,
        available: u64,
        requested: u64,
    },

    /// Real balance fell below a reserved amount; surfaced at accept time
    #[error("insufficient balance of token {token}: have {have}, need {need}")]
    InsufficientBalance {
        token: TokenId,
        have: u64,
        need: u64,
    },

    /// Lineage traversal encountered a cycle through this token
    #[error("cyclic lineage detected at token {0}")]
    CyclicLineage(TokenId),

    /// Transfer has already been resolved and is immutable
    #[error("transfer {0} is not pending")]
    NotPending(TransferId),

    /// Address string could not be parsed
    #[error("invalid party address: {0}")]
    InvalidAddress(String),

    /// Persisted state failed an integrity check on load
    #[error("inconsistent ledger state: {0}")]
    Inconsistent(String),

    /// IO errors that occur when reading/writing snapshot files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Generic errors that don't fit in other categories
    #[error("other error: {0}")]
    Other(String),

    /// Anyhow error wrapper for error context
    #[error(transparent)]
    Context(#[from] anyhow::Error),
}

// Additional From conversions for common error types

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<String> for LedgerError {
    fn from(err: String) -> Self {
        LedgerError::Other(err)
    }
}

impl From<&str> for LedgerError {
    fn from(err: &str) -> Self {
        LedgerError::Other(err.to_string())
    }
}
