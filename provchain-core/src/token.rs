use serde::{Deserialize, Serialize};

use crate::id::{PartyAddress, TokenId};

/// One edge of the lineage DAG: manufacturing this token consumed `amount`
/// units of `parent` from the creator's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEdge {
    /// The consumed parent token
    pub parent: TokenId,

    /// Units of the parent burned at creation time
    pub amount: u64,
}

impl LineageEdge {
    pub fn new(parent: TokenId, amount: u64) -> Self {
        Self { parent, amount }
    }
}

/// A fungible asset type tracked by the ledger.
///
/// Immutable after creation: the total supply is fixed at mint time, and
/// burns of parent tokens reduce holder balances, never a parent's supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Sequential ledger id, assigned at creation
    pub id: TokenId,

    /// The party that minted this token
    pub creator: PartyAddress,

    /// Display name
    pub name: String,

    /// Units credited to the creator at mint time. Fixed for the token's
    /// lifetime; burning this token as a manufacturing parent reduces holder
    /// balances, not this figure.
    pub total_supply: u64,

    /// Free-form feature metadata (typically JSON); opaque to the engine
    pub features: String,

    /// Lineage edges recorded exactly as given at creation
    pub parents: Vec<LineageEdge>,

    /// Unix timestamp of creation
    pub created_at: i64,
}

impl TokenRecord {
    /// An origin token is raw material: it has no parents.
    pub fn is_origin(&self) -> bool {
        self.parents.is_empty()
    }
}
