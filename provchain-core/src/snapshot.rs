use serde::{Deserialize, Serialize};

use crate::id::{PartyAddress, TokenId};
use crate::party::PartyRecord;
use crate::token::TokenRecord;
use crate::transfer::TransferRecord;

/// Serializable image of the full ledger state: the four logical tables
/// plus the id counters and the fixed administrator address.
///
/// The escrow's reservation ledger is deliberately absent. It is fully
/// derivable by summing Pending transfers per (sender, token) and is
/// recomputed on import, so persisting it would only create a second copy
/// that could drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// The designated administrator, set once at engine construction
    pub admin: PartyAddress,

    /// Party table
    pub parties: Vec<PartyRecord>,

    /// Next sequential party id
    pub next_party_id: u64,

    /// Token table
    pub tokens: Vec<TokenRecord>,

    /// Balance table as (holder, token, quantity) rows; quantities are > 0
    pub balances: Vec<(PartyAddress, TokenId, u64)>,

    /// Next sequential token id
    pub next_token_id: u64,

    /// Transfer table
    pub transfers: Vec<TransferRecord>,

    /// Next sequential transfer id
    pub next_transfer_id: u64,
}

impl LedgerSnapshot {
    /// An empty ledger owned by the given administrator.
    pub fn empty(admin: PartyAddress) -> Self {
        Self {
            admin,
            parties: Vec::new(),
            next_party_id: 1,
            tokens: Vec::new(),
            balances: Vec::new(),
            next_token_id: 1,
            transfers: Vec::new(),
            next_transfer_id: 1,
        }
    }
}
