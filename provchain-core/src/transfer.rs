use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::{PartyAddress, TokenId, TransferId};

/// State of a two-phase transfer.
///
/// `Pending` is the only live state; the other three are terminal and a
/// record in any of them is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    /// Proposed by the sender, awaiting resolution by the receiver
    Pending,
    /// Receiver accepted; balance moved
    Accepted,
    /// Receiver rejected; no balance moved
    Rejected,
    /// Sender withdrew the proposal; no balance moved
    Canceled,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransferStatus::Pending => "Pending",
            TransferStatus::Accepted => "Accepted",
            TransferStatus::Rejected => "Rejected",
            TransferStatus::Canceled => "Canceled",
        };
        f.write_str(s)
    }
}

/// One proposed movement of token units between two parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    /// Sequential escrow id, assigned at proposal
    pub id: TransferId,

    /// Proposing party; may cancel while Pending
    pub from: PartyAddress,

    /// Receiving party; resolves the transfer by accepting or rejecting
    pub to: PartyAddress,

    /// The token being moved
    pub token: TokenId,

    /// Units proposed
    pub amount: u64,

    /// Unix timestamp of the proposal
    pub created_at: i64,

    /// Current state
    pub status: TransferStatus,
}

impl TransferRecord {
    /// True if the party is the sender or the receiver of this transfer.
    pub fn involves(&self, party: PartyAddress) -> bool {
        self.from == party || self.to == party
    }
}
