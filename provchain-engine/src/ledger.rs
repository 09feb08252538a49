use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use log::info;
use provchain_core::error::LedgerError;
use provchain_core::id::{PartyAddress, TokenId};
use provchain_core::party::PartyRecord;
use provchain_core::token::{LineageEdge, TokenRecord};

use crate::escrow::TransferEscrow;

/// Single source of truth for token definitions and balances.
///
/// Token records are immutable once created. Every mutating entry point
/// validates completely before touching state, so a failed call leaves no
/// partial debit behind.
#[derive(Debug, Default)]
pub struct TokenLedger {
    /// Token records keyed by id; BTreeMap keeps listings ordered
    pub(crate) tokens: BTreeMap<TokenId, TokenRecord>,

    /// Non-negative balances keyed by (holder, token); zero entries are removed
    pub(crate) balances: HashMap<(PartyAddress, TokenId), u64>,

    /// Next sequential token id
    pub(crate) next_id: TokenId,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self {
            tokens: BTreeMap::new(),
            balances: HashMap::new(),
            next_id: 1,
        }
    }

    /// Mint a new token for `creator`, consuming parent balances if lineage
    /// edges are given.
    ///
    /// The role gate lives here: zero-parent mints require the origin
    /// permission (Producer), lineage-consuming mints require the
    /// manufacture permission (Factory). Parent amounts are aggregated per
    /// parent id and checked all-or-nothing before any balance moves; the
    /// consumed units are burned, not transferred. Each requirement is
    /// validated against the creator's balance net of the escrow's pending
    /// reservations, so a burn can never consume units already promised to
    /// a still-Pending transfer.
    pub fn create_token(
        &mut self,
        creator: &PartyRecord,
        name: &str,
        total_supply: u64,
        features: &str,
        parents: Vec<LineageEdge>,
        escrow: &TransferEscrow,
    ) -> Result<TokenId, LedgerError> {
        if total_supply == 0 {
            return Err(LedgerError::InvalidAmount(
                "total supply must be positive".to_string(),
            ));
        }

        let perms = creator.role.permissions();
        if parents.is_empty() {
            if !perms.mint_origin {
                return Err(LedgerError::RoleNotPermitted {
                    role: creator.role,
                    action: "mint origin tokens",
                });
            }
        } else if !perms.manufacture {
            return Err(LedgerError::RoleNotPermitted {
                role: creator.role,
                action: "manufacture tokens from parents",
            });
        }

        // Aggregate required amounts per parent so a duplicated parent id
        // cannot pass the check twice against the same balance.
        let mut required: BTreeMap<TokenId, u64> = BTreeMap::new();
        for edge in &parents {
            if edge.amount == 0 {
                return Err(LedgerError::InvalidAmount(format!(
                    "parent {} amount must be positive",
                    edge.parent
                )));
            }
            if !self.tokens.contains_key(&edge.parent) {
                return Err(LedgerError::TokenNotFound(edge.parent));
            }
            *required.entry(edge.parent).or_insert(0) += edge.amount;
        }
        for (&parent, &need) in &required {
            let balance = self.balance_of(creator.address, parent);
            let reserved = escrow.reserved_of(creator.address, parent);
            let have = balance.saturating_sub(reserved);
            if have < need {
                return Err(LedgerError::InsufficientParentBalance {
                    token: parent,
                    have,
                    need,
                });
            }
        }

        // All checks passed; burn the parents and mint the new supply.
        for (&parent, &need) in &required {
            self.debit(creator.address, parent, need);
        }

        let id = self.next_id;
        self.next_id += 1;
        let parent_count = parents.len();
        self.tokens.insert(
            id,
            TokenRecord {
                id,
                creator: creator.address,
                name: name.to_string(),
                total_supply,
                features: features.to_string(),
                parents,
                created_at: Utc::now().timestamp(),
            },
        );
        self.credit(creator.address, id, total_supply);

        info!(
            "token {} ({}) minted by {}: supply {}, {} parent edge(s)",
            id, name, creator.address, total_supply, parent_count
        );
        Ok(id)
    }

    pub fn get_token(&self, id: TokenId) -> Result<&TokenRecord, LedgerError> {
        self.tokens.get(&id).ok_or(LedgerError::TokenNotFound(id))
    }

    /// Current balance; 0 for an unknown (party, token) pair.
    pub fn balance_of(&self, party: PartyAddress, token: TokenId) -> u64 {
        self.balances.get(&(party, token)).copied().unwrap_or(0)
    }

    /// Token ids the party currently holds with a balance above zero,
    /// ascending. "Ever held" ids with a depleted balance do not appear.
    pub fn tokens_held_by(&self, party: PartyAddress) -> Vec<TokenId> {
        let mut held: Vec<TokenId> = self
            .balances
            .iter()
            .filter(|((holder, _), &qty)| *holder == party && qty > 0)
            .map(|((_, token), _)| *token)
            .collect();
        held.sort_unstable();
        held
    }

    /// Sum of all holder balances for a token: the units still in
    /// circulation. Starts equal to the total supply and drops as units are
    /// burned as manufacturing parents; transfers never change it.
    pub fn holder_total(&self, token: TokenId) -> u64 {
        self.balances
            .iter()
            .filter(|((_, t), _)| *t == token)
            .map(|(_, &qty)| qty)
            .sum()
    }

    /// Move settled units from sender to receiver. Invoked only by the
    /// escrow when a transfer is accepted; the debit and credit happen
    /// together or not at all.
    pub(crate) fn settle_transfer(
        &mut self,
        from: PartyAddress,
        to: PartyAddress,
        token: TokenId,
        amount: u64,
    ) -> Result<(), LedgerError> {
        let have = self.balance_of(from, token);
        if have < amount {
            return Err(LedgerError::InsufficientBalance {
                token,
                have,
                need: amount,
            });
        }
        self.debit(from, token, amount);
        self.credit(to, token, amount);
        Ok(())
    }

    fn credit(&mut self, party: PartyAddress, token: TokenId, amount: u64) {
        *self.balances.entry((party, token)).or_insert(0) += amount;
    }

    // Callers validate the balance before debiting.
    fn debit(&mut self, party: PartyAddress, token: TokenId, amount: u64) {
        if let Some(entry) = self.balances.get_mut(&(party, token)) {
            debug_assert!(*entry >= amount);
            *entry = entry.saturating_sub(amount);
            if *entry == 0 {
                self.balances.remove(&(party, token));
            }
        }
    }
}
