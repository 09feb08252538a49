use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use log::{error, info};
use provchain_core::error::LedgerError;
use provchain_core::id::{PartyAddress, TokenId, TransferId};
use provchain_core::transfer::{TransferRecord, TransferStatus};

use crate::ledger::TokenLedger;

/// Two-phase transfer protocol: propose → accept | reject | cancel.
///
/// Proposing reserves the amount against the sender's balance without
/// debiting it; the ledger moves balance only when the receiver accepts.
/// The reservation ledger is escrow-internal bookkeeping, derivable at any
/// time by summing Pending transfers per (sender, token).
#[derive(Debug, Default)]
pub struct TransferEscrow {
    /// Transfer records keyed by id; BTreeMap keeps listings ordered
    pub(crate) transfers: BTreeMap<TransferId, TransferRecord>,

    /// Units reserved by still-Pending outgoing transfers per (sender, token)
    pub(crate) reserved: HashMap<(PartyAddress, TokenId), u64>,

    /// Next sequential transfer id
    pub(crate) next_id: TransferId,
}

impl TransferEscrow {
    pub fn new() -> Self {
        Self {
            transfers: BTreeMap::new(),
            reserved: HashMap::new(),
            next_id: 1,
        }
    }

    /// Units of `token` the sender has promised to still-Pending transfers.
    pub fn reserved_of(&self, party: PartyAddress, token: TokenId) -> u64 {
        self.reserved.get(&(party, token)).copied().unwrap_or(0)
    }

    /// Propose a transfer from `sender` to `receiver`.
    ///
    /// The sender must be Approved (checked by the caller before handing in
    /// the address) and must hold at least `amount` units net of existing
    /// reservations, so a balance can never be promised twice.
    pub fn propose(
        &mut self,
        sender: PartyAddress,
        receiver: PartyAddress,
        token: TokenId,
        amount: u64,
        ledger: &TokenLedger,
    ) -> Result<TransferId, LedgerError> {
        if sender == receiver {
            return Err(LedgerError::SelfTransfer);
        }
        if amount == 0 {
            return Err(LedgerError::InvalidAmount(
                "transfer amount must be positive".to_string(),
            ));
        }
        ledger.get_token(token)?;

        let balance = ledger.balance_of(sender, token);
        let reserved = self.reserved_of(sender, token);
        let available = balance.saturating_sub(reserved);
        if available < amount {
            return Err(LedgerError::InsufficientUnreservedBalance {
                token,
                available,
                requested: amount,
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.transfers.insert(
            id,
            TransferRecord {
                id,
                from: sender,
                to: receiver,
                token,
                amount,
                created_at: Utc::now().timestamp(),
                status: TransferStatus::Pending,
            },
        );
        *self.reserved.entry((sender, token)).or_insert(0) += amount;

        info!(
            "transfer {} proposed: {} -> {}, {} x token {}",
            id, sender, receiver, amount, token
        );
        Ok(id)
    }

    /// Receiver accepts a pending transfer; the ledger settles the balance
    /// movement and the reservation is released.
    pub fn accept(
        &mut self,
        caller: PartyAddress,
        id: TransferId,
        ledger: &mut TokenLedger,
    ) -> Result<(), LedgerError> {
        let (from, to, token, amount) = self.pending_checked(caller, id, Endpoint::Receiver)?;

        // The reservation invariant should make this infallible; if the
        // sender's real balance still fell short, state is corrupt and the
        // transfer is left Pending rather than silently retried.
        if let Err(err) = ledger.settle_transfer(from, to, token, amount) {
            if matches!(err, LedgerError::InsufficientBalance { .. }) {
                error!(
                    "integrity violation accepting transfer {}: reserved {} x token {} \
                     no longer backed by {}'s balance",
                    id, amount, token, from
                );
            }
            return Err(err);
        }

        self.release_reservation(from, token, amount);
        self.resolve(id, TransferStatus::Accepted);
        Ok(())
    }

    /// Receiver declines a pending transfer. No balance moves.
    pub fn reject(&mut self, caller: PartyAddress, id: TransferId) -> Result<(), LedgerError> {
        let (from, _, token, amount) = self.pending_checked(caller, id, Endpoint::Receiver)?;
        self.release_reservation(from, token, amount);
        self.resolve(id, TransferStatus::Rejected);
        Ok(())
    }

    /// Sender withdraws a still-Pending proposal. No balance moves.
    pub fn cancel(&mut self, caller: PartyAddress, id: TransferId) -> Result<(), LedgerError> {
        let (from, _, token, amount) = self.pending_checked(caller, id, Endpoint::Sender)?;
        self.release_reservation(from, token, amount);
        self.resolve(id, TransferStatus::Canceled);
        Ok(())
    }

    pub fn get_transfer(&self, id: TransferId) -> Result<&TransferRecord, LedgerError> {
        self.transfers
            .get(&id)
            .ok_or(LedgerError::TransferNotFound(id))
    }

    /// Ids of all transfers where the party is sender or receiver, ascending.
    pub fn transfers_involving(&self, party: PartyAddress) -> Vec<TransferId> {
        self.transfers
            .values()
            .filter(|t| t.involves(party))
            .map(|t| t.id)
            .collect()
    }

    /// Validate caller and state for a resolution step, returning the fields
    /// needed to carry it out.
    fn pending_checked(
        &self,
        caller: PartyAddress,
        id: TransferId,
        endpoint: Endpoint,
    ) -> Result<(PartyAddress, PartyAddress, TokenId, u64), LedgerError> {
        let transfer = self.get_transfer(id)?;
        let expected = match endpoint {
            Endpoint::Sender => transfer.from,
            Endpoint::Receiver => transfer.to,
        };
        if caller != expected {
            return Err(LedgerError::Unauthorized(format!(
                "{} is not the {} of transfer {}",
                caller,
                match endpoint {
                    Endpoint::Sender => "sender",
                    Endpoint::Receiver => "receiver",
                },
                id
            )));
        }
        if transfer.status != TransferStatus::Pending {
            return Err(LedgerError::NotPending(id));
        }
        Ok((transfer.from, transfer.to, transfer.token, transfer.amount))
    }

    fn resolve(&mut self, id: TransferId, status: TransferStatus) {
        debug_assert!(status.is_terminal());
        if let Some(transfer) = self.transfers.get_mut(&id) {
            transfer.status = status;
            info!("transfer {} resolved: {}", id, status);
        }
    }

    fn release_reservation(&mut self, party: PartyAddress, token: TokenId, amount: u64) {
        if let Some(entry) = self.reserved.get_mut(&(party, token)) {
            debug_assert!(*entry >= amount);
            *entry = entry.saturating_sub(amount);
            if *entry == 0 {
                self.reserved.remove(&(party, token));
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Endpoint {
    Sender,
    Receiver,
}
