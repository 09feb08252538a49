use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use provchain_core::error::LedgerError;
use provchain_core::id::{PartyAddress, TokenId, TransferId};
use provchain_core::party::{PartyRecord, PartyStatus, Role};
use provchain_core::snapshot::LedgerSnapshot;
use provchain_core::token::{LineageEdge, TokenRecord};
use provchain_core::transfer::{TransferRecord, TransferStatus};

use crate::escrow::TransferEscrow;
use crate::ledger::TokenLedger;
use crate::registry::IdentityRegistry;
use crate::trace::TraceEngine;

/// The authoritative supply-chain ledger: identity registry, token ledger
/// and transfer escrow behind one exclusive lock per entity group.
///
/// Locks are always acquired in registry → ledger → escrow order, so any
/// combination of concurrent operations serializes without deadlock. Every
/// operation either fully succeeds or fully fails; no call leaves a partial
/// mutation behind.
pub struct SupplyLedger {
    registry: RwLock<IdentityRegistry>,
    ledger: RwLock<TokenLedger>,
    escrow: RwLock<TransferEscrow>,
}

impl SupplyLedger {
    /// Create an empty ledger administered by `admin`. The administrator
    /// identity is fixed for the lifetime of the engine.
    pub fn new(admin: PartyAddress) -> Self {
        Self {
            registry: RwLock::new(IdentityRegistry::new(admin)),
            ledger: RwLock::new(TokenLedger::new()),
            escrow: RwLock::new(TransferEscrow::new()),
        }
    }

    // ---- identity operations ----

    pub fn admin(&self) -> Result<PartyAddress, LedgerError> {
        Ok(self.read_registry()?.admin())
    }

    pub fn is_admin(&self, party: PartyAddress) -> Result<bool, LedgerError> {
        Ok(self.read_registry()?.is_admin(party))
    }

    pub fn request_role(&self, caller: PartyAddress, role: Role) -> Result<(), LedgerError> {
        self.write_registry()?.request_role(caller, role)
    }

    pub fn set_status(
        &self,
        caller: PartyAddress,
        target: PartyAddress,
        status: PartyStatus,
    ) -> Result<(), LedgerError> {
        self.write_registry()?.set_status(caller, target, status)
    }

    /// Absence is a typed result: an unregistered address yields `None`.
    pub fn get_party(&self, party: PartyAddress) -> Result<Option<PartyRecord>, LedgerError> {
        Ok(self.read_registry()?.get_party(party).cloned())
    }

    // ---- token operations ----

    pub fn create_token(
        &self,
        caller: PartyAddress,
        name: &str,
        total_supply: u64,
        features: &str,
        parents: Vec<LineageEdge>,
    ) -> Result<TokenId, LedgerError> {
        // The registry guard stays held across the mint so a concurrent
        // status change cannot race an already-validated caller.
        let registry = self.read_registry()?;
        let creator = registry.require_approved(caller)?;
        let mut ledger = self.write_ledger()?;
        let escrow = self.read_escrow()?;
        ledger.create_token(creator, name, total_supply, features, parents, &escrow)
    }

    pub fn get_token(&self, id: TokenId) -> Result<TokenRecord, LedgerError> {
        Ok(self.read_ledger()?.get_token(id)?.clone())
    }

    pub fn get_balance(&self, party: PartyAddress, token: TokenId) -> Result<u64, LedgerError> {
        Ok(self.read_ledger()?.balance_of(party, token))
    }

    pub fn tokens_held_by(&self, party: PartyAddress) -> Result<Vec<TokenId>, LedgerError> {
        Ok(self.read_ledger()?.tokens_held_by(party))
    }

    /// Balance net of the party's own still-Pending outgoing transfers;
    /// the amount actually available to new proposals.
    pub fn unreserved_balance(
        &self,
        party: PartyAddress,
        token: TokenId,
    ) -> Result<u64, LedgerError> {
        let ledger = self.read_ledger()?;
        let escrow = self.read_escrow()?;
        Ok(ledger
            .balance_of(party, token)
            .saturating_sub(escrow.reserved_of(party, token)))
    }

    pub fn trace_to_origin(&self, token: TokenId) -> Result<Vec<(TokenId, f64)>, LedgerError> {
        let ledger = self.read_ledger()?;
        TraceEngine::new(&ledger).trace_to_origin(token)
    }

    // ---- transfer operations ----

    pub fn propose(
        &self,
        caller: PartyAddress,
        to: PartyAddress,
        token: TokenId,
        amount: u64,
    ) -> Result<TransferId, LedgerError> {
        let registry = self.read_registry()?;
        registry.require_approved(caller)?;
        let ledger = self.read_ledger()?;
        self.write_escrow()?.propose(caller, to, token, amount, &ledger)
    }

    pub fn accept(&self, caller: PartyAddress, id: TransferId) -> Result<(), LedgerError> {
        let mut ledger = self.write_ledger()?;
        self.write_escrow()?.accept(caller, id, &mut ledger)
    }

    pub fn reject(&self, caller: PartyAddress, id: TransferId) -> Result<(), LedgerError> {
        self.write_escrow()?.reject(caller, id)
    }

    pub fn cancel(&self, caller: PartyAddress, id: TransferId) -> Result<(), LedgerError> {
        self.write_escrow()?.cancel(caller, id)
    }

    pub fn get_transfer(&self, id: TransferId) -> Result<TransferRecord, LedgerError> {
        Ok(self.read_escrow()?.get_transfer(id)?.clone())
    }

    pub fn transfers_involving(
        &self,
        party: PartyAddress,
    ) -> Result<Vec<TransferId>, LedgerError> {
        Ok(self.read_escrow()?.transfers_involving(party))
    }

    // ---- persistence ----

    /// Export a consistent image of the four logical tables. All locks are
    /// held for the duration, so the snapshot never tears a record.
    pub fn snapshot(&self) -> Result<LedgerSnapshot, LedgerError> {
        let registry = self.read_registry()?;
        let ledger = self.read_ledger()?;
        let escrow = self.read_escrow()?;

        let mut parties: Vec<PartyRecord> = registry.parties.values().cloned().collect();
        parties.sort_by_key(|p| p.id);

        let mut balances: Vec<(PartyAddress, TokenId, u64)> = ledger
            .balances
            .iter()
            .map(|(&(party, token), &qty)| (party, token, qty))
            .collect();
        balances.sort();

        Ok(LedgerSnapshot {
            admin: registry.admin(),
            parties,
            next_party_id: registry.next_id,
            tokens: ledger.tokens.values().cloned().collect(),
            balances,
            next_token_id: ledger.next_id,
            transfers: escrow.transfers.values().cloned().collect(),
            next_transfer_id: escrow.next_id,
        })
    }

    /// Rebuild an engine from a snapshot. The escrow's reservation ledger is
    /// not persisted; it is recomputed here by summing Pending transfers per
    /// (sender, token), and the import fails with `Inconsistent` if any
    /// recomputed reservation exceeds the sender's held balance.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Result<Self, LedgerError> {
        let parties: HashMap<PartyAddress, PartyRecord> = snapshot
            .parties
            .into_iter()
            .map(|p| (p.address, p))
            .collect();
        let registry =
            IdentityRegistry::from_parts(snapshot.admin, parties, snapshot.next_party_id);

        let tokens: BTreeMap<TokenId, TokenRecord> = snapshot
            .tokens
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        let balances: HashMap<(PartyAddress, TokenId), u64> = snapshot
            .balances
            .into_iter()
            .filter(|&(_, _, qty)| qty > 0)
            .map(|(party, token, qty)| ((party, token), qty))
            .collect();
        let ledger = TokenLedger {
            tokens,
            balances,
            next_id: snapshot.next_token_id,
        };

        let mut reserved: HashMap<(PartyAddress, TokenId), u64> = HashMap::new();
        for transfer in &snapshot.transfers {
            if transfer.status == TransferStatus::Pending {
                *reserved.entry((transfer.from, transfer.token)).or_insert(0) +=
                    transfer.amount;
            }
        }
        for (&(party, token), &amount) in &reserved {
            let balance = ledger.balance_of(party, token);
            if balance < amount {
                return Err(LedgerError::Inconsistent(format!(
                    "pending transfers of token {} reserve {} units but {} holds only {}",
                    token, amount, party, balance
                )));
            }
        }
        let escrow = TransferEscrow {
            transfers: snapshot
                .transfers
                .into_iter()
                .map(|t| (t.id, t))
                .collect(),
            reserved,
            next_id: snapshot.next_transfer_id,
        };

        Ok(Self {
            registry: RwLock::new(registry),
            ledger: RwLock::new(ledger),
            escrow: RwLock::new(escrow),
        })
    }

    // ---- lock plumbing ----

    fn read_registry(&self) -> Result<RwLockReadGuard<'_, IdentityRegistry>, LedgerError> {
        self.registry.read().map_err(|_| poisoned("registry"))
    }

    fn write_registry(&self) -> Result<RwLockWriteGuard<'_, IdentityRegistry>, LedgerError> {
        self.registry.write().map_err(|_| poisoned("registry"))
    }

    fn read_ledger(&self) -> Result<RwLockReadGuard<'_, TokenLedger>, LedgerError> {
        self.ledger.read().map_err(|_| poisoned("ledger"))
    }

    fn write_ledger(&self) -> Result<RwLockWriteGuard<'_, TokenLedger>, LedgerError> {
        self.ledger.write().map_err(|_| poisoned("ledger"))
    }

    fn read_escrow(&self) -> Result<RwLockReadGuard<'_, TransferEscrow>, LedgerError> {
        self.escrow.read().map_err(|_| poisoned("escrow"))
    }

    fn write_escrow(&self) -> Result<RwLockWriteGuard<'_, TransferEscrow>, LedgerError> {
        self.escrow.write().map_err(|_| poisoned("escrow"))
    }
}

fn poisoned(table: &str) -> LedgerError {
    LedgerError::Other(format!("{} lock poisoned", table))
}
