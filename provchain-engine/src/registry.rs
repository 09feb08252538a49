use std::collections::HashMap;

use log::info;
use provchain_core::error::LedgerError;
use provchain_core::id::PartyAddress;
use provchain_core::party::{PartyRecord, PartyStatus, Role};

/// Party table and the authorization gate for the rest of the engine.
///
/// The administrator is a single fixed identity set at construction;
/// "is this caller admin" is a pure comparison against it. Party records
/// are created on first role request and never deleted afterwards.
#[derive(Debug)]
pub struct IdentityRegistry {
    /// The designated administrator, immutable after construction
    admin: PartyAddress,

    /// Party records keyed by address
    pub(crate) parties: HashMap<PartyAddress, PartyRecord>,

    /// Next sequential party id
    pub(crate) next_id: u64,
}

impl IdentityRegistry {
    pub fn new(admin: PartyAddress) -> Self {
        Self {
            admin,
            parties: HashMap::new(),
            next_id: 1,
        }
    }

    /// Rebuild a registry from persisted parts; used by snapshot import.
    pub(crate) fn from_parts(
        admin: PartyAddress,
        parties: HashMap<PartyAddress, PartyRecord>,
        next_id: u64,
    ) -> Self {
        Self {
            admin,
            parties,
            next_id,
        }
    }

    pub fn admin(&self) -> PartyAddress {
        self.admin
    }

    pub fn is_admin(&self, party: PartyAddress) -> bool {
        party == self.admin
    }

    /// Request a role for `party`.
    ///
    /// Creates a Pending record on first contact. A Canceled or Rejected
    /// record re-enters the lifecycle: its role is reset to the requested
    /// one and its status returns to Pending. Re-requesting the same role
    /// while already Pending is a no-op; any other re-request against a
    /// live (Pending or Approved) record fails with `AlreadyActive`.
    pub fn request_role(&mut self, party: PartyAddress, role: Role) -> Result<(), LedgerError> {
        if let Some(record) = self.parties.get_mut(&party) {
            return match record.status {
                PartyStatus::Pending if record.role == role => Ok(()),
                PartyStatus::Pending | PartyStatus::Approved => {
                    Err(LedgerError::AlreadyActive(party))
                }
                PartyStatus::Rejected | PartyStatus::Canceled => {
                    record.role = role;
                    record.status = PartyStatus::Pending;
                    info!("party {} re-requested role {}", party, role);
                    Ok(())
                }
            };
        }

        let id = self.next_id;
        self.next_id += 1;
        self.parties.insert(
            party,
            PartyRecord {
                id,
                address: party,
                role,
                status: PartyStatus::Pending,
            },
        );
        info!("party {} registered with role {} (id {})", party, role, id);
        Ok(())
    }

    /// Change a party's status. Admin only; any status may follow any other,
    /// including resurrecting a Rejected party.
    pub fn set_status(
        &mut self,
        caller: PartyAddress,
        target: PartyAddress,
        status: PartyStatus,
    ) -> Result<(), LedgerError> {
        if !self.is_admin(caller) {
            return Err(LedgerError::Unauthorized(format!(
                "{} is not the administrator",
                caller
            )));
        }
        let record = self
            .parties
            .get_mut(&target)
            .ok_or(LedgerError::PartyNotFound(target))?;
        record.status = status;
        info!("party {} status set to {}", target, status);
        Ok(())
    }

    /// Look up a party record; absence is a typed result, not an error.
    pub fn get_party(&self, party: PartyAddress) -> Option<&PartyRecord> {
        self.parties.get(&party)
    }

    /// Authorization helper consumed by the other components: only Approved
    /// parties may reach mutating operations.
    pub fn require_approved(&self, party: PartyAddress) -> Result<&PartyRecord, LedgerError> {
        match self.parties.get(&party) {
            Some(record) if record.is_approved() => Ok(record),
            _ => Err(LedgerError::NotApproved(party)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (IdentityRegistry, PartyAddress) {
        let admin = PartyAddress::derive(&[b"admin"]);
        (IdentityRegistry::new(admin), admin)
    }

    #[test]
    fn test_first_request_creates_pending_record() {
        let (mut reg, _) = registry();
        let alice = PartyAddress::derive(&[b"alice"]);

        reg.request_role(alice, Role::Producer).unwrap();
        let rec = reg.get_party(alice).unwrap();
        assert_eq!(rec.id, 1);
        assert_eq!(rec.role, Role::Producer);
        assert_eq!(rec.status, PartyStatus::Pending);

        // Sequential ids
        let bob = PartyAddress::derive(&[b"bob"]);
        reg.request_role(bob, Role::Factory).unwrap();
        assert_eq!(reg.get_party(bob).unwrap().id, 2);
    }

    #[test]
    fn test_same_role_re_request_while_pending_is_noop() {
        let (mut reg, _) = registry();
        let alice = PartyAddress::derive(&[b"alice"]);

        reg.request_role(alice, Role::Producer).unwrap();
        reg.request_role(alice, Role::Producer).unwrap();
        assert_eq!(reg.get_party(alice).unwrap().status, PartyStatus::Pending);
    }

    #[test]
    fn test_live_record_blocks_new_request() {
        let (mut reg, admin) = registry();
        let alice = PartyAddress::derive(&[b"alice"]);

        reg.request_role(alice, Role::Producer).unwrap();
        assert!(matches!(
            reg.request_role(alice, Role::Factory),
            Err(LedgerError::AlreadyActive(_))
        ));

        reg.set_status(admin, alice, PartyStatus::Approved).unwrap();
        assert!(matches!(
            reg.request_role(alice, Role::Producer),
            Err(LedgerError::AlreadyActive(_))
        ));
    }

    #[test]
    fn test_canceled_party_can_re_enter_with_new_role() {
        let (mut reg, admin) = registry();
        let alice = PartyAddress::derive(&[b"alice"]);

        reg.request_role(alice, Role::Producer).unwrap();
        reg.set_status(admin, alice, PartyStatus::Canceled).unwrap();

        reg.request_role(alice, Role::Factory).unwrap();
        let rec = reg.get_party(alice).unwrap();
        assert_eq!(rec.role, Role::Factory);
        assert_eq!(rec.status, PartyStatus::Pending);
        // Re-entry keeps the original sequential id
        assert_eq!(rec.id, 1);
    }

    #[test]
    fn test_set_status_requires_admin_and_target() {
        let (mut reg, admin) = registry();
        let alice = PartyAddress::derive(&[b"alice"]);
        let mallory = PartyAddress::derive(&[b"mallory"]);

        reg.request_role(alice, Role::Producer).unwrap();
        assert!(matches!(
            reg.set_status(mallory, alice, PartyStatus::Approved),
            Err(LedgerError::Unauthorized(_))
        ));
        assert!(matches!(
            reg.set_status(admin, mallory, PartyStatus::Approved),
            Err(LedgerError::PartyNotFound(_))
        ));
    }

    #[test]
    fn test_rejected_party_can_be_resurrected() {
        let (mut reg, admin) = registry();
        let alice = PartyAddress::derive(&[b"alice"]);

        reg.request_role(alice, Role::Producer).unwrap();
        reg.set_status(admin, alice, PartyStatus::Rejected).unwrap();
        assert!(reg.require_approved(alice).is_err());

        reg.set_status(admin, alice, PartyStatus::Approved).unwrap();
        assert!(reg.require_approved(alice).is_ok());
    }

    #[test]
    fn test_require_approved() {
        let (mut reg, admin) = registry();
        let alice = PartyAddress::derive(&[b"alice"]);
        let stranger = PartyAddress::derive(&[b"stranger"]);

        assert!(matches!(
            reg.require_approved(stranger),
            Err(LedgerError::NotApproved(_))
        ));

        reg.request_role(alice, Role::Producer).unwrap();
        assert!(reg.require_approved(alice).is_err());

        reg.set_status(admin, alice, PartyStatus::Approved).unwrap();
        assert_eq!(reg.require_approved(alice).unwrap().role, Role::Producer);
    }
}
