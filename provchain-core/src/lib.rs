pub mod error;
pub mod id;
pub mod party;
pub mod snapshot;
pub mod token;
pub mod transfer;

// Re-export the main types for convenience
pub use error::LedgerError;
pub use id::{PartyAddress, TokenId, TransferId};
pub use party::{PartyRecord, PartyStatus, Role, RolePermissions};
pub use snapshot::LedgerSnapshot;
pub use token::{LineageEdge, TokenRecord};
pub use transfer::{TransferRecord, TransferStatus};
