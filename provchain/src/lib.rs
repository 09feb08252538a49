//! Supply-chain provenance ledger (PROVCHAIN)
//!
//! This crate re-exports all the components of the PROVCHAIN system.

pub use provchain_core::*;
pub use provchain_engine::*;
pub use provchain_storage::*;
