pub mod engine;
pub mod escrow;
pub mod ledger;
pub mod registry;
pub mod trace;

// Re-export the main types for convenience
pub use engine::SupplyLedger;
pub use escrow::TransferEscrow;
pub use ledger::TokenLedger;
pub use registry::IdentityRegistry;
pub use trace::TraceEngine;
