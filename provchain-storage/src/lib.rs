pub mod snapshot_store;

// Re-export the main types for convenience
pub use snapshot_store::{FileSnapshotStore, SnapshotStore};
