use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::info;
use provchain_core::error::LedgerError;
use provchain_core::snapshot::LedgerSnapshot;

/// Durable store for ledger snapshots.
///
/// The engine stays persistence-agnostic; anything that can hold a
/// `LedgerSnapshot` can sit behind this trait.
pub trait SnapshotStore {
    /// Persist a snapshot, replacing any previous one.
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), LedgerError>;

    /// Load the most recently saved snapshot, or `None` if nothing has been
    /// persisted yet.
    fn load(&self) -> Result<Option<LedgerSnapshot>, LedgerError>;
}

/// File-backed snapshot store: a single length-prefixed bincode record.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, snapshot: &LedgerSnapshot) -> Result<(), LedgerError> {
        let serialized = bincode::serialize(snapshot)?;

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(&(serialized.len() as u64).to_le_bytes())?;
        writer.write_all(&serialized)?;
        writer.flush()?;

        info!(
            "snapshot saved to {} ({} parties, {} tokens, {} transfers)",
            self.path.display(),
            snapshot.parties.len(),
            snapshot.tokens.len(),
            snapshot.transfers.len()
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<LedgerSnapshot>, LedgerError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let mut len_bytes = [0u8; 8];
        reader.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes) as usize;

        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf)?;

        let snapshot: LedgerSnapshot = bincode::deserialize(&buf)?;
        Ok(Some(snapshot))
    }
}
