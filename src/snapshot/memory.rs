//! In-memory snapshot store.
//!
//! Holds objects in a hash map and the latest published root per board. It
//! neither signs nor persists anything; it exists for embedding applications
//! that want a volatile store and for exercising the state layer end to end.

use crate::error::{Result, StateError};
use crate::object::{ContentHash, PublicKey};
use crate::snapshot::{build_snapshot, RootValues, Snapshot, SnapshotStore};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// Volatile [`SnapshotStore`] implementation.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    objects: RwLock<HashMap<ContentHash, Vec<u8>>>,
    roots: RwLock<HashMap<PublicKey, Snapshot>>,
}

impl MemorySnapshotStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `snapshot` the latest complete snapshot of its board.
    ///
    /// Fails if the sequence number does not advance past the current root.
    pub fn publish(&self, snapshot: Snapshot) -> Result<()> {
        let mut roots = self
            .roots
            .write()
            .map_err(|_| StateError::store("root table lock poisoned"))?;
        if let Some(current) = roots.get(&snapshot.public_key) {
            if snapshot.seq <= current.seq {
                return Err(StateError::store(format!(
                    "snapshot seq {} of board {} does not advance past {}",
                    snapshot.seq, snapshot.public_key, current.seq
                )));
            }
        }
        debug!(
            "Published snapshot {} of board {}",
            snapshot.seq, snapshot.public_key
        );
        roots.insert(snapshot.public_key, snapshot);
        Ok(())
    }

    /// Stores `values` as the next snapshot of `board` and publishes it.
    pub fn commit(&self, board: PublicKey, values: RootValues) -> Result<Snapshot> {
        let seq = match self.latest_snapshot(&board) {
            Ok(current) => current.seq + 1,
            Err(StateError::NotFound(_)) => 1,
            Err(e) => return Err(e),
        };
        let snapshot = build_snapshot(self, board, seq, values)?;
        self.publish(snapshot.clone())?;
        Ok(snapshot)
    }

    /// Returns the number of stored objects.
    pub fn object_count(&self) -> usize {
        self.objects.read().map(|o| o.len()).unwrap_or_default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn latest_snapshot(&self, board: &PublicKey) -> Result<Snapshot> {
        let roots = self
            .roots
            .read()
            .map_err(|_| StateError::store("root table lock poisoned"))?;
        roots.get(board).cloned().ok_or_else(|| {
            StateError::not_found(format!("no complete snapshot for board {}", board))
        })
    }

    fn get_object(&self, hash: &ContentHash) -> Result<Option<Vec<u8>>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| StateError::store("object table lock poisoned"))?;
        Ok(objects.get(hash).cloned())
    }

    fn put_object(&self, bytes: Vec<u8>) -> Result<ContentHash> {
        let hash = self.hash_of(&bytes);
        let mut objects = self
            .objects
            .write()
            .map_err(|_| StateError::store("object table lock poisoned"))?;
        objects.entry(hash).or_insert(bytes);
        Ok(hash)
    }
}
