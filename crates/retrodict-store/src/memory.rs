//! In-memory snapshot arena

use crate::StoreError;
use retrodict_domain::{SnapshotStore, VersionId, WorldModelSnapshot};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct Arena {
    snapshots: HashMap<VersionId, Arc<WorldModelSnapshot>>,
    /// Publication order
    order: Vec<VersionId>,
    children: HashMap<VersionId, Vec<VersionId>>,
}

/// Snapshot store held entirely in memory
///
/// Readers share a read lock; publication takes the write lock, so a
/// snapshot becomes visible atomically with its parent link.
#[derive(Default)]
pub struct MemorySnapshotStore {
    arena: RwLock<Arena>,
}

impl MemorySnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of published snapshots
    pub fn len(&self) -> usize {
        self.arena.read().map(|a| a.order.len()).unwrap_or(0)
    }

    /// Whether nothing has been published
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Poisoned("memory arena".to_string())
}

impl SnapshotStore for MemorySnapshotStore {
    type Error = StoreError;

    fn publish(&self, snapshot: WorldModelSnapshot) -> Result<Arc<WorldModelSnapshot>, Self::Error> {
        let mut arena = self.arena.write().map_err(poisoned)?;
        let version = snapshot.version();
        if arena.snapshots.contains_key(&version) {
            return Err(StoreError::DuplicateVersion(version));
        }
        if let Some(parent) = snapshot.parent() {
            if !arena.snapshots.contains_key(&parent) {
                return Err(StoreError::UnknownParent(parent));
            }
            arena.children.entry(parent).or_default().push(version);
        }

        let snapshot = Arc::new(snapshot);
        arena.snapshots.insert(version, Arc::clone(&snapshot));
        arena.order.push(version);
        tracing::debug!("Published snapshot {} ({} total)", version, arena.order.len());
        Ok(snapshot)
    }

    fn get(&self, version: VersionId) -> Result<Option<Arc<WorldModelSnapshot>>, Self::Error> {
        let arena = self.arena.read().map_err(poisoned)?;
        Ok(arena.snapshots.get(&version).cloned())
    }

    fn children(&self, version: VersionId) -> Result<Vec<VersionId>, Self::Error> {
        let arena = self.arena.read().map_err(poisoned)?;
        Ok(arena.children.get(&version).cloned().unwrap_or_default())
    }

    fn heads(&self) -> Result<Vec<VersionId>, Self::Error> {
        let arena = self.arena.read().map_err(poisoned)?;
        Ok(arena
            .order
            .iter()
            .filter(|v| arena.children.get(v).map_or(true, Vec::is_empty))
            .copied()
            .collect())
    }
}
