//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{VersionId, WorldModelSnapshot};
use std::sync::Arc;

/// Arena of immutable snapshots indexed by version id
///
/// Implemented by the infrastructure layer (retrodict-store). Methods take
/// `&self` so one store can be shared across update tasks.
pub trait SnapshotStore: Send + Sync {
    /// Error type for store operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Publish a snapshot; fails if the version already exists or the parent is unknown
    fn publish(&self, snapshot: WorldModelSnapshot) -> Result<Arc<WorldModelSnapshot>, Self::Error>;

    /// Get a snapshot by version
    fn get(&self, version: VersionId) -> Result<Option<Arc<WorldModelSnapshot>>, Self::Error>;

    /// Direct children of a version, oldest first
    fn children(&self, version: VersionId) -> Result<Vec<VersionId>, Self::Error>;

    /// Versions with no children, oldest first
    fn heads(&self) -> Result<Vec<VersionId>, Self::Error>;

    /// Version chain from `version` back to its root (inclusive, newest first)
    ///
    /// Returns an empty chain when `version` is unknown.
    fn lineage(&self, version: VersionId) -> Result<Vec<VersionId>, Self::Error> {
        let mut chain = Vec::new();
        let mut cursor = Some(version);
        while let Some(current) = cursor {
            match self.get(current)? {
                Some(snapshot) => {
                    chain.push(current);
                    cursor = snapshot.parent();
                }
                None => break,
            }
        }
        Ok(chain)
    }
}
