//! Retrodict Storage Layer
//!
//! Implements the [`SnapshotStore`] trait: an arena of immutable world-model
//! snapshots indexed by version id, with parent pointers forming a linear or
//! branching history.
//!
//! This crate provides:
//! - [`MemorySnapshotStore`]: lock-protected in-process arena
//! - [`SqliteSnapshotStore`]: SQLite persistence with JSON snapshot bodies
//!
//! # Examples
//!
//! ```
//! use retrodict_domain::{ModelContent, SnapshotKind, SnapshotStore, WorldModelSnapshot};
//! use retrodict_store::MemorySnapshotStore;
//!
//! let store = MemorySnapshotStore::new();
//! let root = store
//!     .publish(WorldModelSnapshot::new(None, SnapshotKind::Initial, vec![], ModelContent::default()))
//!     .unwrap();
//! assert_eq!(store.heads().unwrap(), vec![root.version()]);
//! ```

#![warn(missing_docs)]

mod error;
mod memory;
mod sqlite;

pub use error::StoreError;
pub use memory::MemorySnapshotStore;
pub use retrodict_domain::SnapshotStore;
pub use sqlite::SqliteSnapshotStore;
