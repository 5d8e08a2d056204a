//! Retrodict Revision
//!
//! Continual update engine: folds new evidence into a versioned history of
//! world-model snapshots without ever modifying a published version.
//!
//! # Overview
//!
//! The revision layer is responsible for:
//! - **Bootstrap**: reconstructing a first model and publishing it as a root
//! - **Updates**: incremental re-derivation of the affected subgraph, published
//!   as a child of the version it was derived from
//! - **Revisions**: recording prior and new confidence whenever a VERIFIED
//!   claim changes, and marking the child as a revision
//! - **Counterfactuals**: labelled branches exploring retracted or added evidence
//! - **Serialisation**: one update in flight per parent, later ones queued in
//!   arrival order
//!
//! # Usage
//!
//! ```
//! use retrodict_engine::{CancelFlag, UpdateBatch};
//! use retrodict_domain::{SnapshotKind, SnapshotStore};
//! use retrodict_revision::{ContinualUpdateEngine, UpdateConfig};
//! use retrodict_store::MemorySnapshotStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = ContinualUpdateEngine::new(MemorySnapshotStore::new(), UpdateConfig::default())?;
//! let root = engine.bootstrap(Vec::new(), Vec::new(), &CancelFlag::new())?;
//!
//! let branch = engine.fork(root.version(), "no eruption", &UpdateBatch::new(), &CancelFlag::new())?;
//! assert!(matches!(branch.kind(), SnapshotKind::Counterfactual { .. }));
//! assert_eq!(engine.store().children(root.version())?, vec![branch.version()]);
//! println!("{}", engine.metrics().summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! ```toml
//! full_recompute_ratio = 0.5
//! queue_wait_ms = 30000
//!
//! [engine.temporal]
//! max_iterations = 200
//! ```

#![warn(missing_docs)]

mod config;
mod coordinator;
mod engine;
mod error;
mod metrics;

pub use config::UpdateConfig;
pub use coordinator::UpdateCoordinator;
pub use engine::ContinualUpdateEngine;
pub use error::UpdateError;
pub use metrics::UpdateMetrics;
