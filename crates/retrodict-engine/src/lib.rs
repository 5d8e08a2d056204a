//! Retrodict Engine
//!
//! Runs the reconstruction pipeline over a pool of traces and candidate
//! claims, producing the content of a world-model snapshot.
//!
//! The engine provides:
//! - Trace and claim ingestion from JSON, failing fast on malformed input
//! - Full reconstruction and incremental updates against a parent model
//! - Confidence revision records for VERIFIED claims that change
//! - Filtered views by layer, time window and confidence floor
//! - Calibration of confidence levels against known outcomes
//! - Layered TOML configuration and `tracing` setup
//!
//! # Examples
//!
//! ```
//! use retrodict_engine::{CancelFlag, Reconstructor};
//!
//! let derivation = Reconstructor::default_config()
//!     .reconstruct(Vec::new(), Vec::new(), &CancelFlag::new())
//!     .unwrap();
//! assert!(derivation.content.claims.is_empty());
//! ```

#![warn(missing_docs)]

mod calibration;
mod config;
mod error;
pub mod ingest;
mod reconstructor;
pub mod telemetry;
mod view;

pub use calibration::{accuracy_target, CalibrationReport, LevelAccuracy};
pub use config::EngineConfig;
pub use error::EngineError;
pub use reconstructor::{
    verified_revisions, Derivation, DerivationStats, Reconstructor, UpdateBatch,
};
pub use retrodict_temporal::CancelFlag;
pub use view::{ReconstructionRequest, SnapshotView};
