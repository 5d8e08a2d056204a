//! Error types for continual updates

use retrodict_domain::{ReasonCode, VersionId};
use retrodict_engine::EngineError;
use thiserror::Error;

/// Errors that can occur while folding updates into the history
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Pipeline error; nothing was published
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Another update on the same parent is in flight
    #[error("Concurrent update conflict on version {parent}")]
    ConcurrentUpdateConflict {
        /// Contended parent version
        parent: VersionId,
    },

    /// No snapshot with this version
    #[error("Unknown version: {0}")]
    UnknownVersion(VersionId),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}

impl UpdateError {
    /// Machine-readable reason, for the failures the taxonomy names
    pub fn reason_code(&self) -> Option<ReasonCode> {
        match self {
            UpdateError::ConcurrentUpdateConflict { .. } => Some(ReasonCode::ConcurrentUpdateConflict),
            UpdateError::Engine(e) => e.reason_code(),
            _ => None,
        }
    }
}
