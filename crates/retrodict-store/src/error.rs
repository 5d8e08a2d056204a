//! Store error types

use retrodict_domain::VersionId;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Snapshot body could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A snapshot with this version was already published
    #[error("Version already published: {0}")]
    DuplicateVersion(VersionId),

    /// The snapshot's parent has not been published
    #[error("Unknown parent version: {0}")]
    UnknownParent(VersionId),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A lock was poisoned by a panicking writer
    #[error("Store lock poisoned: {0}")]
    Poisoned(String),
}
