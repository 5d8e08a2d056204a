//! Engine error types

use retrodict_domain::{DomainError, ReasonCode, TraceId};
use retrodict_gatekeeper::GatekeeperError;
use retrodict_temporal::TemporalError;
use thiserror::Error;

/// Errors that abort a reconstruction or update
///
/// Per-candidate and per-edge outcomes are never errors; they are voids
/// and flags on the resulting model. Every variant here leaves the caller's
/// state untouched.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A trace failed validation before any graph work began
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A retraction names a trace the model does not hold
    #[error("Unknown trace: {0}")]
    UnknownTrace(TraceId),

    /// The stored claim ledger could not be restored
    #[error("Ledger error: {0}")]
    Ledger(#[from] GatekeeperError),

    /// The temporal solve failed or was cancelled
    #[error("Temporal solver error: {0}")]
    Temporal(#[from] TemporalError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("Failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Failed to decode JSON input
    #[error("Invalid JSON input: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Machine-readable reason for failures in the outcome taxonomy
    pub fn reason_code(&self) -> Option<ReasonCode> {
        match self {
            EngineError::Domain(DomainError::MalformedTrace { .. })
            | EngineError::Domain(DomainError::InvalidTime(_))
            | EngineError::UnknownTrace(_)
            | EngineError::Json(_) => Some(ReasonCode::MalformedTrace),
            _ => None,
        }
    }

    /// Whether the caller cancelled the run
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Temporal(TemporalError::Cancelled { .. }))
    }
}
