//! Gatekeeper error types

use thiserror::Error;

/// Errors that can occur during gatekeeper operations
///
/// Per-candidate rejections are not errors; they are reported as voids in
/// the admission report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatekeeperError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Ledger could not be restored from a claim list
    #[error("Ledger error: {0}")]
    Ledger(String),
}
