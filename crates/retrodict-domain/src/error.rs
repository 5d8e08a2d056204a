//! Domain error types

use thiserror::Error;

/// Errors raised while validating domain values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// A trace is missing a required field or carries an out-of-range value
    #[error("Malformed trace '{trace}': {issue}")]
    MalformedTrace {
        /// Offending trace id (may be empty when the id itself is missing)
        trace: String,
        /// Description of the problem
        issue: String,
    },

    /// A time estimate is not usable
    #[error("Invalid time estimate: {0}")]
    InvalidTime(String),

    /// A confidence value is outside [0, 1] or an interval is inverted
    #[error("Invalid confidence: {0}")]
    InvalidConfidence(String),
}
