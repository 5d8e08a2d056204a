//! Error types for the temporal solver

use thiserror::Error;

/// Errors raised by the temporal solver
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemporalError {
    /// The caller cancelled the solve; no result was produced
    #[error("Temporal solve cancelled after {iterations} iterations")]
    Cancelled {
        /// Iterations completed by the component that observed the signal
        iterations: usize,
    },

    /// Priors do not share one grid
    #[error("Grid mismatch: {0}")]
    GridMismatch(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
