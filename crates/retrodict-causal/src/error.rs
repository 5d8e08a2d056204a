//! Error types for DAG construction

use retrodict_domain::NodeRef;
use thiserror::Error;

/// Errors raised by the causal graph
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DagError {
    /// The edge would close a causal cycle; the graph is unchanged
    #[error("Temporal paradox: {cause} -> {effect} would close a causal cycle")]
    TemporalParadox {
        /// Cause of the rejected edge
        cause: NodeRef,
        /// Effect of the rejected edge
        effect: NodeRef,
    },

    /// An edge endpoint is not a node of the graph
    #[error("Unknown node: {0}")]
    UnknownNode(NodeRef),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
