//! Retrodict Uncertainty Propagator
//!
//! Computes per-node confidence by walking the causal DAG in topological
//! order. A node is never more confident than the weakest causal path
//! feeding it, and a SPECULATIVE ancestor never yields a VERIFIED
//! descendant.
//!
//! Uncertainty is split in two:
//! - Epistemic: width of a Beta credible interval over the node's own
//!   evidence, shrinking as traces accumulate
//! - Aleatoric: spread of the event's timing and stochasticity of its
//!   incoming causal links, which no new trace removes

#![warn(missing_docs)]

mod config;
mod propagator;

pub use config::UncertaintyConfig;
pub use propagator::{credible_interval, UncertaintyPropagator};
