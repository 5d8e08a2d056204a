//! Retrodict Evidence Graph Builder
//!
//! Links traces to candidate claims and scores evidence strength.
//!
//! The builder provides:
//! - Quality- and reliability-weighted contributions per trace
//! - Diminishing returns for redundant substrates
//! - A boost for independent substrates
//!
//! Nothing is rejected here; the admission gate decides.
//!
//! # Examples
//!
//! ```
//! use retrodict_evidence::{EvidenceConfig, EvidenceGraphBuilder};
//! use std::collections::BTreeMap;
//!
//! let pool = BTreeMap::new();
//! let graph = EvidenceGraphBuilder::new(EvidenceConfig::default()).build(&pool, vec![]);
//! assert!(graph.candidates().is_empty());
//! ```

#![warn(missing_docs)]

mod config;
mod graph;
pub mod strength;

pub use config::EvidenceConfig;
pub use graph::{EvidenceGraph, EvidenceGraphBuilder, ScoredCandidate};
