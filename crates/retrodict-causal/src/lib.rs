//! Retrodict Causal DAG Constructor
//!
//! Assembles admitted claims into a directed acyclic graph of entities and
//! events with weighted causal edges.
//!
//! The constructor provides:
//! - An acyclicity check before every edge insertion
//! - A cross-layer timing check that flags, but keeps, suspect edges
//! - Deterministic topological order, ancestry queries and components
//!
//! # Examples
//!
//! ```
//! use retrodict_causal::{CausalGraph, DagConstructor};
//! use std::collections::BTreeMap;
//!
//! let mut graph = CausalGraph::new();
//! let report = DagConstructor::default().apply_claims(
//!     &mut graph,
//!     std::iter::empty::<&retrodict_domain::Claim>(),
//!     &BTreeMap::new(),
//! );
//! assert!(report.inserted.is_empty());
//! assert!(graph.topological_order().is_empty());
//! ```

#![warn(missing_docs)]

mod config;
mod constructor;
mod error;
mod graph;

pub use config::DagConfig;
pub use constructor::{DagConstructor, DagReport};
pub use error::DagError;
pub use graph::{CausalGraph, GraphNode};
