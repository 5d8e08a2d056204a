//! Retrodict Temporal Solver
//!
//! Assigns probability distributions over event timing.
//!
//! The solver provides:
//! - Priors from timing claims, falling back to trace dating
//! - Belief propagation of cause-before-effect constraints
//! - Parallel, deterministic solves over disjoint components
//! - Cooperative cancellation via [`CancelFlag`]
//!
//! Exceeding the iteration cap is not an error: the last distributions are
//! kept and the events reported as underdetermined.
//!
//! # Examples
//!
//! ```
//! use retrodict_temporal::{CancelFlag, SolveInput, TemporalSolver};
//!
//! let outcome = TemporalSolver::default()
//!     .solve(&SolveInput::default(), &CancelFlag::new())
//!     .unwrap();
//! assert!(outcome.posteriors.is_empty());
//! ```

#![warn(missing_docs)]

mod cancel;
mod config;
mod error;
mod prior;
mod solver;

pub use cancel::CancelFlag;
pub use config::TemporalConfig;
pub use error::TemporalError;
pub use prior::{build_priors, PriorSet};
pub use solver::{ComponentReport, OrderingConstraint, SolveInput, SolveOutcome, TemporalSolver};
