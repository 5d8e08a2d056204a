//! Retrodict Gatekeeper
//!
//! Admission gate enforcing the anti-fabrication policy.
//!
//! The Gatekeeper provides:
//! - Minimum evidence-strength checks
//! - The triangulation rule for cross-layer and cross-era claims
//! - Duplicate merging and contradiction resolution
//! - Confidence banding
//!
//! Nothing it declines is dropped: every rejection becomes a void record
//! and every decision an audit event.
//!
//! # Examples
//!
//! ```
//! use retrodict_evidence::EvidenceGraphBuilder;
//! use retrodict_gatekeeper::{ClaimLedger, Gatekeeper, ValidationConfig};
//! use std::collections::BTreeMap;
//!
//! let pool = BTreeMap::new();
//! let graph = EvidenceGraphBuilder::default().build(&pool, vec![]);
//! let mut ledger = ClaimLedger::new();
//! let report = Gatekeeper::new(ValidationConfig::default()).admit(&graph, &mut ledger);
//! assert!(report.outcomes.is_empty());
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod ledger;
mod validator;

pub use config::ValidationConfig;
pub use error::GatekeeperError;
pub use ledger::ClaimLedger;
pub use validator::{AdmissionReport, CandidateOutcome, Gatekeeper};
