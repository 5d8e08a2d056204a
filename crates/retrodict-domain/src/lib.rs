//! Retrodict Domain Layer
//!
//! This crate contains the data model shared by every stage of the
//! reconstruction engine. It defines the fundamental concepts, value objects,
//! and trait interfaces that all other crates depend upon.
//!
//! ## Key Concepts
//!
//! - **Trace**: An immutable unit of present-day evidence about the past
//! - **Claim**: An assertion about history, admitted only with sufficient evidence
//! - **Entity / Event**: Reconstructed things and occurrences, placed on a layer
//! - **Causal Edge**: A weighted cause → effect link backed by claims
//! - **Snapshot**: An immutable, versioned world-model state
//! - **Void**: An explicit marker for a gap in evidence
//!
//! ## Architecture
//!
//! - Pure data and small pure functions only
//! - Pipeline stages live in their own crates
//! - Persistence is behind the [`traits::SnapshotStore`] trait

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod claim;
pub mod confidence;
pub mod error;
pub mod ids;
pub mod layer;
pub mod model;
pub mod provenance;
pub mod reason;
pub mod snapshot;
pub mod time;
pub mod trace;
pub mod traits;

// Re-exports for convenience
pub use audit::{AdmissionDecision, AuditEvent, AuditRecord, AuditTrail, TriangulationCheck};
pub use claim::{
    Assertion, AssertionKey, Claim, ClaimStatus, ClaimTemplate, Polarity, RelationKind,
    Significance,
};
pub use confidence::{ConfidenceBands, ConfidenceInterval, ConfidenceLevel};
pub use error::DomainError;
pub use ids::{ClaimId, EntityId, EventId, NodeRef, TraceId, VersionId};
pub use layer::Layer;
pub use model::{AttributeValue, CausalEdge, Entity, Event, NodeConfidence};
pub use provenance::ProvenanceEntry;
pub use reason::{
    EvidenceSummary, Flag, FlagSubject, GapType, ReasonCode, TraceContribution, VoidReason,
    VoidRecord,
};
pub use snapshot::{ConfidenceRevision, ModelContent, SnapshotKind, WorldModelSnapshot};
pub use time::{TimeDistribution, TimeEstimate, TimeGrid, TimeUnit};
pub use traits::SnapshotStore;
pub use trace::{SubstrateType, Trace};
