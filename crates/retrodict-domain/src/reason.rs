//! Reason codes, void records and flags
//!
//! Nothing the engine declines is dropped: every rejection becomes a
//! [`VoidRecord`] and every non-fatal finding a [`Flag`], each carrying a
//! machine-readable [`ReasonCode`] and the evidence considered.

use crate::{AssertionKey, ClaimId, NodeRef, SubstrateType, TraceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine-readable outcome taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    /// Evidence strength below the admission threshold
    InsufficientEvidence,
    /// Cross-layer or cross-era significance without independent substrates
    TriangulationViolation,
    /// Incompatible with an admitted claim
    ContradictionDetected,
    /// Edge would close a causal cycle
    TemporalParadox,
    /// Cross-layer edge with incompatible timing
    LayerInconsistency,
    /// Timing could not be settled
    TemporalUnderdetermined,
    /// Another update holds the parent version
    ConcurrentUpdateConflict,
    /// Trace failed schema validation
    MalformedTrace,
}

impl ReasonCode {
    /// Get the code as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::InsufficientEvidence => "INSUFFICIENT_EVIDENCE",
            ReasonCode::TriangulationViolation => "TRIANGULATION_VIOLATION",
            ReasonCode::ContradictionDetected => "CONTRADICTION_DETECTED",
            ReasonCode::TemporalParadox => "TEMPORAL_PARADOX",
            ReasonCode::LayerInconsistency => "LAYER_INCONSISTENCY",
            ReasonCode::TemporalUnderdetermined => "TEMPORAL_UNDERDETERMINED",
            ReasonCode::ConcurrentUpdateConflict => "CONCURRENT_UPDATE_CONFLICT",
            ReasonCode::MalformedTrace => "MALFORMED_TRACE",
        }
    }

    /// Failures reported to the caller with no state change
    pub fn is_hard_failure(&self) -> bool {
        matches!(self, ReasonCode::ConcurrentUpdateConflict | ReasonCode::MalformedTrace)
    }

    /// Findings attached to a retained node or edge
    pub fn is_flag(&self) -> bool {
        matches!(
            self,
            ReasonCode::LayerInconsistency | ReasonCode::TemporalUnderdetermined
        )
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of gap a void leaves in the record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    /// Not enough evidence for a node or attribute
    Evidential,
    /// A causal link could not be established
    Causal,
    /// Timing is unknown
    Temporal,
}

/// One trace's share of a strength computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceContribution {
    /// Trace
    pub trace: TraceId,
    /// Its substrate
    pub substrate: SubstrateType,
    /// Contribution before the redundancy discount
    pub base: f64,
    /// Contribution after the redundancy discount
    pub discounted: f64,
}

/// Evidence considered for a candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSummary {
    /// Per-trace contributions, grouped by substrate
    pub contributions: Vec<TraceContribution>,
    /// Referenced traces absent from the pool
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_traces: Vec<TraceId>,
    /// Distinct substrate types among linked traces
    pub distinct_substrates: usize,
    /// Pooled weight of evidence before the diversity boost
    pub weight_of_evidence: f64,
    /// Diversity multiplier applied to the weight
    pub diversity_multiplier: f64,
    /// Final strength in [0, 1)
    pub strength: f64,
}

impl EvidenceSummary {
    /// Number of linked traces
    pub fn trace_count(&self) -> usize {
        self.contributions.len()
    }

    /// Linked trace ids
    pub fn trace_ids(&self) -> impl Iterator<Item = &TraceId> {
        self.contributions.iter().map(|c| &c.trace)
    }
}

/// Why a void exists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoidReason {
    /// The admission gate or DAG constructor declined it
    Rejected {
        /// Primary reason
        code: ReasonCode,
        /// Every failing reason
        #[serde(default)]
        all: Vec<ReasonCode>,
    },
    /// An admitted claim was replaced by a stronger incompatible one
    Superseded {
        /// Replacing claim
        by: ClaimId,
    },
    /// Hidden by a view's confidence floor
    BelowConfidenceFloor,
}

impl VoidReason {
    /// Rejection with a single reason
    pub fn rejected(code: ReasonCode) -> Self {
        VoidReason::Rejected {
            code,
            all: vec![code],
        }
    }

    /// Primary reason code, if any
    pub fn code(&self) -> Option<ReasonCode> {
        match self {
            VoidReason::Rejected { code, .. } => Some(*code),
            VoidReason::Superseded { .. } => Some(ReasonCode::ContradictionDetected),
            VoidReason::BelowConfidenceFloor => None,
        }
    }
}

/// Explicit marker for a gap in the reconstruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidRecord {
    /// Label of the declined candidate
    pub label: String,
    /// What the candidate asserted
    pub key: AssertionKey,
    /// Why the gap exists
    pub reason: VoidReason,
    /// Kind of gap
    pub gap: GapType,
    /// Evidence considered
    pub evidence: EvidenceSummary,
    /// Claim involved (superseded claims, edge claims)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim: Option<ClaimId>,
    /// Free-form detail
    pub detail: String,
}

impl VoidRecord {
    /// Render the void as a one-line marker, e.g. `[VOID: causal] causal(a -> b): TEMPORAL_PARADOX`
    pub fn render(&self) -> String {
        let gap = match self.gap {
            GapType::Evidential => "evidential",
            GapType::Causal => "causal",
            GapType::Temporal => "temporal",
        };
        let reason = match &self.reason {
            VoidReason::Rejected { all, .. } => all
                .iter()
                .map(ReasonCode::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            VoidReason::Superseded { by } => format!("SUPERSEDED by {}", by),
            VoidReason::BelowConfidenceFloor => "BELOW_CONFIDENCE_FLOOR".to_string(),
        };
        format!("[VOID: {}] {}: {}", gap, self.key, reason)
    }
}

/// What a flag is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlagSubject {
    /// A node
    Node {
        /// Node flagged
        node: NodeRef,
    },
    /// An edge
    Edge {
        /// Cause node
        cause: NodeRef,
        /// Effect node
        effect: NodeRef,
    },
    /// A claim
    Claim {
        /// Claim flagged
        claim: ClaimId,
    },
}

/// Non-fatal finding attached to a retained node, edge or claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flag {
    /// What is flagged
    pub subject: FlagSubject,
    /// Why
    pub reason: ReasonCode,
    /// Free-form detail
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_code_strings() {
        assert_eq!(ReasonCode::TemporalParadox.as_str(), "TEMPORAL_PARADOX");
        let json = serde_json::to_string(&ReasonCode::TriangulationViolation).unwrap();
        assert_eq!(json, r#""TRIANGULATION_VIOLATION""#);
        assert!(ReasonCode::MalformedTrace.is_hard_failure());
        assert!(!ReasonCode::InsufficientEvidence.is_hard_failure());
        assert!(ReasonCode::LayerInconsistency.is_flag());
    }

    #[test]
    fn test_void_render() {
        let void = VoidRecord {
            label: "loop".into(),
            key: AssertionKey::Causal {
                cause: NodeRef::event("y"),
                effect: NodeRef::event("x"),
            },
            reason: VoidReason::rejected(ReasonCode::TemporalParadox),
            gap: GapType::Causal,
            evidence: EvidenceSummary::default(),
            claim: None,
            detail: String::new(),
        };
        assert_eq!(
            void.render(),
            "[VOID: causal] causal(event:y -> event:x): TEMPORAL_PARADOX"
        );
    }
}
