//! Append-only audit log
//!
//! One record per admission decision, rejected or flagged edge, and temporal
//! finding. Records carry the full strength computation and triangulation
//! check so a decision can be re-derived independently.

use crate::{AssertionKey, ClaimId, EventId, EvidenceSummary, NodeRef, ReasonCode};
use serde::{Deserialize, Serialize};

/// Outcome of an admission decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionDecision {
    /// A new claim was admitted
    Admitted,
    /// Merged with a compatible claim into a new version
    Merged,
    /// Compatible with an existing claim and added nothing
    Duplicate,
    /// Recorded, but outranked by a stronger incompatible claim
    Outranked,
    /// Declined; a void was emitted
    Rejected,
}

/// Result of the triangulation rule for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangulationCheck {
    /// Whether the candidate's significance requires triangulation
    pub required: bool,
    /// Linked traces
    pub trace_count: usize,
    /// Distinct substrates among them
    pub distinct_substrates: usize,
    /// Traces required
    pub min_traces: usize,
    /// Substrates required
    pub min_substrates: usize,
}

impl TriangulationCheck {
    /// Whether the evidence meets the thresholds (regardless of `required`)
    pub fn met(&self) -> bool {
        self.trace_count >= self.min_traces && self.distinct_substrates >= self.min_substrates
    }

    /// Whether the candidate passes (not required, or met)
    pub fn passed(&self) -> bool {
        !self.required || self.met()
    }
}

/// One audited occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Admission decision for a candidate claim
    Admission {
        /// Candidate label
        label: String,
        /// Candidate key
        key: AssertionKey,
        /// Outcome
        decision: AdmissionDecision,
        /// Claim created or matched
        #[serde(default, skip_serializing_if = "Option::is_none")]
        claim: Option<ClaimId>,
        /// Strength computation
        evidence: EvidenceSummary,
        /// Triangulation check
        triangulation: TriangulationCheck,
        /// Score after dependency capping
        confidence_score: f64,
        /// Rejection reasons
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        reasons: Vec<ReasonCode>,
        /// Non-fatal flags raised
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        flags: Vec<ReasonCode>,
        /// Claim this decision superseded
        #[serde(default, skip_serializing_if = "Option::is_none")]
        superseded: Option<ClaimId>,
        /// Free-form detail
        #[serde(default, skip_serializing_if = "String::is_empty")]
        detail: String,
    },
    /// Causal edge outcome
    Edge {
        /// Cause node
        cause: NodeRef,
        /// Effect node
        effect: NodeRef,
        /// Backing claim
        claim: ClaimId,
        /// Reason the edge was rejected or flagged
        reason: ReasonCode,
        /// Whether the edge was kept
        retained: bool,
        /// Free-form detail
        detail: String,
    },
    /// Temporal solver finding for one event
    Temporal {
        /// Event
        event: EventId,
        /// Finding
        reason: ReasonCode,
        /// Iterations used by the component solve
        iterations: usize,
        /// Last maximum shift
        residual: f64,
    },
}

/// Sequenced audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Position in the log, starting at 0
    pub sequence: u64,
    /// What happened
    pub event: AuditEvent,
}

/// Append-only sequence of audit records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    records: Vec<AuditRecord>,
}

impl AuditTrail {
    /// Create an empty trail
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and return its sequence number
    pub fn append(&mut self, event: AuditEvent) -> u64 {
        let sequence = self.records.len() as u64;
        self.records.push(AuditRecord { sequence, event });
        sequence
    }

    /// Append every event in order
    pub fn extend<I: IntoIterator<Item = AuditEvent>>(&mut self, events: I) {
        for event in events {
            self.append(event);
        }
    }

    /// All records in order
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Records appended after `sequence` (exclusive)
    pub fn since(&self, sequence: u64) -> &[AuditRecord] {
        let start = (sequence as usize + 1).min(self.records.len());
        &self.records[start..]
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the trail is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temporal(event: &str) -> AuditEvent {
        AuditEvent::Temporal {
            event: EventId::new(event),
            reason: ReasonCode::TemporalUnderdetermined,
            iterations: 200,
            residual: 0.01,
        }
    }

    #[test]
    fn test_sequences_are_dense() {
        let mut trail = AuditTrail::new();
        assert_eq!(trail.append(temporal("a")), 0);
        assert_eq!(trail.append(temporal("b")), 1);
        trail.extend(vec![temporal("c")]);
        assert_eq!(trail.len(), 3);
        assert_eq!(trail.since(0).len(), 2);
        assert!(trail.since(10).is_empty());
    }

    #[test]
    fn test_triangulation_check() {
        let check = TriangulationCheck {
            required: true,
            trace_count: 1,
            distinct_substrates: 1,
            min_traces: 3,
            min_substrates: 2,
        };
        assert!(!check.passed());
        let local = TriangulationCheck {
            required: false,
            ..check
        };
        assert!(local.passed());
        assert!(!local.met());
    }
}
