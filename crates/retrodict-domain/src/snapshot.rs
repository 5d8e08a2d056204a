//! World-model snapshots
//!
//! A snapshot is immutable once constructed: all fields are private and only
//! readable through accessors. Updates build a new [`ModelContent`] and wrap
//! it in a new snapshot that points back to its parent.

use crate::{
    AuditTrail, CausalEdge, Claim, ClaimId, ClaimTemplate, ConfidenceLevel, Entity, EntityId,
    Event, EventId, Flag, NodeConfidence, NodeRef, TimeGrid, Trace, TraceId, VersionId, VoidRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// How a snapshot relates to its parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotKind {
    /// First reconstruction, no parent
    Initial,
    /// Ordinary update that changed no VERIFIED claim
    Update,
    /// Update that changed at least one VERIFIED claim
    Revision,
    /// Branch exploring an intervention
    Counterfactual {
        /// Intervention label
        label: String,
    },
}

/// Explicit record of a VERIFIED claim's confidence changing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceRevision {
    /// Claim as it was
    pub claim: ClaimId,
    /// Claim that replaced it, when superseded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaced_by: Option<ClaimId>,
    /// Level before
    pub prior_level: ConfidenceLevel,
    /// Score before
    pub prior_score: f64,
    /// Level after
    pub new_level: ConfidenceLevel,
    /// Score after
    pub new_score: f64,
}

/// Everything a reconstruction produced
///
/// Two contents compare equal when they describe the same model; version
/// metadata lives on [`WorldModelSnapshot`] only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelContent {
    /// Trace pool
    pub traces: BTreeMap<TraceId, Trace>,
    /// Every candidate ever offered, in arrival order
    pub templates: Vec<ClaimTemplate>,
    /// Claim ledger (all versions, including superseded ones), in admission order
    pub claims: Vec<Claim>,
    /// Reconstructed entities
    pub entities: BTreeMap<EntityId, Entity>,
    /// Reconstructed events
    pub events: BTreeMap<EventId, Event>,
    /// Causal edges, ordered by (cause, effect)
    pub edges: Vec<CausalEdge>,
    /// Per-node confidence
    pub node_confidence: BTreeMap<NodeRef, NodeConfidence>,
    /// Gaps
    pub voids: Vec<VoidRecord>,
    /// Non-fatal findings
    pub flags: Vec<Flag>,
    /// Admission and graph audit log
    pub audit: AuditTrail,
    /// Timeline grid the event distributions live on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid: Option<TimeGrid>,
}

impl ModelContent {
    /// Claim by id
    pub fn claim(&self, id: ClaimId) -> Option<&Claim> {
        self.claims.iter().find(|c| c.id == id)
    }

    /// Claims in force
    pub fn active_claims(&self) -> impl Iterator<Item = &Claim> {
        self.claims.iter().filter(|c| c.is_active())
    }

    /// Edge between two nodes
    pub fn edge(&self, cause: &NodeRef, effect: &NodeRef) -> Option<&CausalEdge> {
        self.edges.iter().find(|e| &e.cause == cause && &e.effect == effect)
    }
}

/// Immutable, versioned world-model state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldModelSnapshot {
    version: VersionId,
    parent: Option<VersionId>,
    kind: SnapshotKind,
    generated_at: u64,
    revisions: Vec<ConfidenceRevision>,
    content: ModelContent,
}

impl WorldModelSnapshot {
    /// Create a snapshot with a fresh version id
    pub fn new(
        parent: Option<VersionId>,
        kind: SnapshotKind,
        revisions: Vec<ConfidenceRevision>,
        content: ModelContent,
    ) -> Self {
        let generated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            version: VersionId::new(),
            parent,
            kind,
            generated_at,
            revisions,
            content,
        }
    }

    /// Stable version identifier
    pub fn version(&self) -> VersionId {
        self.version
    }

    /// Parent version, if any
    pub fn parent(&self) -> Option<VersionId> {
        self.parent
    }

    /// Relation to the parent
    pub fn kind(&self) -> &SnapshotKind {
        &self.kind
    }

    /// Creation time (ms since Unix epoch)
    pub fn generated_at(&self) -> u64 {
        self.generated_at
    }

    /// VERIFIED claims whose confidence changed relative to the parent
    pub fn revisions(&self) -> &[ConfidenceRevision] {
        &self.revisions
    }

    /// Whether this snapshot revises a VERIFIED claim
    pub fn is_revision(&self) -> bool {
        matches!(self.kind, SnapshotKind::Revision)
    }

    /// Model content
    pub fn content(&self) -> &ModelContent {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_snapshots_get_distinct_versions() {
        let a = WorldModelSnapshot::new(None, SnapshotKind::Initial, vec![], ModelContent::default());
        let b = WorldModelSnapshot::new(
            Some(a.version()),
            SnapshotKind::Update,
            vec![],
            a.content().clone(),
        );
        assert_ne!(a.version(), b.version());
        assert_eq!(b.parent(), Some(a.version()));
        assert_eq!(a.content(), b.content());
        assert!(!b.is_revision());
    }

    #[test]
    fn test_snapshot_json_roundtrip_preserves_version() {
        let snapshot = WorldModelSnapshot::new(
            None,
            SnapshotKind::Counterfactual { label: "no drought".into() },
            vec![],
            ModelContent::default(),
        );
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: WorldModelSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
