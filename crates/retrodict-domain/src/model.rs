//! Reconstructed entities, events, edges and per-node confidence

use crate::{
    ClaimId, ConfidenceInterval, ConfidenceLevel, EntityId, EventId, Layer, NodeRef, ReasonCode,
    RelationKind, TimeDistribution,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One attribute value with the confidence of the claim asserting it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValue {
    /// Asserted value
    pub value: serde_json::Value,
    /// Confidence score of the backing claim
    pub confidence: f64,
    /// Backing claim
    pub claim: ClaimId,
}

/// A reconstructed thing (person, institution, artifact, species, system)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Identifier
    pub id: EntityId,
    /// Stratum
    pub layer: Layer,
    /// Category
    pub kind: String,
    /// Property → value
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
    /// Existence claim that established the entity
    pub claim: ClaimId,
}

/// A reconstructed occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Identifier
    pub id: EventId,
    /// Stratum
    pub layer: Layer,
    /// Category
    pub kind: String,
    /// Entities taking part
    #[serde(default)]
    pub participants: BTreeSet<EntityId>,
    /// Prior from timing claims or trace dating
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior: Option<TimeDistribution>,
    /// Posterior after ordering constraints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_distribution: Option<TimeDistribution>,
    /// The solver could not settle this event's timing
    #[serde(default)]
    pub temporally_underdetermined: bool,
    /// Existence claim that established the event
    pub claim: ClaimId,
}

/// Directed causal relation between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalEdge {
    /// Cause node
    pub cause: NodeRef,
    /// Effect node
    pub effect: NodeRef,
    /// Causal strength in [0, 1]
    pub weight: f64,
    /// Kind of relation
    pub relation: RelationKind,
    /// Claims backing the edge
    pub evidence: BTreeSet<ClaimId>,
    /// Endpoints lie on different layers
    pub cross_layer: bool,
    /// Non-fatal findings attached to the edge
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<ReasonCode>,
}

impl CausalEdge {
    /// Whether the edge carries a given flag
    pub fn has_flag(&self, reason: ReasonCode) -> bool {
        self.flags.contains(&reason)
    }
}

/// Aggregate confidence computed for a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfidence {
    /// Final score, capped by every causal ancestor
    pub score: f64,
    /// Categorical label
    pub level: ConfidenceLevel,
    /// Credible interval for the score
    pub interval: ConfidenceInterval,
    /// Reducible uncertainty (interval width from evidence volume)
    pub epistemic: f64,
    /// Irreducible uncertainty (timing spread, causal stochasticity)
    pub aleatoric: f64,
    /// Score from the node's own claims before ancestor capping
    pub own_score: f64,
    /// Distinct traces backing the node's own claims
    pub evidence_count: usize,
    /// Ancestor that bounded the score, when the cap bit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limiting_ancestor: Option<NodeRef>,
    /// Flagged as low confidence (e.g. temporally underdetermined)
    #[serde(default)]
    pub low_confidence: bool,
}
