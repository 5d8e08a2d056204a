//! Filtered views for the query layer
//!
//! A request narrows a snapshot by layer, time window and a confidence
//! floor. The floor only hides; it never relaxes admission. Everything it
//! hides is reported as a void so the gap stays visible.

use retrodict_domain::{
    AssertionKey, CausalEdge, Claim, ConfidenceLevel, Entity, EntityId, Event, EventId,
    EvidenceSummary, Flag, FlagSubject, GapType, Layer, ModelContent, NodeConfidence, NodeRef,
    VersionId, VoidReason, VoidRecord, WorldModelSnapshot,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What the query layer asks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionRequest {
    /// System being reconstructed (e.g. "Late Bronze Age Aegean")
    pub target_system: String,
    /// Inclusive window in years; events whose plausible range misses it are hidden
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timescale: Option<(f64, f64)>,
    /// Layers in scope; `None` means all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<BTreeSet<Layer>>,
    /// Weakest confidence level exposed
    pub min_confidence: ConfidenceLevel,
}

impl ReconstructionRequest {
    /// Request everything down to SPECULATIVE
    pub fn new(target_system: impl Into<String>) -> Self {
        Self {
            target_system: target_system.into(),
            timescale: None,
            layers: None,
            min_confidence: ConfidenceLevel::Speculative,
        }
    }

    /// Set the confidence floor
    pub fn with_min_confidence(mut self, level: ConfidenceLevel) -> Self {
        self.min_confidence = level;
        self
    }

    /// Restrict to a time window
    pub fn with_timescale(mut self, start: f64, end: f64) -> Self {
        self.timescale = Some((start.min(end), start.max(end)));
        self
    }

    /// Restrict to layers
    pub fn with_layers<I: IntoIterator<Item = Layer>>(mut self, layers: I) -> Self {
        self.layers = Some(layers.into_iter().collect());
        self
    }

    fn layer_in_scope(&self, layer: Layer) -> bool {
        self.layers.as_ref().map_or(true, |l| l.contains(&layer))
    }
}

/// Snapshot narrowed to a request
#[derive(Debug, Clone)]
pub struct SnapshotView<'a> {
    /// Version the view was taken from
    pub version: VersionId,
    /// Active claims at or above the floor, about in-scope nodes
    pub claims: Vec<&'a Claim>,
    /// Visible entities
    pub entities: Vec<&'a Entity>,
    /// Visible events
    pub events: Vec<&'a Event>,
    /// Edges between visible nodes backed by at least one visible claim
    pub edges: Vec<&'a CausalEdge>,
    /// Confidence of visible nodes
    pub node_confidence: BTreeMap<&'a NodeRef, &'a NodeConfidence>,
    /// The model's voids in scope, plus one per item hidden by the floor
    pub voids: Vec<VoidRecord>,
    /// Flags on visible nodes, edges and claims
    pub flags: Vec<&'a Flag>,
}

impl<'a> SnapshotView<'a> {
    /// Narrow a snapshot to a request
    pub fn new(snapshot: &'a WorldModelSnapshot, request: &ReconstructionRequest) -> Self {
        let content = snapshot.content();
        let floor = request.min_confidence;

        // Step 1: Nodes in scope (layer and time window)
        let mut in_scope: BTreeSet<NodeRef> = BTreeSet::new();
        for entity in content.entities.values() {
            if request.layer_in_scope(entity.layer) {
                in_scope.insert(NodeRef::Entity(entity.id.clone()));
            }
        }
        for event in content.events.values() {
            if request.layer_in_scope(event.layer) && in_window(event, request.timescale) {
                in_scope.insert(NodeRef::Event(event.id.clone()));
            }
        }
        let known: BTreeSet<NodeRef> = content
            .entities
            .keys()
            .map(|id| NodeRef::Entity(id.clone()))
            .chain(content.events.keys().map(|id| NodeRef::Event(id.clone())))
            .collect();

        // Step 2: Model voids unless they concern a known node out of scope
        let mut voids: Vec<VoidRecord> = content
            .voids
            .iter()
            .filter(|v| {
                subjects(&v.key)
                    .iter()
                    .all(|n| !known.contains(n) || in_scope.contains(n))
            })
            .cloned()
            .collect();

        // Step 3: Confidence floor on nodes
        let mut visible: BTreeSet<NodeRef> = BTreeSet::new();
        for node in &in_scope {
            let level = node_level(content.node_confidence.get(node), node, content);
            if level >= floor {
                visible.insert(node.clone());
            } else if let Some(claim) = existence_claim(node, content) {
                voids.push(below_floor(claim, level, floor));
            }
        }

        // Step 4: Claims about visible nodes
        let mut claims = Vec::new();
        for claim in content.active_claims() {
            if let Some(node) = claim.assertion.established_node() {
                if visible.contains(&node) {
                    claims.push(claim);
                }
                continue;
            }
            let subjects = subjects(&claim.key());
            if !subjects.iter().all(|n| in_scope.contains(n)) {
                continue;
            }
            if claim.confidence_level < floor {
                voids.push(below_floor(claim, claim.confidence_level, floor));
            } else if subjects.iter().all(|n| visible.contains(n)) {
                claims.push(claim);
            }
        }
        let visible_claims: BTreeSet<_> = claims.iter().map(|c| c.id).collect();

        let edges: Vec<&CausalEdge> = content
            .edges
            .iter()
            .filter(|e| visible.contains(&e.cause) && visible.contains(&e.effect))
            .filter(|e| e.evidence.iter().any(|id| visible_claims.contains(id)))
            .collect();

        let flags: Vec<&Flag> = content
            .flags
            .iter()
            .filter(|f| match &f.subject {
                FlagSubject::Node { node } => visible.contains(node),
                FlagSubject::Edge { cause, effect } => {
                    edges.iter().any(|e| &e.cause == cause && &e.effect == effect)
                }
                FlagSubject::Claim { claim } => visible_claims.contains(claim),
            })
            .collect();

        let view = Self {
            version: snapshot.version(),
            claims,
            entities: content
                .entities
                .values()
                .filter(|e| visible.contains(&NodeRef::Entity(e.id.clone())))
                .collect(),
            events: content
                .events
                .values()
                .filter(|e| visible.contains(&NodeRef::Event(e.id.clone())))
                .collect(),
            edges,
            node_confidence: content
                .node_confidence
                .iter()
                .filter(|(node, _)| visible.contains(*node))
                .collect(),
            voids,
            flags,
        };
        tracing::debug!(
            "View of {} for '{}': {}",
            view.version,
            request.target_system,
            view.summary()
        );
        view
    }

    /// Entity by id, if visible
    pub fn entity(&self, id: &EntityId) -> Option<&'a Entity> {
        self.entities.iter().copied().find(|e| &e.id == id)
    }

    /// Event by id, if visible
    pub fn event(&self, id: &EventId) -> Option<&'a Event> {
        self.events.iter().copied().find(|e| &e.id == id)
    }

    /// One-line void markers
    pub fn render_voids(&self) -> Vec<String> {
        self.voids.iter().map(VoidRecord::render).collect()
    }

    /// Get a summary string
    pub fn summary(&self) -> String {
        format!(
            "{} claims, {} entities, {} events, {} edges, {} voids, {} flags",
            self.claims.len(),
            self.entities.len(),
            self.events.len(),
            self.edges.len(),
            self.voids.len(),
            self.flags.len()
        )
    }
}

/// Nodes a key speaks about
fn subjects(key: &AssertionKey) -> Vec<NodeRef> {
    match key {
        AssertionKey::Causal { cause, effect } => vec![cause.clone(), effect.clone()],
        other => vec![other.subject()],
    }
}

/// Whether an event's plausible range meets the window; undated events always do
fn in_window(event: &Event, window: Option<(f64, f64)>) -> bool {
    let Some((start, end)) = window else {
        return true;
    };
    match event.time_distribution.as_ref().or(event.prior.as_ref()) {
        Some(dist) => dist.quantile(0.05) <= end && dist.quantile(0.95) >= start,
        None => true,
    }
}

fn existence_claim<'c>(
    node: &NodeRef,
    content: &'c ModelContent,
) -> Option<&'c Claim> {
    let id = match node {
        NodeRef::Entity(id) => content.entities.get(id).map(|e| e.claim),
        NodeRef::Event(id) => content.events.get(id).map(|e| e.claim),
    }?;
    content.claim(id)
}

fn node_level(
    confidence: Option<&NodeConfidence>,
    node: &NodeRef,
    content: &ModelContent,
) -> ConfidenceLevel {
    confidence.map(|c| c.level).unwrap_or_else(|| {
        existence_claim(node, content).map_or(ConfidenceLevel::Speculative, |c| c.confidence_level)
    })
}

fn below_floor(claim: &Claim, level: ConfidenceLevel, floor: ConfidenceLevel) -> VoidRecord {
    VoidRecord {
        label: claim.label.clone(),
        key: claim.key(),
        reason: VoidReason::BelowConfidenceFloor,
        gap: match claim.key() {
            AssertionKey::Causal { .. } => GapType::Causal,
            AssertionKey::Timing { .. } => GapType::Temporal,
            _ => GapType::Evidential,
        },
        evidence: EvidenceSummary {
            distinct_substrates: claim.distinct_substrates,
            strength: claim.strength,
            ..EvidenceSummary::default()
        },
        claim: Some(claim.id),
        detail: format!("{} is below the requested {} floor", level, floor),
    }
}
