//! Confidence propagation over the causal DAG

use crate::UncertaintyConfig;
use retrodict_causal::CausalGraph;
use retrodict_domain::{
    Claim, ClaimId, ConfidenceInterval, ConfidenceLevel, Event, EventId, NodeConfidence, NodeRef,
    ReasonCode, TraceId,
};
use statrs::distribution::{Beta, ContinuousCDF};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Credible interval of Beta(alpha, beta) holding `level` of the mass
///
/// Falls back to `(0, 1)` for parameters statrs rejects.
pub fn credible_interval(alpha: f64, beta: f64, level: f64) -> (f64, f64) {
    if alpha <= 0.0 || beta <= 0.0 || !alpha.is_finite() || !beta.is_finite() {
        return (0.0, 1.0);
    }
    // inverse_cdf is slow to converge for very large parameters
    if alpha > 1e6 || beta > 1e6 {
        let mean = alpha / (alpha + beta);
        return ((mean - 1e-6).max(0.0), (mean + 1e-6).min(1.0));
    }
    let tail = (1.0 - level) / 2.0;
    match Beta::new(alpha, beta) {
        Ok(dist) => {
            let low = dist.inverse_cdf(tail);
            let high = dist.inverse_cdf(1.0 - tail);
            let low = if low.is_finite() { low.clamp(0.0, 1.0) } else { 0.0 };
            let high = if high.is_finite() { high.clamp(0.0, 1.0) } else { 1.0 };
            (low, high)
        }
        Err(_) => (0.0, 1.0),
    }
}

/// What a node's own claims say about it
struct OwnEvidence {
    score: f64,
    level: ConfidenceLevel,
    traces: usize,
}

/// Propagates confidence through the DAG
pub struct UncertaintyPropagator {
    config: UncertaintyConfig,
}

impl UncertaintyPropagator {
    /// Create a new propagator
    pub fn new(config: UncertaintyConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &UncertaintyConfig {
        &self.config
    }

    /// Compute confidence for every node of the graph
    pub fn propagate(
        &self,
        graph: &CausalGraph,
        claims: &[Claim],
        events: &BTreeMap<EventId, Event>,
    ) -> BTreeMap<NodeRef, NodeConfidence> {
        let dirty: BTreeSet<NodeRef> = graph.nodes().cloned().collect();
        self.propagate_subset(graph, claims, events, &BTreeMap::new(), &dirty)
    }

    /// Recompute `dirty` nodes and their descendants, reusing `previous` for
    /// the rest
    ///
    /// Nodes no longer in the graph are dropped from the result.
    pub fn propagate_subset(
        &self,
        graph: &CausalGraph,
        claims: &[Claim],
        events: &BTreeMap<EventId, Event>,
        previous: &BTreeMap<NodeRef, NodeConfidence>,
        dirty: &BTreeSet<NodeRef>,
    ) -> BTreeMap<NodeRef, NodeConfidence> {
        let active: HashMap<ClaimId, &Claim> = claims
            .iter()
            .filter(|c| c.is_active())
            .map(|c| (c.id, c))
            .collect();
        let mut establishing: BTreeMap<NodeRef, Vec<&Claim>> = BTreeMap::new();
        for claim in claims.iter().filter(|c| c.is_active()) {
            if let Some(node) = claim.assertion.established_node() {
                establishing.entry(node).or_default().push(claim);
            }
        }

        let mut affected: BTreeSet<NodeRef> = BTreeSet::new();
        for node in dirty {
            if graph.contains(node) {
                affected.insert(node.clone());
                affected.extend(graph.descendants(node));
            }
        }

        let mut result: BTreeMap<NodeRef, NodeConfidence> = BTreeMap::new();
        for node in graph.topological_order() {
            if !affected.contains(&node) {
                if let Some(kept) = previous.get(&node) {
                    result.insert(node, kept.clone());
                    continue;
                }
            }
            let own = own_evidence(establishing.get(&node).map(Vec::as_slice).unwrap_or(&[]));
            let confidence = self.node_confidence(graph, &node, own, &active, events, &result);
            result.insert(node, confidence);
        }

        tracing::debug!(
            "Propagated confidence for {} of {} nodes",
            affected.len(),
            result.len()
        );
        result
    }

    fn node_confidence(
        &self,
        graph: &CausalGraph,
        node: &NodeRef,
        own: OwnEvidence,
        active: &HashMap<ClaimId, &Claim>,
        events: &BTreeMap<EventId, Event>,
        computed: &BTreeMap<NodeRef, NodeConfidence>,
    ) -> NodeConfidence {
        let incoming = graph.incoming(node);

        // Step 1: Chain cap from parents and the claims behind each edge
        let mut score = own.score;
        let mut level = own.level.min(self.config.bands.classify(own.score));
        let mut limiting_ancestor = None;
        let mut parent_upper = 1.0f64;
        let mut flagged_edge = false;
        for edge in &incoming {
            let (edge_score, edge_level) = edge
                .evidence
                .iter()
                .filter_map(|id| active.get(id))
                .map(|c| (c.confidence_score, c.confidence_level))
                .fold((0.0f64, ConfidenceLevel::Speculative), |acc, (s, l)| {
                    (acc.0.max(s), acc.1.max(l))
                });
            flagged_edge |= edge.has_flag(ReasonCode::LayerInconsistency);
            level = level.min(edge_level);

            let Some(parent) = computed.get(&edge.cause) else {
                continue;
            };
            level = level.min(parent.level);
            parent_upper = parent_upper.min(parent.interval.upper);

            let cap = parent.score.min(edge_score);
            if cap < score {
                score = cap;
                limiting_ancestor = if parent.score <= edge_score {
                    Some(parent.limiting_ancestor.clone().unwrap_or_else(|| edge.cause.clone()))
                } else {
                    Some(edge.cause.clone())
                };
            }
        }

        // Step 2: Label
        let event = node.as_event().and_then(|id| events.get(id));
        let underdetermined = event.map_or(false, |e| e.temporally_underdetermined);
        level = level.min(self.config.bands.classify(score));
        if underdetermined {
            level = level.min(ConfidenceLevel::Speculative);
        }

        // Step 3: Epistemic interval over the node's own evidence
        let n = own.traces as f64;
        let (low, high) = credible_interval(
            1.0 + own.score * n,
            1.0 + (1.0 - own.score) * n,
            self.config.credible_level,
        );
        let epistemic = high - low;
        let interval =
            ConfidenceInterval::clamped(low.min(score), high.min(parent_upper).max(score));

        // Step 4: Aleatoric spread
        let timing_spread = event
            .and_then(|e| e.time_distribution.as_ref().or(e.prior.as_ref()))
            .map_or(0.0, |d| d.normalized_entropy());
        let link_noise = if incoming.is_empty() {
            0.0
        } else {
            incoming.iter().map(|e| 1.0 - e.weight).sum::<f64>() / incoming.len() as f64
        };

        NodeConfidence {
            score,
            level,
            interval,
            epistemic,
            aleatoric: timing_spread.max(link_noise),
            own_score: own.score,
            evidence_count: own.traces,
            limiting_ancestor,
            low_confidence: underdetermined || flagged_edge,
        }
    }
}

impl Default for UncertaintyPropagator {
    fn default() -> Self {
        Self::new(UncertaintyConfig::default())
    }
}

fn own_evidence(claims: &[&Claim]) -> OwnEvidence {
    let strongest = claims
        .iter()
        .max_by(|a, b| a.confidence_score.total_cmp(&b.confidence_score));
    let traces: BTreeSet<&TraceId> = claims.iter().flat_map(|c| c.supporting_traces.iter()).collect();
    OwnEvidence {
        score: strongest.map_or(0.0, |c| c.confidence_score),
        level: strongest.map_or(ConfidenceLevel::Speculative, |c| c.confidence_level),
        traces: traces.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credible_interval_narrows_with_evidence() {
        let (lo_few, hi_few) = credible_interval(1.0 + 0.8 * 2.0, 1.0 + 0.2 * 2.0, 0.95);
        let (lo_many, hi_many) = credible_interval(1.0 + 0.8 * 50.0, 1.0 + 0.2 * 50.0, 0.95);
        assert!(hi_many - lo_many < hi_few - lo_few);
        assert!(lo_many < 0.8 && 0.8 < hi_many);
    }

    #[test]
    fn test_credible_interval_invalid_params() {
        assert_eq!(credible_interval(0.0, 1.0, 0.95), (0.0, 1.0));
        assert_eq!(credible_interval(f64::NAN, 1.0, 0.95), (0.0, 1.0));
    }

    #[test]
    fn test_uniform_prior_interval() {
        let (lo, hi) = credible_interval(1.0, 1.0, 0.95);
        assert!((lo - 0.025).abs() < 1e-4);
        assert!((hi - 0.975).abs() < 1e-4);
    }
}
