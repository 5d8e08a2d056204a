//! Causal DAG constructor
//!
//! Turns admitted claims into graph nodes and causal edges. Every edge goes
//! through the acyclicity check before it is committed; cross-layer edges
//! are additionally checked for compatible timing and flagged, not dropped,
//! when the effect appears to precede its cause.

use crate::{CausalGraph, DagConfig, DagError};
use retrodict_domain::{
    Assertion, AuditEvent, CausalEdge, Claim, EventId, EvidenceSummary, Flag,
    FlagSubject, GapType, NodeRef, ReasonCode, TimeDistribution, VoidReason, VoidRecord,
};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of applying a batch of claims to the graph
#[derive(Debug, Clone, Default)]
pub struct DagReport {
    /// Edges committed (or whose evidence changed), as (cause, effect)
    pub inserted: Vec<(NodeRef, NodeRef)>,
    /// Causal claims that produced no edge
    pub voids: Vec<VoidRecord>,
    /// Edges retained with a finding
    pub flags: Vec<Flag>,
    /// Audit entries for rejected and flagged edges
    pub audit: Vec<AuditEvent>,
}

impl DagReport {
    /// Nodes touched by committed edges
    pub fn touched_nodes(&self) -> BTreeSet<NodeRef> {
        self.inserted
            .iter()
            .flat_map(|(c, e)| [c.clone(), e.clone()])
            .collect()
    }

    /// Summary string
    pub fn summary(&self) -> String {
        format!(
            "{} edges committed, {} rejected, {} flagged",
            self.inserted.len(),
            self.voids.len(),
            self.flags.len()
        )
    }
}

/// Builds the causal DAG from admitted claims
pub struct DagConstructor {
    config: DagConfig,
}

impl DagConstructor {
    /// Create a new constructor
    pub fn new(config: DagConfig) -> Self {
        Self { config }
    }

    /// Create a constructor after validating the configuration
    pub fn try_new(config: DagConfig) -> Result<Self, DagError> {
        config.validate().map_err(DagError::Config)?;
        Ok(Self::new(config))
    }

    /// Create with the default configuration
    pub fn default_config() -> Self {
        Self::new(DagConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DagConfig {
        &self.config
    }

    /// Insert a single edge
    ///
    /// Fails with [`DagError::TemporalParadox`] when the edge would create a
    /// path back to its cause; the graph is left unchanged.
    pub fn insert_edge(&self, graph: &mut CausalGraph, edge: CausalEdge) -> Result<(), DagError> {
        let (cause, effect) = (edge.cause.clone(), edge.effect.clone());
        match graph.try_add_edge(edge) {
            Ok(()) => {
                tracing::debug!("Committed edge {} -> {}", cause, effect);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Rejected edge {} -> {}: {}", cause, effect, e);
                Err(e)
            }
        }
    }

    /// Whether a cross-layer edge has incompatible timing
    ///
    /// Returns a description of the violation when the effect's earliest
    /// plausible time precedes the cause's latest plausible time by more
    /// than the configured slack.
    pub fn layer_violation(
        &self,
        cause_time: &TimeDistribution,
        effect_time: &TimeDistribution,
    ) -> Option<String> {
        let cause_latest = cause_time.quantile(self.config.latest_quantile);
        let effect_earliest = effect_time.quantile(self.config.earliest_quantile);
        if effect_earliest + self.config.cross_layer_slack_years < cause_latest {
            Some(format!(
                "effect earliest {:.1} precedes cause latest {:.1} beyond {} years of slack",
                effect_earliest, cause_latest, self.config.cross_layer_slack_years
            ))
        } else {
            None
        }
    }

    /// Apply admitted claims to the graph
    ///
    /// Existence claims create (or re-layer) nodes. Affirming causal claims
    /// become edges in the order given; denying claims never do. Claims
    /// already backing an edge are skipped, so re-applying a ledger is a
    /// no-op. `timing` supplies each event's prior for the cross-layer check.
    pub fn apply_claims<'a, I>(
        &self,
        graph: &mut CausalGraph,
        claims: I,
        timing: &BTreeMap<EventId, TimeDistribution>,
    ) -> DagReport
    where
        I: IntoIterator<Item = &'a Claim>,
    {
        let claims: Vec<&Claim> = claims.into_iter().filter(|c| c.is_active()).collect();
        let mut report = DagReport::default();

        // Step 1: Nodes from existence claims
        for claim in &claims {
            if let (Some(node), Some(layer)) =
                (claim.assertion.established_node(), claim.assertion.layer())
            {
                graph.ensure_node(node, layer);
            }
        }

        // Step 2: Edges from affirming causal claims
        for claim in claims.iter().filter(|c| c.assertion.is_affirmed_causal()) {
            let Assertion::Causal {
                cause,
                effect,
                weight,
                relation,
                ..
            } = &claim.assertion
            else {
                continue;
            };

            if let Some(existing) = graph.edge(cause, effect) {
                if existing.evidence.contains(&claim.id) {
                    continue;
                }
            }

            let (Some(cause_layer), Some(effect_layer)) = (graph.layer(cause), graph.layer(effect))
            else {
                let missing = if graph.contains(cause) { effect } else { cause };
                report.voids.push(self.void(
                    claim,
                    ReasonCode::InsufficientEvidence,
                    format!("no admitted existence claim for {}", missing),
                ));
                continue;
            };

            let mut edge = CausalEdge {
                cause: cause.clone(),
                effect: effect.clone(),
                weight: weight.clamp(0.0, 1.0),
                relation: *relation,
                evidence: BTreeSet::from([claim.id]),
                cross_layer: cause_layer != effect_layer,
                flags: Vec::new(),
            };
            if let Some(existing) = graph.edge(cause, effect) {
                edge.evidence.extend(existing.evidence.iter().copied());
                edge.weight = edge.weight.max(existing.weight);
            }

            // Step 3: Cross-layer timing check
            let violation = if edge.cross_layer {
                self.check_timing(cause, effect, timing)
            } else {
                None
            };
            if violation.is_some() {
                edge.flags.push(ReasonCode::LayerInconsistency);
            }

            // Step 4: Acyclicity check and commit
            match self.insert_edge(graph, edge) {
                Ok(()) => {
                    report.inserted.push((cause.clone(), effect.clone()));
                    if let Some(detail) = violation {
                        tracing::warn!("Layer inconsistency on {} -> {}: {}", cause, effect, detail);
                        report.flags.push(Flag {
                            subject: FlagSubject::Edge {
                                cause: cause.clone(),
                                effect: effect.clone(),
                            },
                            reason: ReasonCode::LayerInconsistency,
                            detail: detail.clone(),
                        });
                        report.audit.push(AuditEvent::Edge {
                            cause: cause.clone(),
                            effect: effect.clone(),
                            claim: claim.id,
                            reason: ReasonCode::LayerInconsistency,
                            retained: true,
                            detail,
                        });
                    }
                }
                Err(e) => {
                    let detail = e.to_string();
                    report.audit.push(AuditEvent::Edge {
                        cause: cause.clone(),
                        effect: effect.clone(),
                        claim: claim.id,
                        reason: ReasonCode::TemporalParadox,
                        retained: false,
                        detail: detail.clone(),
                    });
                    report
                        .voids
                        .push(self.void(claim, ReasonCode::TemporalParadox, detail));
                }
            }
        }

        tracing::info!("DAG construction: {}", report.summary());
        report
    }

    fn check_timing(
        &self,
        cause: &NodeRef,
        effect: &NodeRef,
        timing: &BTreeMap<EventId, TimeDistribution>,
    ) -> Option<String> {
        let cause_time = timing.get(cause.as_event()?)?;
        let effect_time = timing.get(effect.as_event()?)?;
        self.layer_violation(cause_time, effect_time)
    }

    fn void(&self, claim: &Claim, code: ReasonCode, detail: String) -> VoidRecord {
        VoidRecord {
            label: claim.label.clone(),
            key: claim.key(),
            reason: VoidReason::rejected(code),
            gap: GapType::Causal,
            evidence: EvidenceSummary {
                distinct_substrates: claim.distinct_substrates,
                strength: claim.strength,
                ..EvidenceSummary::default()
            },
            claim: Some(claim.id),
            detail,
        }
    }
}

impl Default for DagConstructor {
    fn default() -> Self {
        Self::default_config()
    }
}
