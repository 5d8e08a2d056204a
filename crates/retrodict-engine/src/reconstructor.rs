//! Pipeline orchestration
//!
//! Evidence graph → admission gate → priors → causal DAG → temporal solve →
//! confidence propagation. A full run starts from an empty ledger; an
//! incremental run starts from a parent model and recomputes only the
//! subgraph whose evidence changed, plus its causal descendants.

use crate::{ingest, EngineConfig, EngineError};
use retrodict_causal::{CausalGraph, DagConstructor};
use retrodict_domain::{
    AdmissionDecision, Assertion, AssertionKey, AttributeValue, AuditTrail, Claim, ClaimStatus,
    ClaimTemplate, ConfidenceLevel, ConfidenceRevision, Entity, EntityId, Event, EventId,
    EvidenceSummary, Flag, FlagSubject, GapType, ModelContent, NodeRef, ReasonCode, Trace,
    TraceId, VoidReason, VoidRecord,
};
use retrodict_evidence::EvidenceGraphBuilder;
use retrodict_gatekeeper::{ClaimLedger, Gatekeeper};
use retrodict_temporal::{build_priors, CancelFlag, PriorSet, SolveInput, TemporalSolver};
use retrodict_uncertainty::UncertaintyPropagator;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// New evidence to fold into a model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateBatch {
    /// Traces to add
    #[serde(default)]
    pub traces: Vec<Trace>,
    /// Candidate claims to offer
    #[serde(default)]
    pub templates: Vec<ClaimTemplate>,
    /// Traces to withdraw (forces a full re-derivation)
    #[serde(default)]
    pub retract: BTreeSet<TraceId>,
}

impl UpdateBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Add traces
    pub fn with_traces<I: IntoIterator<Item = Trace>>(mut self, traces: I) -> Self {
        self.traces.extend(traces);
        self
    }

    /// Add candidate claims
    pub fn with_templates<I: IntoIterator<Item = ClaimTemplate>>(mut self, templates: I) -> Self {
        self.templates.extend(templates);
        self
    }

    /// Withdraw traces
    pub fn retracting<I, T>(mut self, traces: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TraceId>,
    {
        self.retract.extend(traces.into_iter().map(Into::into));
        self
    }

    /// Whether the batch carries nothing
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty() && self.templates.is_empty() && self.retract.is_empty()
    }
}

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivationStats {
    /// Candidates admitted or merged
    pub admitted: usize,
    /// Candidates rejected
    pub rejected: usize,
    /// Claims superseded
    pub superseded: usize,
    /// Edges committed or extended
    pub edges_committed: usize,
    /// Events re-solved by the temporal solver
    pub solved_events: usize,
    /// Nodes whose confidence was recomputed
    pub recomputed_nodes: usize,
    /// Whether the run ignored the parent's derived state
    pub full_recompute: bool,
}

impl DerivationStats {
    /// Get a summary string
    pub fn summary(&self) -> String {
        format!(
            "{} admitted, {} rejected, {} superseded, {} edges, {} events solved, {} nodes recomputed{}",
            self.admitted,
            self.rejected,
            self.superseded,
            self.edges_committed,
            self.solved_events,
            self.recomputed_nodes,
            if self.full_recompute { " (full)" } else { "" }
        )
    }
}

/// Result of a reconstruction or update
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    /// Model content
    pub content: ModelContent,
    /// VERIFIED claims whose confidence changed relative to the parent
    pub revisions: Vec<ConfidenceRevision>,
    /// Run counters
    pub stats: DerivationStats,
}

struct RunInput<'a> {
    pool: BTreeMap<TraceId, Trace>,
    templates: Vec<ClaimTemplate>,
    offered: Vec<ClaimTemplate>,
    ledger: ClaimLedger,
    base: Option<&'a ModelContent>,
}

/// Runs the reconstruction pipeline
pub struct Reconstructor {
    config: EngineConfig,
    builder: EvidenceGraphBuilder,
    gatekeeper: Gatekeeper,
    dag: DagConstructor,
    solver: TemporalSolver,
    propagator: UncertaintyPropagator,
    full_recompute_ratio: f64,
}

impl Reconstructor {
    /// Create a reconstructor after validating the configuration
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::Config)?;
        Ok(Self::with_config(config))
    }

    /// Create with the default configuration
    pub fn default_config() -> Self {
        Self::with_config(EngineConfig::default())
    }

    fn with_config(config: EngineConfig) -> Self {
        Self {
            builder: EvidenceGraphBuilder::new(config.evidence.clone()),
            gatekeeper: Gatekeeper::new(config.gatekeeper.clone()),
            dag: DagConstructor::new(config.causal.clone()),
            solver: TemporalSolver::new(config.temporal.clone()),
            propagator: UncertaintyPropagator::new(config.uncertainty.clone()),
            config,
            full_recompute_ratio: 1.0,
        }
    }

    /// Fall back to a full recompute when more than `ratio` of the graph's
    /// nodes are affected by an update (1.0 never falls back, 0.0 always does)
    pub fn with_full_recompute_ratio(mut self, ratio: f64) -> Self {
        self.full_recompute_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reconstruct a model from scratch
    ///
    /// Fails fast on malformed traces before any graph work begins.
    pub fn reconstruct(
        &self,
        traces: Vec<Trace>,
        templates: Vec<ClaimTemplate>,
        cancel: &CancelFlag,
    ) -> Result<Derivation, EngineError> {
        let pool = ingest::trace_pool(traces)?;
        let (content, stats) = self.run(
            RunInput {
                pool,
                offered: templates.clone(),
                templates,
                ledger: ClaimLedger::new(),
                base: None,
            },
            cancel,
        )?;
        Ok(Derivation {
            content,
            revisions: Vec::new(),
            stats,
        })
    }

    /// Fold a batch into a parent model
    ///
    /// An empty batch reproduces the parent's content exactly. Retractions
    /// re-derive the whole model from the remaining evidence; otherwise only
    /// the affected subgraph is recomputed. The parent is never modified.
    pub fn advance(
        &self,
        parent: &ModelContent,
        batch: &UpdateBatch,
        cancel: &CancelFlag,
    ) -> Result<Derivation, EngineError> {
        if batch.is_empty() {
            return Ok(Derivation {
                content: parent.clone(),
                revisions: Vec::new(),
                stats: DerivationStats::default(),
            });
        }
        if !batch.retract.is_empty() {
            return self.rederive(parent, batch, cancel);
        }

        let mut pool = parent.traces.clone();
        let added: BTreeSet<TraceId> = ingest::extend_pool(&mut pool, &batch.traces)?
            .into_iter()
            .collect();

        // Earlier candidates citing newly arrived traces get another hearing
        let mut offered: Vec<ClaimTemplate> = parent
            .templates
            .iter()
            .filter(|t| t.supporting_traces.iter().any(|id| added.contains(id)))
            .cloned()
            .collect();
        offered.extend(batch.templates.iter().cloned());
        let mut templates = parent.templates.clone();
        templates.extend(batch.templates.iter().cloned());

        let ledger = ClaimLedger::from_claims(parent.claims.clone())?;
        let (content, stats) = self.run(
            RunInput {
                pool,
                templates,
                offered,
                ledger,
                base: Some(parent),
            },
            cancel,
        )?;
        let revisions = verified_revisions(parent, &content);
        Ok(Derivation {
            content,
            revisions,
            stats,
        })
    }

    fn rederive(
        &self,
        parent: &ModelContent,
        batch: &UpdateBatch,
        cancel: &CancelFlag,
    ) -> Result<Derivation, EngineError> {
        let mut pool = parent.traces.clone();
        for id in &batch.retract {
            if pool.remove(id).is_none() {
                return Err(EngineError::UnknownTrace(id.clone()));
            }
        }
        ingest::extend_pool(&mut pool, &batch.traces)?;
        let mut templates = parent.templates.clone();
        templates.extend(batch.templates.iter().cloned());

        let (mut content, stats) = self.run(
            RunInput {
                pool,
                offered: templates.clone(),
                templates,
                ledger: ClaimLedger::new(),
                base: None,
            },
            cancel,
        )?;

        // The parent's decisions stay on record ahead of the re-derivation
        let mut audit = parent.audit.clone();
        audit.extend(content.audit.records().iter().map(|r| r.event.clone()));
        content.audit = audit;

        let revisions = verified_revisions(parent, &content);
        Ok(Derivation {
            content,
            revisions,
            stats,
        })
    }

    fn run(
        &self,
        input: RunInput<'_>,
        cancel: &CancelFlag,
    ) -> Result<(ModelContent, DerivationStats), EngineError> {
        let RunInput {
            pool,
            templates,
            offered,
            mut ledger,
            base,
        } = input;
        let base_claims = base.map_or(0, |b| b.claims.len());
        let mut stats = DerivationStats::default();

        // Step 1: Evidence graph and admission
        let report = {
            let graph = self.builder.build(&pool, offered);
            self.gatekeeper.admit(&graph, &mut ledger)
        };
        stats.admitted =
            report.count(AdmissionDecision::Admitted) + report.count(AdmissionDecision::Merged);
        stats.rejected = report.count(AdmissionDecision::Rejected);
        stats.superseded = report.superseded.len();

        // Step 2: Priors, reusing the parent's grid while it still covers
        let priors = build_priors(
            ledger.claims(),
            &pool,
            &self.config.temporal,
            base.and_then(|b| b.grid),
        );

        // Step 3: Causal graph
        let mut graph = base.map(CausalGraph::from_model).unwrap_or_default();
        let pruned = graph.prune_inactive(|id| ledger.get(id).map_or(false, Claim::is_active));
        let dag_report = self.dag.apply_claims(&mut graph, ledger.claims(), &priors.priors);
        stats.edges_committed = dag_report.inserted.len();
        tracing::debug!("DAG: {}", dag_report.summary());

        let (entities, mut events) = materialize(ledger.claims(), &priors);

        // Step 4: Affected subgraph
        let mut dirty: BTreeSet<NodeRef> = dag_report.touched_nodes();
        for edge in &pruned {
            dirty.insert(edge.cause.clone());
            dirty.insert(edge.effect.clone());
        }
        for claim in &ledger.claims()[base_claims.min(ledger.len())..] {
            touch(&mut dirty, claim);
        }
        for id in &report.superseded {
            if let Some(claim) = ledger.get(*id) {
                touch(&mut dirty, claim);
            }
        }
        if let Some(base) = base {
            for (id, event) in &events {
                let before = base.events.get(id).map(|e| &e.prior);
                if before != Some(&event.prior) {
                    dirty.insert(NodeRef::Event(id.clone()));
                }
            }
        }
        let full = match base {
            None => true,
            Some(b) => {
                b.grid != priors.grid
                    || dirty.len() as f64 > self.full_recompute_ratio * graph.node_count() as f64
            }
        };
        stats.full_recompute = full;

        // Step 5: Temporal solve over the affected components
        let input = SolveInput::from_graph(
            &graph,
            priors.priors.clone(),
            if full { None } else { Some(&dirty) },
        );
        let outcome = self.solver.solve(&input, cancel)?;
        stats.solved_events = input.events().len();

        for (id, event) in events.iter_mut() {
            if let Some(posterior) = outcome.posteriors.get(id) {
                event.time_distribution = Some(posterior.clone());
                event.temporally_underdetermined = outcome.underdetermined.contains(id);
            } else if event.prior.is_none() {
                event.temporally_underdetermined = true;
            } else if let Some(previous) = base.and_then(|b| b.events.get(id)) {
                event.time_distribution = previous.time_distribution.clone();
                event.temporally_underdetermined = previous.temporally_underdetermined;
            } else {
                event.time_distribution = event.prior.clone();
            }
            let changed = base.and_then(|b| b.events.get(id)).map_or(true, |previous| {
                previous.time_distribution != event.time_distribution
                    || previous.temporally_underdetermined != event.temporally_underdetermined
            });
            if changed {
                dirty.insert(NodeRef::Event(id.clone()));
            }
        }

        // Step 6: Confidence
        let node_confidence = if full {
            stats.recomputed_nodes = graph.node_count();
            self.propagator.propagate(&graph, ledger.claims(), &events)
        } else {
            let previous = base.map(|b| b.node_confidence.clone()).unwrap_or_default();
            let affected: BTreeSet<NodeRef> = dirty
                .iter()
                .filter(|n| graph.contains(n))
                .flat_map(|n| std::iter::once(n.clone()).chain(graph.descendants(n)))
                .collect();
            stats.recomputed_nodes = affected.len();
            self.propagator
                .propagate_subset(&graph, ledger.claims(), &events, &previous, &dirty)
        };

        // Step 7: Assemble; temporal gaps and flags are rebuilt every run
        let mut voids: Vec<VoidRecord> = base
            .map(|b| b.voids.iter().filter(|v| !is_temporal_gap(v)).cloned().collect())
            .unwrap_or_default();
        voids.extend(report.voids);
        voids.extend(dag_report.voids);
        voids.extend(temporal_voids(&events));

        let mut flags: Vec<Flag> = base
            .map(|b| {
                b.flags
                    .iter()
                    .filter(|f| f.reason != ReasonCode::TemporalUnderdetermined)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        flags.extend(report.flags);
        flags.extend(dag_report.flags);
        flags.extend(temporal_flags(&events));

        let mut audit = base.map(|b| b.audit.clone()).unwrap_or_else(AuditTrail::new);
        audit.extend(report.audit);
        audit.extend(dag_report.audit);
        audit.extend(outcome.audit);

        tracing::info!("Derivation: {}", stats.summary());

        let content = ModelContent {
            traces: pool,
            templates,
            edges: graph.edges().into_iter().cloned().collect(),
            claims: ledger.into_claims(),
            entities,
            events,
            node_confidence,
            voids,
            flags,
            audit,
            grid: priors.grid,
        };
        Ok((content, stats))
    }
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self::default_config()
    }
}

/// Nodes a claim speaks about
fn touch(dirty: &mut BTreeSet<NodeRef>, claim: &Claim) {
    match claim.key() {
        AssertionKey::Causal { cause, effect } => {
            dirty.insert(cause);
            dirty.insert(effect);
        }
        key => {
            dirty.insert(key.subject());
        }
    }
}

/// Entities and events established by active claims
///
/// When incompatible claims tie, the higher-scoring one shapes the node.
fn materialize(
    claims: &[Claim],
    priors: &PriorSet,
) -> (BTreeMap<EntityId, Entity>, BTreeMap<EventId, Event>) {
    let mut entities: BTreeMap<EntityId, (f64, Entity)> = BTreeMap::new();
    let mut events: BTreeMap<EventId, (f64, Event)> = BTreeMap::new();
    let active: Vec<&Claim> = claims.iter().filter(|c| c.is_active()).collect();

    for claim in &active {
        let score = claim.confidence_score;
        match &claim.assertion {
            Assertion::EntityExists { entity, layer, kind } => {
                if entities.get(entity).map_or(true, |(s, _)| score > *s) {
                    entities.insert(
                        entity.clone(),
                        (
                            score,
                            Entity {
                                id: entity.clone(),
                                layer: *layer,
                                kind: kind.clone(),
                                attributes: BTreeMap::new(),
                                claim: claim.id,
                            },
                        ),
                    );
                }
            }
            Assertion::EventOccurred {
                event,
                layer,
                kind,
                participants,
            } => {
                if events.get(event).map_or(true, |(s, _)| score > *s) {
                    events.insert(
                        event.clone(),
                        (
                            score,
                            Event {
                                id: event.clone(),
                                layer: *layer,
                                kind: kind.clone(),
                                participants: participants.clone(),
                                prior: priors.priors.get(event).cloned(),
                                time_distribution: None,
                                temporally_underdetermined: false,
                                claim: claim.id,
                            },
                        ),
                    );
                }
            }
            _ => {}
        }
    }

    for claim in &active {
        if let Assertion::Attribute {
            entity,
            property,
            value,
        } = &claim.assertion
        {
            if let Some((_, target)) = entities.get_mut(entity) {
                let stronger = target
                    .attributes
                    .get(property)
                    .map_or(true, |v| claim.confidence_score > v.confidence);
                if stronger {
                    target.attributes.insert(
                        property.clone(),
                        AttributeValue {
                            value: value.clone(),
                            confidence: claim.confidence_score,
                            claim: claim.id,
                        },
                    );
                }
            }
        }
    }

    (
        entities.into_iter().map(|(id, (_, e))| (id, e)).collect(),
        events.into_iter().map(|(id, (_, e))| (id, e)).collect(),
    )
}

fn is_temporal_gap(void: &VoidRecord) -> bool {
    void.gap == GapType::Temporal
        && void.reason.code() == Some(ReasonCode::TemporalUnderdetermined)
}

/// A temporal gap for every event with no dating evidence
fn temporal_voids(events: &BTreeMap<EventId, Event>) -> Vec<VoidRecord> {
    events
        .values()
        .filter(|e| e.prior.is_none())
        .map(|e| VoidRecord {
            label: format!("timing of {}", e.id),
            key: AssertionKey::Timing { event: e.id.clone() },
            reason: VoidReason::rejected(ReasonCode::TemporalUnderdetermined),
            gap: GapType::Temporal,
            evidence: EvidenceSummary::default(),
            claim: Some(e.claim),
            detail: "no timing claim or dated trace supports this event".to_string(),
        })
        .collect()
}

/// A flag for every dated event the solver could not settle
fn temporal_flags(events: &BTreeMap<EventId, Event>) -> Vec<Flag> {
    events
        .values()
        .filter(|e| e.prior.is_some() && e.temporally_underdetermined)
        .map(|e| Flag {
            subject: FlagSubject::Node {
                node: NodeRef::Event(e.id.clone()),
            },
            reason: ReasonCode::TemporalUnderdetermined,
            detail: "ordering constraints did not converge; last distribution kept".to_string(),
        })
        .collect()
}

/// VERIFIED claims of `parent` whose confidence differs in `next`
///
/// A claim superseded in `next` reports its replacement. When `next` was
/// re-derived (claim ids differ), claims are matched by assertion key; a
/// VERIFIED claim with no active counterpart is reported as withdrawn
/// (SPECULATIVE, score 0).
pub fn verified_revisions(parent: &ModelContent, next: &ModelContent) -> Vec<ConfidenceRevision> {
    let mut revisions = Vec::new();
    for before in parent
        .active_claims()
        .filter(|c| c.confidence_level == ConfidenceLevel::Verified)
    {
        let after = match next.claim(before.id) {
            Some(same) => match same.status {
                ClaimStatus::Active => Some(same),
                ClaimStatus::Superseded { by } => next.claim(by),
            },
            None => next
                .active_claims()
                .filter(|c| c.key() == before.key())
                .max_by(|a, b| a.confidence_score.total_cmp(&b.confidence_score)),
        };
        let revision = match after {
            Some(after)
                if after.confidence_level == before.confidence_level
                    && after.confidence_score == before.confidence_score
                    && after.assertion == before.assertion =>
            {
                None
            }
            Some(after) => Some(ConfidenceRevision {
                claim: before.id,
                replaced_by: (after.id != before.id).then_some(after.id),
                prior_level: before.confidence_level,
                prior_score: before.confidence_score,
                new_level: after.confidence_level,
                new_score: after.confidence_score,
            }),
            None => Some(ConfidenceRevision {
                claim: before.id,
                replaced_by: None,
                prior_level: before.confidence_level,
                prior_score: before.confidence_score,
                new_level: ConfidenceLevel::Speculative,
                new_score: 0.0,
            }),
        };
        revisions.extend(revision);
    }
    if !revisions.is_empty() {
        tracing::info!("{} VERIFIED claim(s) revised", revisions.len());
    }
    revisions
}
