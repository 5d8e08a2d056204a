//! Bipartite evidence graph (traces × candidate claims)

use crate::strength::compute_strength;
use crate::EvidenceConfig;
use rayon::prelude::*;
use retrodict_domain::{ClaimTemplate, EvidenceSummary, Trace, TraceId};
use std::collections::{BTreeMap, BTreeSet};

/// A candidate claim with its linked evidence and strength
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    /// Position in the input order
    pub index: usize,
    /// The candidate
    pub template: ClaimTemplate,
    /// Strength computation over the linked traces
    pub evidence: EvidenceSummary,
}

impl ScoredCandidate {
    /// Linked trace ids present in the pool
    pub fn linked_traces(&self) -> BTreeSet<TraceId> {
        self.evidence.trace_ids().cloned().collect()
    }
}

/// Traces × candidates with strength scores
///
/// Borrows the trace pool; no rejection happens here.
#[derive(Debug)]
pub struct EvidenceGraph<'a> {
    pool: &'a BTreeMap<TraceId, Trace>,
    config: EvidenceConfig,
    candidates: Vec<ScoredCandidate>,
}

impl<'a> EvidenceGraph<'a> {
    /// Candidates in input order
    pub fn candidates(&self) -> &[ScoredCandidate] {
        &self.candidates
    }

    /// Trace pool the graph was built over
    pub fn pool(&self) -> &'a BTreeMap<TraceId, Trace> {
        self.pool
    }

    /// Look up a trace
    pub fn trace(&self, id: &TraceId) -> Option<&'a Trace> {
        self.pool.get(id)
    }

    /// Indices of candidates linked to a trace
    pub fn candidates_for_trace(&self, id: &TraceId) -> Vec<usize> {
        self.candidates
            .iter()
            .filter(|c| c.evidence.trace_ids().any(|t| t == id))
            .map(|c| c.index)
            .collect()
    }

    /// Score an arbitrary set of trace ids against the same pool and config
    ///
    /// Used when merging compatible claims over the union of their traces.
    pub fn score<'t, I>(&self, traces: I) -> EvidenceSummary
    where
        I: IntoIterator<Item = &'t TraceId>,
    {
        score_against(self.pool, traces, &self.config)
    }

    /// Number of trace → candidate links
    pub fn link_count(&self) -> usize {
        self.candidates.iter().map(|c| c.evidence.trace_count()).sum()
    }
}

/// Builds [`EvidenceGraph`]s
#[derive(Debug, Clone, Default)]
pub struct EvidenceGraphBuilder {
    config: EvidenceConfig,
}

impl EvidenceGraphBuilder {
    /// Create a builder with the given configuration
    pub fn new(config: EvidenceConfig) -> Self {
        Self { config }
    }

    /// Link every candidate to its traces and score it
    ///
    /// Pure function of its inputs. Candidates are scored in parallel and
    /// returned in input order.
    pub fn build<'a>(
        &self,
        pool: &'a BTreeMap<TraceId, Trace>,
        templates: Vec<ClaimTemplate>,
    ) -> EvidenceGraph<'a> {
        let candidates: Vec<ScoredCandidate> = templates
            .into_par_iter()
            .enumerate()
            .map(|(index, template)| {
                let evidence = score_against(pool, &template.supporting_traces, &self.config);
                ScoredCandidate {
                    index,
                    template,
                    evidence,
                }
            })
            .collect();

        tracing::debug!(
            "Evidence graph: {} candidates over {} traces",
            candidates.len(),
            pool.len()
        );

        EvidenceGraph {
            pool,
            config: self.config.clone(),
            candidates,
        }
    }
}

fn score_against<'t, I>(
    pool: &BTreeMap<TraceId, Trace>,
    traces: I,
    config: &EvidenceConfig,
) -> EvidenceSummary
where
    I: IntoIterator<Item = &'t TraceId>,
{
    // Duplicate references count once
    let ids: BTreeSet<&TraceId> = traces.into_iter().collect();
    let mut linked = Vec::with_capacity(ids.len());
    let mut missing = Vec::new();
    for id in ids {
        match pool.get(id) {
            Some(trace) => linked.push(trace),
            None => missing.push(id.clone()),
        }
    }
    compute_strength(&linked, missing, config)
}
