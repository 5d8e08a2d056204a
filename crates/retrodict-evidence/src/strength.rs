//! Evidence strength computation
//!
//! Implements weight-of-evidence pooling over the traces linked to one
//! candidate claim:
//! 1. Per-trace contribution from quality and substrate reliability
//! 2. Redundancy discount within a substrate
//! 3. Additive pooling as `W = Σ -ln(1 - c)`
//! 4. Diversity boost for independent substrates
//! 5. Squash back to `1 - e^-W`

use crate::EvidenceConfig;
use retrodict_domain::{EvidenceSummary, SubstrateType, Trace, TraceContribution, TraceId};
use std::collections::BTreeMap;

/// Upper bound on a single discounted contribution, keeps `ln(1 - c)` finite
const MAX_CONTRIBUTION: f64 = 1.0 - 1e-9;

/// Score a set of linked traces
///
/// `missing` lists referenced trace ids absent from the pool; they are
/// reported but contribute nothing.
pub fn compute_strength(
    linked: &[&Trace],
    missing: Vec<TraceId>,
    config: &EvidenceConfig,
) -> EvidenceSummary {
    // Step 1 + 2: contributions, discounted within each substrate
    let contributions = discounted_contributions(linked, config);

    // Step 3: pooled weight of evidence
    let weight_of_evidence: f64 = contributions
        .iter()
        .map(|c| -(1.0 - c.discounted.min(MAX_CONTRIBUTION)).ln())
        .sum();

    // Step 4: diversity boost
    let distinct_substrates = distinct_substrates(&contributions);
    let diversity_multiplier =
        1.0 + config.diversity_boost * distinct_substrates.saturating_sub(1) as f64;

    // Step 5: squash to [0, 1)
    let strength = (1.0 - (-weight_of_evidence * diversity_multiplier).exp()).clamp(0.0, 1.0);

    EvidenceSummary {
        contributions,
        missing_traces: missing,
        distinct_substrates,
        weight_of_evidence,
        diversity_multiplier,
        strength,
    }
}

/// Base contribution of one trace
pub fn base_contribution(trace: &Trace, config: &EvidenceConfig) -> f64 {
    (config.per_trace_weight * trace.quality_score * trace.substrate_type.reliability())
        .clamp(0.0, MAX_CONTRIBUTION)
}

fn discounted_contributions(linked: &[&Trace], config: &EvidenceConfig) -> Vec<TraceContribution> {
    let mut by_substrate: BTreeMap<SubstrateType, Vec<(f64, &TraceId)>> = BTreeMap::new();
    for trace in linked {
        by_substrate
            .entry(trace.substrate_type)
            .or_default()
            .push((base_contribution(trace, config), &trace.id));
    }

    let mut out = Vec::with_capacity(linked.len());
    for (substrate, mut traces) in by_substrate {
        // Strongest first; ties broken by id for determinism
        traces.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        let mut factor = 1.0;
        for (base, id) in traces {
            out.push(TraceContribution {
                trace: id.clone(),
                substrate,
                base,
                discounted: base * factor,
            });
            factor *= config.redundancy_decay;
        }
    }
    out
}

fn distinct_substrates(contributions: &[TraceContribution]) -> usize {
    let mut seen: Vec<SubstrateType> = contributions.iter().map(|c| c.substrate).collect();
    seen.dedup();
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrodict_domain::{ProvenanceEntry, TimeEstimate};

    fn trace(id: &str, substrate: SubstrateType, quality: f64) -> Trace {
        Trace::new(
            id,
            substrate,
            ProvenanceEntry::new(format!("lab:{}", id), 0, "laboratory"),
            TimeEstimate::interval(-1200.0, -1150.0),
            quality,
        )
    }

    #[test]
    fn test_three_substrate_collapse_claim_is_moderate() {
        let traces = [
            trace("destruction-layer", SubstrateType::Physical, 0.8),
            trace("pollen-drought", SubstrateType::Planetary, 0.7),
            trace("linear-b", SubstrateType::Cultural, 0.6),
        ];
        let linked: Vec<&Trace> = traces.iter().collect();
        let summary = compute_strength(&linked, vec![], &EvidenceConfig::default());

        assert_eq!(summary.distinct_substrates, 3);
        assert!((summary.diversity_multiplier - 1.2).abs() < 1e-12);
        // 1 - exp(-1.2 * (−ln 0.6 − ln 0.65 − ln 0.745))
        assert!((summary.strength - 0.773).abs() < 0.005, "{}", summary.strength);
    }

    #[test]
    fn test_single_trace_strength_equals_contribution() {
        let t = trace("t", SubstrateType::Physical, 0.64);
        let summary = compute_strength(&[&t], vec![], &EvidenceConfig::default());
        assert!((summary.strength - 0.32).abs() < 1e-9);
    }

    #[test]
    fn test_redundant_substrate_is_discounted() {
        let a = trace("a", SubstrateType::Cultural, 0.9);
        let b = trace("b", SubstrateType::Cultural, 0.9);
        let c = trace("c", SubstrateType::Physical, 0.9);
        let config = EvidenceConfig::default();

        let same = compute_strength(&[&a, &b], vec![], &config);
        let diverse = compute_strength(&[&a, &c], vec![], &config);

        assert_eq!(same.contributions[1].discounted, same.contributions[1].base * 0.5);
        assert!(diverse.strength > same.strength);
    }

    #[test]
    fn test_empty_and_missing() {
        let summary = compute_strength(&[], vec![TraceId::new("ghost")], &EvidenceConfig::default());
        assert_eq!(summary.strength, 0.0);
        assert_eq!(summary.trace_count(), 0);
        assert_eq!(summary.missing_traces, vec![TraceId::new("ghost")]);
    }
}
