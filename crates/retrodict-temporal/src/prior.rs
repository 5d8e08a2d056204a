//! Event priors from timing claims and trace dating

use crate::TemporalConfig;
use retrodict_domain::{
    Assertion, Claim, EventId, TimeDistribution, TimeEstimate, TimeGrid, Trace, TraceId,
};
use std::collections::{BTreeMap, BTreeSet};

/// Priors for every established event, on one shared grid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorSet {
    /// Grid shared by every prior
    pub grid: Option<TimeGrid>,
    /// Prior per dated event
    pub priors: BTreeMap<EventId, TimeDistribution>,
    /// Established events with no temporal evidence
    pub undated: Vec<EventId>,
}

/// Build priors for the events established by active claims
///
/// An event's prior is the normalised product of its active timing claims'
/// estimates; with no timing claim, the product of the observation
/// estimates of the traces supporting its existence. Disjoint estimates fall
/// back to their mixture. `reuse` keeps an existing grid when it still
/// covers every estimate.
pub fn build_priors<'a, I>(
    claims: I,
    traces: &BTreeMap<TraceId, Trace>,
    config: &TemporalConfig,
    reuse: Option<TimeGrid>,
) -> PriorSet
where
    I: IntoIterator<Item = &'a Claim>,
{
    let mut established: BTreeMap<EventId, BTreeSet<TraceId>> = BTreeMap::new();
    let mut timing: BTreeMap<EventId, Vec<TimeEstimate>> = BTreeMap::new();

    for claim in claims.into_iter().filter(|c| c.is_active()) {
        match &claim.assertion {
            Assertion::EventOccurred { event, .. } => {
                established
                    .entry(event.clone())
                    .or_default()
                    .extend(claim.supporting_traces.iter().cloned());
            }
            Assertion::Timing { event, estimate } => {
                timing.entry(event.clone()).or_default().push(*estimate);
            }
            _ => {}
        }
    }

    // Step 1: Estimates per event
    let estimates: BTreeMap<EventId, Vec<TimeEstimate>> = established
        .iter()
        .map(|(event, supporting)| {
            let dated = match timing.get(event) {
                Some(claimed) if !claimed.is_empty() => claimed.clone(),
                _ => supporting
                    .iter()
                    .filter_map(|id| traces.get(id))
                    .map(|t| t.observed_at_uncertainty)
                    .collect(),
            };
            (event.clone(), dated)
        })
        .collect();

    // Step 2: Shared grid
    let all = estimates.values().flatten();
    let grid = match reuse {
        Some(grid) if grid.bins == config.grid_bins && grid.contains_all(all.clone()) => Some(grid),
        _ => TimeGrid::covering(all, config.grid_bins, config.padding_fraction),
    };

    // Step 3: Priors
    let mut set = PriorSet {
        grid,
        ..PriorSet::default()
    };
    for (event, dated) in estimates {
        match (grid, dated.is_empty()) {
            (Some(grid), false) => {
                let parts: Vec<TimeDistribution> = dated
                    .iter()
                    .map(|e| TimeDistribution::from_estimate(e, grid))
                    .collect();
                if let Some(prior) = combine(&parts) {
                    set.priors.insert(event, prior);
                } else {
                    set.undated.push(event);
                }
            }
            _ => set.undated.push(event),
        }
    }
    set
}

fn combine(parts: &[TimeDistribution]) -> Option<TimeDistribution> {
    let (first, rest) = parts.split_first()?;
    rest.iter()
        .try_fold(first.clone(), |acc, part| acc.product(part))
        .or_else(|| TimeDistribution::mixture(parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrodict_domain::{
        ClaimId, ClaimStatus, ConfidenceLevel, Layer, ProvenanceEntry, Significance, SubstrateType,
    };

    fn claim(assertion: Assertion, traces: &[&str]) -> Claim {
        Claim {
            id: ClaimId::new(),
            label: "test".into(),
            assertion,
            significance: Significance::Local,
            supporting_traces: traces.iter().map(|t| TraceId::new(*t)).collect(),
            distinct_substrates: 1,
            strength: 0.6,
            confidence_score: 0.6,
            confidence_level: ConfidenceLevel::Plausible,
            status: ClaimStatus::Active,
            supersedes: None,
            contested: false,
        }
    }

    fn occurred(event: &str, traces: &[&str]) -> Claim {
        claim(
            Assertion::EventOccurred {
                event: EventId::new(event),
                layer: Layer::L2,
                kind: "fire".into(),
                participants: Default::default(),
            },
            traces,
        )
    }

    fn timing(event: &str, earliest: f64, latest: f64) -> Claim {
        claim(
            Assertion::Timing {
                event: EventId::new(event),
                estimate: TimeEstimate::interval(earliest, latest),
            },
            &["t1"],
        )
    }

    fn pool() -> BTreeMap<TraceId, Trace> {
        [("t1", -1250.0, -1150.0), ("t2", -1220.0, -1180.0)]
            .into_iter()
            .map(|(id, lo, hi)| {
                let trace = Trace::new(
                    id,
                    SubstrateType::Physical,
                    ProvenanceEntry::new("dig", 0, "excavation"),
                    TimeEstimate::interval(lo, hi),
                    0.9,
                );
                (trace.id.clone(), trace)
            })
            .collect()
    }

    #[test]
    fn test_timing_claims_take_precedence_over_trace_dating() {
        let claims = vec![occurred("fire", &["t1"]), timing("fire", -1190.0, -1170.0)];
        let set = build_priors(&claims, &pool(), &TemporalConfig::default(), None);
        let prior = &set.priors[&EventId::new("fire")];
        assert!((prior.mean() - (-1180.0)).abs() < 2.0);
    }

    #[test]
    fn test_trace_dating_product() {
        let claims = vec![occurred("fire", &["t1", "t2"])];
        let set = build_priors(&claims, &pool(), &TemporalConfig::default(), None);
        let prior = &set.priors[&EventId::new("fire")];
        // Product of the two intervals is the narrower one
        assert!(prior.quantile(0.001) >= -1222.0);
        assert!(prior.quantile(0.999) <= -1178.0);
    }

    #[test]
    fn test_disjoint_estimates_fall_back_to_mixture() {
        let claims = vec![
            occurred("fire", &["t1"]),
            timing("fire", -1300.0, -1290.0),
            timing("fire", -1100.0, -1090.0),
        ];
        let set = build_priors(&claims, &pool(), &TemporalConfig::default(), None);
        let prior = &set.priors[&EventId::new("fire")];
        assert!((prior.mean() - (-1195.0)).abs() < 2.0);
    }

    #[test]
    fn test_undated_event() {
        let claims = vec![occurred("fire", &[])];
        let set = build_priors(&claims, &pool(), &TemporalConfig::default(), None);
        assert!(set.priors.is_empty());
        assert_eq!(set.undated, vec![EventId::new("fire")]);
        assert!(set.grid.is_none());
    }

    #[test]
    fn test_grid_reused_when_it_still_covers() {
        let claims = vec![occurred("fire", &["t1"])];
        let config = TemporalConfig::default();
        let wide = TimeGrid::new(-2000.0, 0.0, config.grid_bins).unwrap();
        let set = build_priors(&claims, &pool(), &config, Some(wide));
        assert_eq!(set.grid, Some(wide));

        let narrow = TimeGrid::new(-1200.0, -1190.0, config.grid_bins).unwrap();
        let set = build_priors(&claims, &pool(), &config, Some(narrow));
        assert_ne!(set.grid, Some(narrow));
    }
}
