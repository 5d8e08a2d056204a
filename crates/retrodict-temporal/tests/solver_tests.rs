//! Integration tests for retrodict-temporal
//!
//! Priors built from claims, constraints derived from a causal graph, and
//! the solve over the resulting components.

use retrodict_causal::{CausalGraph, DagConstructor};
use retrodict_domain::{
    Assertion, Claim, ClaimId, ClaimStatus, ConfidenceLevel, EventId, Layer, NodeRef, Polarity,
    RelationKind, Significance, TimeEstimate, TimeGrid, TimeDistribution,
};
use retrodict_temporal::{build_priors, CancelFlag, SolveInput, TemporalConfig, TemporalSolver};
use std::collections::{BTreeMap, BTreeSet};

fn claim(assertion: Assertion) -> Claim {
    Claim {
        id: ClaimId::new(),
        label: assertion.key().to_string(),
        assertion,
        significance: Significance::Local,
        supporting_traces: Default::default(),
        distinct_substrates: 2,
        strength: 0.7,
        confidence_score: 0.7,
        confidence_level: ConfidenceLevel::Plausible,
        status: ClaimStatus::Active,
        supersedes: None,
        contested: false,
    }
}

fn occurred(event: &str) -> Claim {
    claim(Assertion::EventOccurred {
        event: EventId::new(event),
        layer: Layer::L2,
        kind: event.to_string(),
        participants: Default::default(),
    })
}

fn dated(event: &str, earliest: f64, latest: f64) -> Claim {
    claim(Assertion::Timing {
        event: EventId::new(event),
        estimate: TimeEstimate::interval(earliest, latest),
    })
}

fn causes(cause: &str, effect: &str) -> Claim {
    claim(Assertion::Causal {
        cause: NodeRef::event(cause),
        effect: NodeRef::event(effect),
        weight: 0.8,
        relation: RelationKind::Influences,
        polarity: Polarity::Affirms,
    })
}

/// Two independent chains: siege -> fire, and quake alone
fn claims() -> Vec<Claim> {
    vec![
        occurred("siege"),
        occurred("fire"),
        occurred("quake"),
        dated("siege", -1200.0, -1150.0),
        dated("fire", -1190.0, -1140.0),
        dated("quake", -1300.0, -1250.0),
        causes("siege", "fire"),
    ]
}

fn setup() -> (CausalGraph, BTreeMap<EventId, TimeDistribution>) {
    let claims = claims();
    let priors = build_priors(&claims, &BTreeMap::new(), &TemporalConfig::default(), None);
    let mut graph = CausalGraph::new();
    DagConstructor::default().apply_claims(&mut graph, &claims, &priors.priors);
    (graph, priors.priors)
}

#[test]
fn test_components_follow_the_graph() {
    let (graph, priors) = setup();
    let input = SolveInput::from_graph(&graph, priors, None);
    assert_eq!(input.constraints.len(), 1);
    assert_eq!(input.components.len(), 2);
    assert!(input
        .components
        .contains(&vec![EventId::new("fire"), EventId::new("siege")]));
}

#[test]
fn test_scoped_solve_touches_only_affected_components() {
    let (graph, priors) = setup();
    let scope = BTreeSet::from([NodeRef::event("quake")]);
    let input = SolveInput::from_graph(&graph, priors, Some(&scope));
    assert_eq!(input.events(), BTreeSet::from([EventId::new("quake")]));

    let outcome = TemporalSolver::default().solve(&input, &CancelFlag::new()).unwrap();
    assert_eq!(outcome.posteriors.len(), 1);
}

#[test]
fn test_constrained_events_reorder() {
    let (graph, priors) = setup();
    let before = priors[&EventId::new("siege")].probability_precedes(&priors[&EventId::new("fire")]);
    let input = SolveInput::from_graph(&graph, priors, None);
    let outcome = TemporalSolver::default().solve(&input, &CancelFlag::new()).unwrap();
    let after = outcome.posteriors[&EventId::new("siege")]
        .probability_precedes(&outcome.posteriors[&EventId::new("fire")]);
    assert!(after > before);
    assert_eq!(outcome.posteriors.len(), 3);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: posteriors stay normalised on the shared grid
        #[test]
        fn test_posteriors_are_normalised(
            starts in prop::collection::vec(-1500.0f64..-1000.0, 2..6),
            weight in 0.0f64..=1.0,
        ) {
            let grid = TimeGrid::new(-1600.0, -800.0, 64).unwrap();
            let ids: Vec<EventId> = (0..starts.len()).map(|i| EventId::new(format!("e{}", i))).collect();
            let priors: BTreeMap<EventId, TimeDistribution> = ids
                .iter()
                .zip(&starts)
                .map(|(id, s)| {
                    (id.clone(), TimeDistribution::from_estimate(&TimeEstimate::interval(*s, s + 100.0), grid))
                })
                .collect();
            let constraints = ids
                .windows(2)
                .map(|w| retrodict_temporal::OrderingConstraint {
                    before: w[0].clone(),
                    after: w[1].clone(),
                    weight,
                })
                .collect();
            let input = SolveInput { priors, constraints, components: vec![ids.clone()] };

            let outcome = TemporalSolver::default().solve(&input, &CancelFlag::new()).unwrap();
            for id in &ids {
                let posterior = &outcome.posteriors[id];
                let total: f64 = posterior.mass().iter().sum();
                prop_assert!((total - 1.0).abs() < 1e-9);
                prop_assert_eq!(posterior.grid(), &grid);
            }
        }
    }
}
