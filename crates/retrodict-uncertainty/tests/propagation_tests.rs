//! Integration tests for retrodict-uncertainty
//!
//! Confidence along causal chains built through the DAG constructor.

use retrodict_causal::{CausalGraph, DagConstructor};
use retrodict_domain::{
    Assertion, Claim, ClaimId, ClaimStatus, ConfidenceLevel, ConfidenceBands, Event, EventId,
    Layer, NodeRef, Polarity, RelationKind, Significance, TraceId,
};
use retrodict_uncertainty::UncertaintyPropagator;
use std::collections::{BTreeMap, BTreeSet};

fn claim(assertion: Assertion, score: f64, traces: usize) -> Claim {
    Claim {
        id: ClaimId::new(),
        label: assertion.key().to_string(),
        assertion,
        significance: Significance::Local,
        supporting_traces: (0..traces).map(|i| TraceId::new(format!("t{}", i))).collect(),
        distinct_substrates: 2,
        strength: score,
        confidence_score: score,
        confidence_level: ConfidenceBands::default().classify(score),
        status: ClaimStatus::Active,
        supersedes: None,
        contested: false,
    }
}

fn occurred(event: &str, score: f64) -> Claim {
    claim(
        Assertion::EventOccurred {
            event: EventId::new(event),
            layer: Layer::L1,
            kind: event.to_string(),
            participants: Default::default(),
        },
        score,
        4,
    )
}

fn causes(cause: &str, effect: &str, score: f64) -> Claim {
    claim(
        Assertion::Causal {
            cause: NodeRef::event(cause),
            effect: NodeRef::event(effect),
            weight: 0.8,
            relation: RelationKind::Influences,
            polarity: Polarity::Affirms,
        },
        score,
        4,
    )
}

fn events(claims: &[Claim], underdetermined: &[&str]) -> BTreeMap<EventId, Event> {
    claims
        .iter()
        .filter_map(|c| match &c.assertion {
            Assertion::EventOccurred { event, layer, kind, .. } => Some((
                event.clone(),
                Event {
                    id: event.clone(),
                    layer: *layer,
                    kind: kind.clone(),
                    participants: Default::default(),
                    prior: None,
                    time_distribution: None,
                    temporally_underdetermined: underdetermined.contains(&event.as_str()),
                    claim: c.id,
                },
            )),
            _ => None,
        })
        .collect()
}

fn build(claims: &[Claim]) -> CausalGraph {
    let mut graph = CausalGraph::new();
    DagConstructor::default().apply_claims(&mut graph, claims, &BTreeMap::new());
    graph
}

#[test]
fn test_chain_is_capped_by_weakest_link() {
    let claims = vec![
        occurred("a", 0.9),
        occurred("b", 0.4),
        occurred("c", 0.95),
        causes("a", "b", 0.9),
        causes("b", "c", 0.9),
    ];
    let graph = build(&claims);
    let result = UncertaintyPropagator::default().propagate(&graph, &claims, &events(&claims, &[]));

    let c = &result[&NodeRef::event("c")];
    assert!(c.score <= 0.4);
    assert_eq!(c.own_score, 0.95);
    assert_eq!(c.limiting_ancestor, Some(NodeRef::event("b")));
    assert_eq!(c.level, ConfidenceLevel::Speculative);
    assert!(c.interval.lower <= c.score && c.score <= c.interval.upper);
}

#[test]
fn test_speculative_ancestor_never_yields_verified_descendant() {
    let claims = vec![
        occurred("rumour", 0.45),
        occurred("revolt", 0.95),
        causes("rumour", "revolt", 0.95),
    ];
    let graph = build(&claims);
    let result = UncertaintyPropagator::default().propagate(&graph, &claims, &events(&claims, &[]));
    assert_eq!(result[&NodeRef::event("revolt")].level, ConfidenceLevel::Speculative);
}

#[test]
fn test_underdetermined_event_is_capped_and_flagged() {
    let claims = vec![occurred("flood", 0.95)];
    let graph = build(&claims);
    let result =
        UncertaintyPropagator::default().propagate(&graph, &claims, &events(&claims, &["flood"]));
    let flood = &result[&NodeRef::event("flood")];
    assert_eq!(flood.level, ConfidenceLevel::Speculative);
    assert!(flood.low_confidence);
    assert_eq!(flood.score, 0.95);
}

#[test]
fn test_epistemic_shrinks_with_more_traces() {
    let few = vec![claim(
        Assertion::EventOccurred {
            event: EventId::new("x"),
            layer: Layer::L0,
            kind: "x".into(),
            participants: Default::default(),
        },
        0.7,
        1,
    )];
    let mut many = few.clone();
    many[0].supporting_traces = (0..20).map(|i| TraceId::new(format!("t{}", i))).collect();

    let propagator = UncertaintyPropagator::default();
    let a = propagator.propagate(&build(&few), &few, &events(&few, &[]));
    let b = propagator.propagate(&build(&many), &many, &events(&many, &[]));
    let node = NodeRef::event("x");
    assert!(b[&node].epistemic < a[&node].epistemic);
    assert_eq!(b[&node].aleatoric, 0.0);
}

#[test]
fn test_subset_reuses_unaffected_nodes() {
    let mut claims = vec![
        occurred("a", 0.9),
        occurred("b", 0.8),
        occurred("z", 0.6),
        causes("a", "b", 0.9),
    ];
    let graph = build(&claims);
    let propagator = UncertaintyPropagator::default();
    let before = propagator.propagate(&graph, &claims, &events(&claims, &[]));

    // Weaken a; only a and its descendants move
    claims[0].confidence_score = 0.5;
    claims[0].confidence_level = ConfidenceLevel::Plausible;
    let dirty = BTreeSet::from([NodeRef::event("a")]);
    let after =
        propagator.propagate_subset(&graph, &claims, &events(&claims, &[]), &before, &dirty);

    assert_eq!(after[&NodeRef::event("z")], before[&NodeRef::event("z")]);
    assert_eq!(after[&NodeRef::event("b")].score, 0.5);
    assert_eq!(after.len(), 3);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: no node is more confident than any causal ancestor
        #[test]
        fn test_confidence_bounded_by_ancestors(
            scores in prop::collection::vec(0.0f64..=1.0, 2..10),
            edges in prop::collection::vec((0usize..10, 0usize..10, 0.0f64..=1.0), 0..20),
        ) {
            let n = scores.len();
            let mut claims: Vec<Claim> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| occurred(&format!("n{}", i), *s))
                .collect();
            for (a, b, s) in edges {
                // Forward edges only, so every set is acyclic
                if a < b && b < n {
                    claims.push(causes(&format!("n{}", a), &format!("n{}", b), s));
                }
            }
            let graph = build(&claims);
            let result = UncertaintyPropagator::default().propagate(&graph, &claims, &events(&claims, &[]));

            for (node, confidence) in &result {
                for ancestor in graph.ancestors(node) {
                    let upstream = &result[&ancestor];
                    prop_assert!(confidence.score <= upstream.score + 1e-12);
                    prop_assert!(confidence.level <= upstream.level);
                }
                prop_assert!(confidence.score <= confidence.own_score);
            }
        }
    }
}
