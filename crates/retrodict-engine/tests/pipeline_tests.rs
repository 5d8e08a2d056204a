//! Integration tests for retrodict-engine
//!
//! Full pipeline runs: reconstruction, incremental updates, retractions
//! and filtered views over the result.

use retrodict_domain::{
    Assertion, AssertionKey, AuditEvent, ClaimStatus, ClaimTemplate, ConfidenceLevel, EventId,
    Layer, NodeRef, Polarity, ProvenanceEntry, ReasonCode, RelationKind, SubstrateType,
    TimeEstimate, Trace, TraceId, VoidReason,
};
use retrodict_engine::{
    ingest, CalibrationReport, CancelFlag, EngineConfig, EngineError, ReconstructionRequest,
    Reconstructor, SnapshotView, UpdateBatch,
};
use std::collections::BTreeMap;

fn trace(id: &str, substrate: SubstrateType, quality: f64, earliest: f64, latest: f64) -> Trace {
    Trace::new(
        id,
        substrate,
        ProvenanceEntry::new(format!("source:{}", id), 1_700_000_000_000, "field-survey"),
        TimeEstimate::interval(earliest, latest),
        quality,
    )
}

fn event(id: &str, layer: Layer) -> Assertion {
    Assertion::EventOccurred {
        event: EventId::new(id),
        layer,
        kind: id.to_string(),
        participants: Default::default(),
    }
}

fn causal(cause: &str, effect: &str) -> Assertion {
    Assertion::Causal {
        cause: NodeRef::event(cause),
        effect: NodeRef::event(effect),
        weight: 0.6,
        relation: RelationKind::Influences,
        polarity: Polarity::Affirms,
    }
}

fn timing(event: &str, earliest: f64, latest: f64) -> Assertion {
    Assertion::Timing {
        event: EventId::new(event),
        estimate: TimeEstimate::interval(earliest, latest),
    }
}

fn bronze_age_traces(qualities: [f64; 3]) -> Vec<Trace> {
    vec![
        trace("destruction-layer", SubstrateType::Physical, qualities[0], -1200.0, -1170.0),
        trace("pollen-drought", SubstrateType::Planetary, qualities[1], -1250.0, -1190.0),
        trace("linear-b-tablet", SubstrateType::Cultural, qualities[2], -1190.0, -1160.0),
    ]
}

fn bronze_age_templates(with_link: bool) -> Vec<ClaimTemplate> {
    let mut templates = vec![
        ClaimTemplate::new("drought", event("drought", Layer::L0))
            .with_traces(["pollen-drought", "destruction-layer"]),
        ClaimTemplate::new("palace economy collapse", event("collapse", Layer::L3))
            .with_traces(["destruction-layer", "linear-b-tablet"]),
    ];
    if with_link {
        templates.push(
            ClaimTemplate::new("drought contributed to palace economy collapse", causal("drought", "collapse"))
                .with_traces(["destruction-layer", "pollen-drought", "linear-b-tablet"]),
        );
    }
    templates
}

fn reconstruct(traces: Vec<Trace>, templates: Vec<ClaimTemplate>) -> retrodict_engine::Derivation {
    Reconstructor::default_config()
        .reconstruct(traces, templates, &CancelFlag::new())
        .unwrap()
}

fn fire_traces() -> Vec<Trace> {
    vec![
        trace("p1", SubstrateType::Physical, 1.0, -1200.0, -1160.0),
        trace("p2", SubstrateType::Planetary, 1.0, -1200.0, -1160.0),
        trace("p3", SubstrateType::Biological, 1.0, -1200.0, -1160.0),
        trace("w1", SubstrateType::Physical, 0.64, -1320.0, -1280.0),
    ]
}

#[test]
fn test_three_substrates_yield_plausible_link() {
    let derivation = reconstruct(bronze_age_traces([0.8, 0.7, 0.6]), bronze_age_templates(true));
    let content = &derivation.content;

    let link = content
        .active_claims()
        .find(|c| matches!(c.assertion, Assertion::Causal { .. }))
        .unwrap();
    assert_eq!(link.confidence_level, ConfidenceLevel::Plausible);
    assert_eq!(link.distinct_substrates, 3);

    let drought = NodeRef::event("drought");
    let collapse = NodeRef::event("collapse");
    assert!(content.edge(&drought, &collapse).is_some());
    assert_eq!(content.events.len(), 2);
    assert!(content.node_confidence[&collapse].score <= content.node_confidence[&drought].score);
    assert!(content.node_confidence[&collapse].level <= ConfidenceLevel::Plausible);
    assert!(derivation.stats.full_recompute);
}

#[test]
fn test_single_trace_link_is_a_void_not_an_error() {
    let traces = vec![
        trace("p1", SubstrateType::Physical, 1.0, -1650.0, -1600.0),
        trace("p2", SubstrateType::Planetary, 1.0, -1650.0, -1600.0),
        trace("e1", SubstrateType::Economic, 1.0, -1600.0, -1550.0),
    ];
    let templates = vec![
        ClaimTemplate::new("eruption", event("eruption", Layer::L0)).with_traces(["p1", "p2"]),
        ClaimTemplate::new("grain price spike", event("prices", Layer::L3)).with_traces(["e1"]),
        ClaimTemplate::new("eruption raised grain prices", causal("eruption", "prices"))
            .with_traces(["p1"]),
    ];
    let content = reconstruct(traces, templates).content;

    assert!(content.edges.is_empty());
    assert_eq!(content.events.len(), 2);
    let void = content
        .voids
        .iter()
        .find(|v| v.reason.code() == Some(ReasonCode::TriangulationViolation))
        .unwrap();
    assert_eq!(
        void.key,
        AssertionKey::Causal {
            cause: NodeRef::event("eruption"),
            effect: NodeRef::event("prices"),
        }
    );
    assert!(void.render().starts_with("[VOID: "));
}

#[test]
fn test_stronger_timing_wins_and_both_are_audited() {
    let templates = vec![
        ClaimTemplate::new("fire", event("fire", Layer::L2)).with_traces(["p1", "p2", "p3"]),
        ClaimTemplate::new("fire in 1300 BCE", timing("fire", -1310.0, -1290.0)).with_traces(["w1"]),
        ClaimTemplate::new("fire in 1180 BCE", timing("fire", -1190.0, -1170.0))
            .with_traces(["p1", "p2", "p3"]),
    ];
    let content = reconstruct(fire_traces(), templates).content;

    let weak = content.claims.iter().find(|c| c.label == "fire in 1300 BCE").unwrap();
    let strong = content.claims.iter().find(|c| c.label == "fire in 1180 BCE").unwrap();
    assert_eq!(weak.status, ClaimStatus::Superseded { by: strong.id });
    assert!(strong.is_active());

    let audited: Vec<&str> = content
        .audit
        .records()
        .iter()
        .filter_map(|r| match &r.event {
            AuditEvent::Admission { label, .. } => Some(label.as_str()),
            _ => None,
        })
        .collect();
    assert!(audited.contains(&"fire in 1300 BCE"));
    assert!(audited.contains(&"fire in 1180 BCE"));

    // Only the surviving timing claim shapes the date
    let fire = &content.events[&EventId::new("fire")];
    let median = fire.time_distribution.as_ref().unwrap().quantile(0.5);
    assert!((-1190.0..=-1170.0).contains(&median), "median {}", median);
    assert!(!fire.temporally_underdetermined);
}

#[test]
fn test_empty_batch_reproduces_parent() {
    let parent = reconstruct(bronze_age_traces([0.8, 0.7, 0.6]), bronze_age_templates(true)).content;
    let next = Reconstructor::default_config()
        .advance(&parent, &UpdateBatch::new(), &CancelFlag::new())
        .unwrap();
    assert_eq!(next.content, parent);
    assert!(next.revisions.is_empty());
}

#[test]
fn test_new_link_extends_parent_incrementally() {
    let engine = Reconstructor::default_config();
    let parent = reconstruct(bronze_age_traces([0.8, 0.7, 0.6]), bronze_age_templates(false)).content;
    assert!(parent.edges.is_empty());

    let batch = UpdateBatch::new().with_templates(
        bronze_age_templates(true).into_iter().filter(|t| matches!(t.assertion, Assertion::Causal { .. })),
    );
    let next = engine.advance(&parent, &batch, &CancelFlag::new()).unwrap();

    assert_eq!(next.content.edges.len(), 1);
    assert!(parent.edges.is_empty());
    // Existing claims keep their identity
    for claim in &parent.claims {
        assert_eq!(next.content.claim(claim.id), Some(claim));
    }
    assert_eq!(next.content.templates.len(), 3);
    assert!(next.content.audit.len() > parent.audit.len());
}

#[test]
fn test_new_trace_revisits_earlier_candidate() {
    let engine = Reconstructor::default_config();
    let parent = reconstruct(
        vec![trace("p1", SubstrateType::Physical, 1.0, -1200.0, -1160.0)],
        vec![ClaimTemplate::new("flood", event("flood", Layer::L1)).with_traces(["p1", "p2"])],
    )
    .content;
    let first = parent.active_claims().next().unwrap().clone();
    assert_eq!(first.supporting_traces.len(), 1);

    let batch = UpdateBatch::new().with_traces([trace("p2", SubstrateType::Planetary, 1.0, -1200.0, -1160.0)]);
    let next = engine.advance(&parent, &batch, &CancelFlag::new()).unwrap();

    let merged = next
        .content
        .active_claims()
        .find(|c| c.key() == first.key())
        .unwrap();
    assert_eq!(merged.supporting_traces.len(), 2);
    assert_eq!(merged.supersedes, Some(first.id));
    assert!(merged.confidence_score >= first.confidence_score);
    assert!(!next.stats.full_recompute);
    assert!(parent.claim(first.id).unwrap().is_active());
}

#[test]
fn test_retraction_reports_verified_revision() {
    let engine = Reconstructor::default_config();
    let parent = reconstruct(
        fire_traces(),
        vec![ClaimTemplate::new("fire", event("fire", Layer::L2)).with_traces(["p1", "p2", "p3"])],
    )
    .content;
    let fire = parent.active_claims().next().unwrap().clone();
    assert_eq!(fire.confidence_level, ConfidenceLevel::Verified);

    let next = engine
        .advance(&parent, &UpdateBatch::new().retracting(["p3"]), &CancelFlag::new())
        .unwrap();
    assert!(next.stats.full_recompute);
    assert!(!next.content.traces.contains_key(&TraceId::new("p3")));

    assert_eq!(next.revisions.len(), 1);
    let revision = &next.revisions[0];
    assert_eq!(revision.claim, fire.id);
    assert_eq!(revision.prior_level, ConfidenceLevel::Verified);
    assert!(revision.new_level < ConfidenceLevel::Verified);
    // The parent's history stays on record
    assert!(next.content.audit.len() > parent.audit.len());
}

#[test]
fn test_retracting_unknown_trace_fails() {
    let parent = reconstruct(fire_traces(), Vec::new()).content;
    let err = Reconstructor::default_config()
        .advance(&parent, &UpdateBatch::new().retracting(["nowhere"]), &CancelFlag::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownTrace(_)));
}

#[test]
fn test_malformed_traces_fail_fast() {
    let mut traces = fire_traces();
    traces.push(trace("p1", SubstrateType::Cultural, 0.5, -900.0, -800.0));
    let err = Reconstructor::default_config()
        .reconstruct(traces, Vec::new(), &CancelFlag::new())
        .unwrap_err();
    assert_eq!(err.reason_code(), Some(ReasonCode::MalformedTrace));

    let json = serde_json::to_string(&vec![trace("bad", SubstrateType::Physical, 1.5, 0.0, 1.0)]).unwrap();
    let err = ingest::parse_traces(&json).unwrap_err();
    assert_eq!(err.reason_code(), Some(ReasonCode::MalformedTrace));
}

#[test]
fn test_conflicting_trace_in_batch_leaves_parent_untouched() {
    let parent = reconstruct(fire_traces(), Vec::new()).content;
    let batch = UpdateBatch::new().with_traces([trace("p1", SubstrateType::Cultural, 0.2, 0.0, 10.0)]);
    let err = Reconstructor::default_config()
        .advance(&parent, &batch, &CancelFlag::new())
        .unwrap_err();
    assert_eq!(err.reason_code(), Some(ReasonCode::MalformedTrace));
    assert_eq!(parent.traces.len(), 4);
}

#[test]
fn test_cancelled_run_returns_error() {
    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = Reconstructor::default_config()
        .reconstruct(bronze_age_traces([0.8, 0.7, 0.6]), bronze_age_templates(true), &cancel)
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[test]
fn test_identical_inputs_give_identical_numbers() {
    let a = reconstruct(bronze_age_traces([0.8, 0.7, 0.6]), bronze_age_templates(true)).content;
    let b = reconstruct(bronze_age_traces([0.8, 0.7, 0.6]), bronze_age_templates(true)).content;
    assert_eq!(a.node_confidence, b.node_confidence);

    // Claim ids differ between runs; everything else matches
    let mut events = b.events.clone();
    for (id, event) in events.iter_mut() {
        event.claim = a.events[id].claim;
    }
    assert_eq!(a.events, events);
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = EngineConfig::default();
    config.temporal.damping = 1.5;
    assert!(matches!(Reconstructor::new(config), Err(EngineError::Config(_))));

    let config = EngineConfig::from_toml("[temporal]\nmax_iterations = 50\n").unwrap();
    let engine = Reconstructor::new(config).unwrap();
    assert_eq!(engine.config().temporal.max_iterations, 50);
}

#[test]
fn test_view_confidence_floor_hides_into_voids() {
    let derivation = reconstruct(bronze_age_traces([0.8, 0.7, 0.6]), bronze_age_templates(true));
    let snapshot = retrodict_domain::WorldModelSnapshot::new(
        None,
        retrodict_domain::SnapshotKind::Initial,
        Vec::new(),
        derivation.content,
    );

    let all = SnapshotView::new(&snapshot, &ReconstructionRequest::new("Late Bronze Age Aegean"));
    assert_eq!(all.events.len(), 2);
    assert_eq!(all.edges.len(), 1);
    assert_eq!(all.claims.len(), 3);

    let request = ReconstructionRequest::new("Late Bronze Age Aegean")
        .with_min_confidence(ConfidenceLevel::Verified);
    let view = SnapshotView::new(&snapshot, &request);
    assert!(view.events.is_empty());
    assert!(view.edges.is_empty());
    assert!(view.claims.is_empty());
    let hidden = view
        .voids
        .iter()
        .filter(|v| v.reason == VoidReason::BelowConfidenceFloor)
        .count();
    assert_eq!(hidden, 3);
    assert!(view
        .render_voids()
        .iter()
        .any(|line| line.contains("BELOW_CONFIDENCE_FLOOR")));
}

#[test]
fn test_view_layer_and_time_scope() {
    let content = reconstruct(bronze_age_traces([0.8, 0.7, 0.6]), bronze_age_templates(true)).content;
    let snapshot = retrodict_domain::WorldModelSnapshot::new(
        None,
        retrodict_domain::SnapshotKind::Initial,
        Vec::new(),
        content,
    );

    let planetary = SnapshotView::new(
        &snapshot,
        &ReconstructionRequest::new("aegean").with_layers([Layer::L0]),
    );
    assert!(planetary.event(&EventId::new("drought")).is_some());
    assert!(planetary.event(&EventId::new("collapse")).is_none());
    assert!(planetary.edges.is_empty());
    assert!(planetary.voids.is_empty());

    let modern = SnapshotView::new(
        &snapshot,
        &ReconstructionRequest::new("aegean").with_timescale(0.0, 100.0),
    );
    assert!(modern.events.is_empty());

    let bronze = SnapshotView::new(
        &snapshot,
        &ReconstructionRequest::new("aegean").with_timescale(-1300.0, -1100.0),
    );
    assert_eq!(bronze.events.len(), 2);
}

#[test]
fn test_request_from_json() {
    let request: ReconstructionRequest = serde_json::from_str(
        r#"{"target_system": "Late Bronze Age Aegean", "min_confidence": "PLAUSIBLE"}"#,
    )
    .unwrap();
    assert_eq!(request.min_confidence, ConfidenceLevel::Plausible);
    assert!(request.layers.is_none());
    assert!(request.timescale.is_none());
}

#[test]
fn test_calibration_over_reconstruction() {
    let content = reconstruct(bronze_age_traces([0.8, 0.7, 0.6]), bronze_age_templates(true)).content;
    let outcomes: BTreeMap<_, _> = content.active_claims().map(|c| (c.id, true)).collect();
    let report = CalibrationReport::evaluate(&content.claims, &outcomes);

    assert_eq!(report.level(ConfidenceLevel::Plausible).passed, Some(true));
    assert_eq!(report.level(ConfidenceLevel::Verified).accuracy, None);
    assert!(report.overconfident.is_empty());
    assert!(report.overall_calibrated);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: an effect is never more confident than its cause
        #[test]
        fn test_effects_bounded_by_causes(
            q in (0.0f64..=1.0, 0.0f64..=1.0, 0.0f64..=1.0),
        ) {
            let content = reconstruct(bronze_age_traces([q.0, q.1, q.2]), bronze_age_templates(true)).content;
            for edge in &content.edges {
                let cause = &content.node_confidence[&edge.cause];
                let effect = &content.node_confidence[&edge.effect];
                prop_assert!(effect.score <= cause.score + 1e-12);
                prop_assert!(effect.level <= cause.level);
            }
            for claim in content.active_claims() {
                if claim.confidence_level == ConfidenceLevel::Verified {
                    prop_assert!(claim.supporting_traces.len() >= 3);
                }
            }
        }
    }
}
