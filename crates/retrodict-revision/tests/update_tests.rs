//! Integration tests for retrodict-revision
//!
//! Version history built through the update engine and coordinator over
//! both snapshot stores.

use retrodict_domain::{
    Assertion, ClaimTemplate, ConfidenceLevel, EventId, Layer, ProvenanceEntry, ReasonCode,
    SnapshotKind, SnapshotStore, SubstrateType, TimeEstimate, Trace, VersionId,
};
use retrodict_engine::{CancelFlag, UpdateBatch};
use retrodict_revision::{ContinualUpdateEngine, UpdateConfig, UpdateCoordinator, UpdateError};
use retrodict_store::{MemorySnapshotStore, SqliteSnapshotStore};
use std::sync::Arc;
use tempfile::NamedTempFile;

fn trace(id: &str, substrate: SubstrateType, quality: f64) -> Trace {
    Trace::new(
        id,
        substrate,
        ProvenanceEntry::new(format!("source:{}", id), 1_700_000_000_000, "field-survey"),
        TimeEstimate::interval(-1200.0, -1160.0),
        quality,
    )
}

fn event(id: &str) -> Assertion {
    Assertion::EventOccurred {
        event: EventId::new(id),
        layer: Layer::L2,
        kind: id.to_string(),
        participants: Default::default(),
    }
}

fn fire_traces() -> Vec<Trace> {
    vec![
        trace("p1", SubstrateType::Physical, 1.0),
        trace("p2", SubstrateType::Planetary, 1.0),
        trace("p3", SubstrateType::Biological, 1.0),
    ]
}

fn fire_templates() -> Vec<ClaimTemplate> {
    vec![ClaimTemplate::new("fire", event("fire")).with_traces(["p1", "p2", "p3"])]
}

fn engine<S: SnapshotStore>(store: S) -> ContinualUpdateEngine<S> {
    ContinualUpdateEngine::new(store, UpdateConfig::default()).unwrap()
}

fn bootstrap<S: SnapshotStore>(engine: &ContinualUpdateEngine<S>) -> VersionId {
    engine
        .bootstrap(fire_traces(), fire_templates(), &CancelFlag::new())
        .unwrap()
        .version()
}

fn labelled(label: &str) -> UpdateBatch {
    UpdateBatch::new().with_templates([ClaimTemplate::new(label, event(label)).with_traces(["p1", "p2"])])
}

fn exercise_updates<S: SnapshotStore>(engine: ContinualUpdateEngine<S>) {
    let root = bootstrap(&engine);
    let stored = engine.store().get(root).unwrap().unwrap();
    assert_eq!(stored.kind(), &SnapshotKind::Initial);
    assert_eq!(stored.parent(), None);

    // Empty batch: new version, same content
    let same = engine.apply(root, &UpdateBatch::new(), &CancelFlag::new()).unwrap();
    assert_eq!(same.parent(), Some(root));
    assert_eq!(same.kind(), &SnapshotKind::Update);
    assert_eq!(same.content(), stored.content());
    assert!(!same.is_revision());

    // Retracting a trace behind a VERIFIED claim is a revision
    let revised = engine
        .apply(root, &UpdateBatch::new().retracting(["p3"]), &CancelFlag::new())
        .unwrap();
    assert_eq!(revised.kind(), &SnapshotKind::Revision);
    assert!(revised.is_revision());
    let revision = &revised.revisions()[0];
    assert_eq!(revision.prior_level, ConfidenceLevel::Verified);
    assert!(revision.new_level < ConfidenceLevel::Verified);

    // The root is untouched and now has two children
    assert_eq!(engine.store().get(root).unwrap().unwrap().content(), stored.content());
    assert_eq!(
        engine.store().children(root).unwrap(),
        vec![same.version(), revised.version()]
    );
    assert_eq!(
        engine.store().lineage(revised.version()).unwrap(),
        vec![revised.version(), root]
    );

    let metrics = engine.metrics();
    assert_eq!(metrics.bootstraps, 1);
    assert_eq!(metrics.updates, 1);
    assert_eq!(metrics.revisions, 1);
    assert!(metrics.revised_claims >= 1);
}

fn exercise_forks<S: SnapshotStore>(engine: ContinualUpdateEngine<S>) {
    let root = bootstrap(&engine);
    let update = engine.apply(root, &labelled("smoke"), &CancelFlag::new()).unwrap();
    let branch = engine
        .fork(
            root,
            "no biological record",
            &UpdateBatch::new().retracting(["p3"]),
            &CancelFlag::new(),
        )
        .unwrap();

    assert_eq!(
        branch.kind(),
        &SnapshotKind::Counterfactual {
            label: "no biological record".to_string()
        }
    );
    assert!(!branch.revisions().is_empty());
    assert_eq!(
        engine.store().heads().unwrap(),
        vec![update.version(), branch.version()]
    );
    assert_eq!(engine.metrics().counterfactuals, 1);
}

#[test]
fn test_updates_in_memory() {
    exercise_updates(engine(MemorySnapshotStore::new()));
}

#[test]
fn test_updates_in_sqlite() {
    let file = NamedTempFile::new().unwrap();
    exercise_updates(engine(SqliteSnapshotStore::new(file.path()).unwrap()));
}

#[test]
fn test_forks_in_memory() {
    exercise_forks(engine(MemorySnapshotStore::new()));
}

#[test]
fn test_forks_in_sqlite() {
    let file = NamedTempFile::new().unwrap();
    exercise_forks(engine(SqliteSnapshotStore::new(file.path()).unwrap()));
}

#[test]
fn test_unknown_parent() {
    let engine = engine(MemorySnapshotStore::new());
    let err = engine
        .apply(VersionId::new(), &UpdateBatch::new(), &CancelFlag::new())
        .unwrap_err();
    assert!(matches!(err, UpdateError::UnknownVersion(_)));
}

#[test]
fn test_failed_update_publishes_nothing() {
    let engine = engine(MemorySnapshotStore::new());
    let root = bootstrap(&engine);

    let conflicting = UpdateBatch::new().with_traces([trace("p1", SubstrateType::Cultural, 0.1)]);
    let err = engine.apply(root, &conflicting, &CancelFlag::new()).unwrap_err();
    assert_eq!(err.reason_code(), Some(ReasonCode::MalformedTrace));

    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = engine.apply(root, &labelled("smoke"), &cancel).unwrap_err();
    assert!(matches!(err, UpdateError::Engine(ref e) if e.is_cancelled()));

    assert_eq!(engine.store().len(), 1);
    assert!(engine.store().children(root).unwrap().is_empty());
    assert_eq!(engine.metrics().failures, 2);
}

#[test]
fn test_invalid_config() {
    let config = UpdateConfig {
        queue_wait_ms: 0,
        ..Default::default()
    };
    let result = ContinualUpdateEngine::new(MemorySnapshotStore::new(), config);
    assert!(matches!(result, Err(UpdateError::Config(_))));
}

#[tokio::test]
async fn test_queued_updates_apply_in_arrival_order() {
    let engine = engine(MemorySnapshotStore::new());
    let root = bootstrap(&engine);
    let coordinator = UpdateCoordinator::new(engine);
    let cancel = CancelFlag::new();

    // join! polls in order, so the first takes the gate and the rest queue
    let (a, b, c) = tokio::join!(
        coordinator.submit(root, labelled("a"), &cancel),
        coordinator.submit(root, labelled("b"), &cancel),
        coordinator.submit(root, labelled("c"), &cancel),
    );
    let published: Vec<VersionId> = [a, b, c]
        .into_iter()
        .map(|r| r.unwrap().version())
        .collect();

    // No lost updates: each request has its own child of the root
    assert_eq!(coordinator.engine().store().children(root).unwrap(), published);
    for (version, label) in published.iter().zip(["a", "b", "c"]) {
        let snapshot = coordinator.engine().store().get(*version).unwrap().unwrap();
        assert_eq!(snapshot.parent(), Some(root));
        assert!(snapshot.content().events.contains_key(&EventId::new(label)));
        assert_eq!(snapshot.content().events.len(), 2);
    }
}

#[tokio::test]
async fn test_try_submit_conflicts_while_parent_is_busy() {
    let engine = engine(MemorySnapshotStore::new());
    let root = bootstrap(&engine);
    let coordinator = UpdateCoordinator::new(engine);
    let cancel = CancelFlag::new();

    let (first, second) = tokio::join!(
        coordinator.submit(root, labelled("a"), &cancel),
        coordinator.try_submit(root, labelled("b"), &cancel),
    );
    assert!(first.is_ok());
    let err = second.unwrap_err();
    assert!(matches!(err, UpdateError::ConcurrentUpdateConflict { parent } if parent == root));
    assert_eq!(err.reason_code(), Some(ReasonCode::ConcurrentUpdateConflict));
    assert_eq!(coordinator.engine().metrics().conflicts, 1);

    // Once the parent is free again, try_submit goes through
    let child = coordinator.try_submit(root, labelled("b"), &cancel).await.unwrap();
    assert_eq!(child.parent(), Some(root));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_parents_do_not_block_each_other() {
    let file = NamedTempFile::new().unwrap();
    let engine = engine(SqliteSnapshotStore::new(file.path()).unwrap());
    let left = bootstrap(&engine);
    let right = bootstrap(&engine);
    let coordinator = Arc::new(UpdateCoordinator::new(engine));

    let mut handles = Vec::new();
    for (parent, label) in [(left, "a"), (right, "b"), (left, "c"), (right, "d")] {
        let coordinator = Arc::clone(&coordinator);
        handles.push(tokio::spawn(async move {
            coordinator
                .submit(parent, labelled(label), &CancelFlag::new())
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let store = coordinator.engine().store();
    assert_eq!(store.children(left).unwrap().len(), 2);
    assert_eq!(store.children(right).unwrap().len(), 2);
    assert_eq!(store.len().unwrap(), 6);
}

#[tokio::test]
async fn test_coordinated_fork() {
    let engine = engine(MemorySnapshotStore::new());
    let root = bootstrap(&engine);
    let coordinator = UpdateCoordinator::new(engine);

    let branch = coordinator
        .fork(root, "what if", labelled("smoke"), &CancelFlag::new())
        .await
        .unwrap();
    assert!(matches!(branch.kind(), SnapshotKind::Counterfactual { label } if label == "what if"));
}
