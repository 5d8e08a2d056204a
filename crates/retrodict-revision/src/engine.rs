//! Folding batches into the snapshot history

use crate::{UpdateConfig, UpdateError, UpdateMetrics};
use retrodict_domain::{
    ClaimTemplate, SnapshotKind, SnapshotStore, Trace, VersionId, WorldModelSnapshot,
};
use retrodict_engine::{CancelFlag, Derivation, Reconstructor, UpdateBatch};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

/// Publishes derived snapshots into a store
///
/// Parents are never modified: every call publishes a new version that
/// points back at the one it was derived from. Callers that may race on the
/// same parent go through [`crate::UpdateCoordinator`].
///
/// # Examples
///
/// ```
/// use retrodict_engine::{CancelFlag, UpdateBatch};
/// use retrodict_revision::{ContinualUpdateEngine, UpdateConfig};
/// use retrodict_store::MemorySnapshotStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = ContinualUpdateEngine::new(MemorySnapshotStore::new(), UpdateConfig::default())?;
/// let root = engine.bootstrap(Vec::new(), Vec::new(), &CancelFlag::new())?;
/// let next = engine.apply(root.version(), &UpdateBatch::new(), &CancelFlag::new())?;
/// assert_eq!(next.parent(), Some(root.version()));
/// # Ok(())
/// # }
/// ```
pub struct ContinualUpdateEngine<S> {
    store: S,
    config: UpdateConfig,
    reconstructor: Reconstructor,
    metrics: Mutex<UpdateMetrics>,
}

impl<S: SnapshotStore> ContinualUpdateEngine<S> {
    /// Create an engine over `store` after validating the configuration
    pub fn new(store: S, config: UpdateConfig) -> Result<Self, UpdateError> {
        config.validate().map_err(UpdateError::Config)?;
        let reconstructor = Reconstructor::new(config.engine.clone())?
            .with_full_recompute_ratio(config.full_recompute_ratio);
        Ok(Self {
            store,
            config,
            reconstructor,
            metrics: Mutex::new(UpdateMetrics::new()),
        })
    }

    /// Get the configuration
    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Get the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a copy of the current metrics
    pub fn metrics(&self) -> UpdateMetrics {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Reset metrics counters
    pub fn reset_metrics(&self) {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner).reset();
    }

    /// Reconstruct from scratch and publish the root of a new history
    pub fn bootstrap(
        &self,
        traces: Vec<Trace>,
        templates: Vec<ClaimTemplate>,
        cancel: &CancelFlag,
    ) -> Result<Arc<WorldModelSnapshot>, UpdateError> {
        let start = Instant::now();
        let derivation = self
            .reconstructor
            .reconstruct(traces, templates, cancel)
            .map_err(|e| self.failed(e))?;
        self.publish(None, SnapshotKind::Initial, derivation, start)
    }

    /// Fold a batch into `parent` and publish the result as its child
    ///
    /// The child is a revision when any VERIFIED claim of the parent changed
    /// confidence; the changes are recorded on the snapshot.
    pub fn apply(
        &self,
        parent: VersionId,
        batch: &UpdateBatch,
        cancel: &CancelFlag,
    ) -> Result<Arc<WorldModelSnapshot>, UpdateError> {
        let start = Instant::now();
        let derivation = self.derive(parent, batch, cancel)?;
        let kind = if derivation.revisions.is_empty() {
            SnapshotKind::Update
        } else {
            SnapshotKind::Revision
        };
        self.publish(Some(parent), kind, derivation, start)
    }

    /// Explore an alternative history: apply `intervention` to `parent` and
    /// publish the result as a labelled counterfactual branch
    pub fn fork(
        &self,
        parent: VersionId,
        label: impl Into<String>,
        intervention: &UpdateBatch,
        cancel: &CancelFlag,
    ) -> Result<Arc<WorldModelSnapshot>, UpdateError> {
        let start = Instant::now();
        let derivation = self.derive(parent, intervention, cancel)?;
        let kind = SnapshotKind::Counterfactual {
            label: label.into(),
        };
        self.publish(Some(parent), kind, derivation, start)
    }

    fn derive(
        &self,
        parent: VersionId,
        batch: &UpdateBatch,
        cancel: &CancelFlag,
    ) -> Result<Derivation, UpdateError> {
        let snapshot = self
            .store
            .get(parent)
            .map_err(|e| UpdateError::Store(e.to_string()))?
            .ok_or(UpdateError::UnknownVersion(parent))?;
        self.reconstructor
            .advance(snapshot.content(), batch, cancel)
            .map_err(|e| self.failed(e))
    }

    fn publish(
        &self,
        parent: Option<VersionId>,
        kind: SnapshotKind,
        derivation: Derivation,
        start: Instant,
    ) -> Result<Arc<WorldModelSnapshot>, UpdateError> {
        let Derivation {
            content,
            revisions,
            stats,
        } = derivation;
        let revised = revisions.len();
        let snapshot = WorldModelSnapshot::new(parent, kind.clone(), revisions, content);
        let published = self
            .store
            .publish(snapshot)
            .map_err(|e| UpdateError::Store(e.to_string()))?;

        let mut metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
        metrics.record_publish(&kind, revised, stats.full_recompute);
        metrics.total_runtime_ms += start.elapsed().as_millis() as u64;

        tracing::info!(
            "Published {} ({:?}, parent {:?}): {}",
            published.version(),
            kind,
            parent,
            stats.summary()
        );
        if revised > 0 {
            tracing::warn!(
                "Version {} revises {} VERIFIED claim(s)",
                published.version(),
                revised
            );
        }
        Ok(published)
    }

    fn failed(&self, error: retrodict_engine::EngineError) -> UpdateError {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_failure();
        tracing::warn!("Update failed: {}", error);
        error.into()
    }

    pub(crate) fn record_conflict(&self) {
        self.metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record_conflict();
    }
}
