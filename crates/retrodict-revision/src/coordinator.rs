//! Per-parent serialisation of updates
//!
//! At most one update is in flight per parent version. Later requests
//! against the same parent queue behind it and run in arrival order, each
//! publishing its own child. Updates on different parents run concurrently.

use crate::{ContinualUpdateEngine, UpdateError};
use retrodict_domain::{SnapshotStore, VersionId, WorldModelSnapshot};
use retrodict_engine::{CancelFlag, UpdateBatch};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

enum Job {
    Apply(UpdateBatch),
    Fork { label: String, intervention: UpdateBatch },
}

/// Async front end that queues updates per parent version
///
/// The pipeline runs on tokio's blocking pool; the per-parent gate is a
/// fair tokio mutex, so waiters are served first come, first served.
///
/// # Examples
///
/// ```
/// use retrodict_engine::{CancelFlag, UpdateBatch};
/// use retrodict_revision::{ContinualUpdateEngine, UpdateConfig, UpdateCoordinator};
/// use retrodict_store::MemorySnapshotStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let engine = ContinualUpdateEngine::new(MemorySnapshotStore::new(), UpdateConfig::default())?;
///     let root = engine.bootstrap(Vec::new(), Vec::new(), &CancelFlag::new())?;
///     let coordinator = UpdateCoordinator::new(engine);
///
///     let child = coordinator
///         .submit(root.version(), UpdateBatch::new(), &CancelFlag::new())
///         .await?;
///     assert_eq!(child.parent(), Some(root.version()));
///     Ok(())
/// }
/// ```
pub struct UpdateCoordinator<S> {
    engine: Arc<ContinualUpdateEngine<S>>,
    gates: Mutex<HashMap<VersionId, Arc<AsyncMutex<()>>>>,
}

impl<S> UpdateCoordinator<S>
where
    S: SnapshotStore + 'static,
{
    /// Wrap an engine
    pub fn new(engine: ContinualUpdateEngine<S>) -> Self {
        Self {
            engine: Arc::new(engine),
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Get the wrapped engine
    pub fn engine(&self) -> &ContinualUpdateEngine<S> {
        &self.engine
    }

    /// Apply a batch to `parent`, waiting behind any update already queued
    /// on it
    ///
    /// Fails with [`UpdateError::ConcurrentUpdateConflict`] if the queue does
    /// not clear within the configured wait.
    pub async fn submit(
        &self,
        parent: VersionId,
        batch: UpdateBatch,
        cancel: &CancelFlag,
    ) -> Result<Arc<WorldModelSnapshot>, UpdateError> {
        let guard = self.acquire(parent).await?;
        self.run(parent, Job::Apply(batch), cancel, guard).await
    }

    /// Apply a batch to `parent` only if nothing else is in flight on it
    pub async fn try_submit(
        &self,
        parent: VersionId,
        batch: UpdateBatch,
        cancel: &CancelFlag,
    ) -> Result<Arc<WorldModelSnapshot>, UpdateError> {
        let guard = self
            .gate(parent)
            .try_lock_owned()
            .map_err(|_| self.conflict(parent))?;
        self.run(parent, Job::Apply(batch), cancel, guard).await
    }

    /// Publish a counterfactual branch of `parent`, queued like [`Self::submit`]
    pub async fn fork(
        &self,
        parent: VersionId,
        label: impl Into<String>,
        intervention: UpdateBatch,
        cancel: &CancelFlag,
    ) -> Result<Arc<WorldModelSnapshot>, UpdateError> {
        let guard = self.acquire(parent).await?;
        let job = Job::Fork {
            label: label.into(),
            intervention,
        };
        self.run(parent, job, cancel, guard).await
    }

    async fn acquire(&self, parent: VersionId) -> Result<OwnedMutexGuard<()>, UpdateError> {
        let gate = self.gate(parent);
        let wait = self.engine.config().queue_wait();
        tracing::debug!("Queueing update on {} (wait up to {:?})", parent, wait);
        tokio::time::timeout(wait, gate.lock_owned())
            .await
            .map_err(|_| self.conflict(parent))
    }

    async fn run(
        &self,
        parent: VersionId,
        job: Job,
        cancel: &CancelFlag,
        guard: OwnedMutexGuard<()>,
    ) -> Result<Arc<WorldModelSnapshot>, UpdateError> {
        let engine = Arc::clone(&self.engine);
        let cancel = cancel.clone();
        let joined = tokio::task::spawn_blocking(move || match job {
            Job::Apply(batch) => engine.apply(parent, &batch, &cancel),
            Job::Fork {
                label,
                intervention,
            } => engine.fork(parent, label, &intervention, &cancel),
        })
        .await;

        drop(guard);
        self.release(parent);
        joined.map_err(|e| UpdateError::Worker(e.to_string()))?
    }

    fn gate(&self, parent: VersionId) -> Arc<AsyncMutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(gates.entry(parent).or_default())
    }

    /// Forget the gate once nobody holds or waits on it
    fn release(&self, parent: VersionId) {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        if gates.get(&parent).map_or(false, |g| Arc::strong_count(g) == 1) {
            gates.remove(&parent);
        }
    }

    fn conflict(&self, parent: VersionId) -> UpdateError {
        self.engine.record_conflict();
        tracing::warn!("Update on {} refused: another update is in flight", parent);
        UpdateError::ConcurrentUpdateConflict { parent }
    }
}
