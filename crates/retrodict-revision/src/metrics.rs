//! Metrics collection for continual updates

use retrodict_domain::SnapshotKind;
use serde::Serialize;

/// Counters collected across published snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateMetrics {
    /// Initial snapshots published
    pub bootstraps: usize,

    /// Plain updates published
    pub updates: usize,

    /// Updates published as revisions
    pub revisions: usize,

    /// Counterfactual branches published
    pub counterfactuals: usize,

    /// VERIFIED claims whose confidence changed
    pub revised_claims: usize,

    /// Runs that fell back to a full recompute
    pub full_recomputes: usize,

    /// Updates refused because their parent was busy
    pub conflicts: usize,

    /// Updates that failed inside the pipeline
    pub failures: usize,

    /// Total time spent in the pipeline (in milliseconds)
    pub total_runtime_ms: u64,
}

impl UpdateMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a published snapshot
    pub fn record_publish(&mut self, kind: &SnapshotKind, revised_claims: usize, full: bool) {
        match kind {
            SnapshotKind::Initial => self.bootstraps += 1,
            SnapshotKind::Update => self.updates += 1,
            SnapshotKind::Revision => self.revisions += 1,
            SnapshotKind::Counterfactual { .. } => self.counterfactuals += 1,
        }
        self.revised_claims += revised_claims;
        if full {
            self.full_recomputes += 1;
        }
    }

    /// Record a refused update
    pub fn record_conflict(&mut self) {
        self.conflicts += 1;
    }

    /// Record a failed update
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Get total snapshots published
    pub fn total_published(&self) -> usize {
        self.bootstraps + self.updates + self.revisions + self.counterfactuals
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let mut lines = vec![
            "Update Metrics Summary".to_string(),
            "======================".to_string(),
            format!("Published: {}", self.total_published()),
            format!("  Initial: {}", self.bootstraps),
            format!("  Update: {}", self.updates),
            format!("  Revision: {}", self.revisions),
            format!("  Counterfactual: {}", self.counterfactuals),
            format!("Revised VERIFIED claims: {}", self.revised_claims),
            format!("Full recomputes: {}", self.full_recomputes),
            format!("Total runtime: {}ms", self.total_runtime_ms),
        ];
        if self.conflicts > 0 {
            lines.push(format!("Conflicts: {}", self.conflicts));
        }
        if self.failures > 0 {
            lines.push(format!("Failures: {}", self.failures));
        }
        lines.join("\n")
    }
}
