//! Configuration for continual updates
//!
//! Wraps the pipeline configuration with the knobs that only matter when
//! folding batches into an existing history.

use retrodict_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the update engine and coordinator
///
/// # Examples
///
/// ```
/// use retrodict_revision::UpdateConfig;
///
/// let config = UpdateConfig::default();
/// assert_eq!(config.full_recompute_ratio, 0.5);
///
/// // Recompute everything on every update
/// let config = UpdateConfig::strict();
/// assert_eq!(config.full_recompute_ratio, 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Pipeline configuration
    pub engine: EngineConfig,

    /// Fraction of the graph an update may touch before the engine gives up
    /// on incremental recomputation and re-derives everything
    /// Default: 0.5
    pub full_recompute_ratio: f64,

    /// How long a queued update waits for the update ahead of it on the same
    /// parent before failing with a conflict (in milliseconds)
    /// Default: 30 seconds
    pub queue_wait_ms: u64,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            full_recompute_ratio: 0.5,
            queue_wait_ms: 30_000,
        }
    }
}

impl UpdateConfig {
    /// Strict pipeline, always a full recompute, short queue wait
    pub fn strict() -> Self {
        Self {
            engine: EngineConfig::strict(),
            full_recompute_ratio: 0.0,
            queue_wait_ms: 5_000,
        }
    }

    /// Permissive pipeline, incremental wherever possible, long queue wait
    pub fn permissive() -> Self {
        Self {
            engine: EngineConfig::permissive(),
            full_recompute_ratio: 1.0,
            queue_wait_ms: 120_000,
        }
    }

    /// Get the queue wait as Duration
    pub fn queue_wait(&self) -> Duration {
        Duration::from_millis(self.queue_wait_ms)
    }

    /// Validate ranges, including the wrapped pipeline configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.full_recompute_ratio) {
            return Err(format!(
                "full_recompute_ratio must be in [0, 1], got {}",
                self.full_recompute_ratio
            ));
        }
        if self.queue_wait_ms == 0 {
            return Err("queue_wait_ms must be positive".to_string());
        }
        self.engine.validate()
    }
}
