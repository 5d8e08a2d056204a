//! Temporal solver configuration

use serde::{Deserialize, Serialize};

/// Configuration for prior construction and belief propagation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Bins in the shared timeline grid
    pub grid_bins: usize,

    /// Padding added on both sides of the grid, as a fraction of its span
    pub padding_fraction: f64,

    /// Weight of the previous belief in each damped update
    pub damping: f64,

    /// Convergence tolerance on the maximum total-variation shift
    pub tolerance: f64,

    /// Iteration cap per component
    pub max_iterations: usize,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            grid_bins: 256,
            padding_fraction: 0.1,
            damping: 0.5,
            tolerance: 1e-4,
            max_iterations: 200,
        }
    }
}

impl TemporalConfig {
    /// Create a fast configuration (coarser grid, looser tolerance)
    pub fn fast() -> Self {
        Self {
            grid_bins: 64,
            tolerance: 1e-3,
            max_iterations: 50,
            ..Self::default()
        }
    }

    /// Create a precise configuration (finer grid, tighter tolerance)
    pub fn precise() -> Self {
        Self {
            grid_bins: 1024,
            tolerance: 1e-6,
            max_iterations: 1000,
            ..Self::default()
        }
    }

    /// Validate ranges
    pub fn validate(&self) -> Result<(), String> {
        if self.grid_bins < 2 {
            return Err(format!("grid_bins must be at least 2, got {}", self.grid_bins));
        }
        if !(self.padding_fraction >= 0.0) {
            return Err("padding_fraction must be non-negative".to_string());
        }
        if !(0.0..1.0).contains(&self.damping) {
            return Err(format!("damping must be in [0, 1), got {}", self.damping));
        }
        if !(self.tolerance > 0.0) {
            return Err("tolerance must be positive".to_string());
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be at least 1".to_string());
        }
        Ok(())
    }
}
