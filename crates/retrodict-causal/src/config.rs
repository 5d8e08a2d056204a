//! DAG constructor configuration

use serde::{Deserialize, Serialize};

/// Configuration for the causal DAG constructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DagConfig {
    /// Years an effect may appear to precede its cause on a cross-layer
    /// edge before the edge is flagged (indirect or mediated causation)
    pub cross_layer_slack_years: f64,

    /// Lower quantile taken as the effect's earliest plausible time
    pub earliest_quantile: f64,

    /// Upper quantile taken as the cause's latest plausible time
    pub latest_quantile: f64,
}

impl Default for DagConfig {
    fn default() -> Self {
        Self {
            cross_layer_slack_years: 50.0,
            earliest_quantile: 0.05,
            latest_quantile: 0.95,
        }
    }
}

impl DagConfig {
    /// Create a strict configuration (no slack for mediated causation)
    pub fn strict() -> Self {
        Self {
            cross_layer_slack_years: 0.0,
            ..Self::default()
        }
    }

    /// Create a permissive configuration (a century of slack)
    pub fn permissive() -> Self {
        Self {
            cross_layer_slack_years: 100.0,
            ..Self::default()
        }
    }

    /// Validate ranges
    pub fn validate(&self) -> Result<(), String> {
        if !(self.cross_layer_slack_years >= 0.0) || !self.cross_layer_slack_years.is_finite() {
            return Err(format!(
                "cross_layer_slack_years must be a non-negative number, got {}",
                self.cross_layer_slack_years
            ));
        }
        for (name, q) in [
            ("earliest_quantile", self.earliest_quantile),
            ("latest_quantile", self.latest_quantile),
        ] {
            if !(0.0..=1.0).contains(&q) {
                return Err(format!("{} must be in [0, 1], got {}", name, q));
            }
        }
        if self.earliest_quantile > self.latest_quantile {
            return Err("earliest_quantile must not exceed latest_quantile".to_string());
        }
        Ok(())
    }
}
