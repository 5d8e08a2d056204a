//! Gatekeeper configuration

use retrodict_domain::ConfidenceBands;
use serde::{Deserialize, Serialize};

/// Configuration for admission rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum aggregate strength for admission
    pub min_strength: f64,

    /// Score bands for VERIFIED / PLAUSIBLE
    pub bands: ConfidenceBands,

    /// Traces required by the triangulation rule
    pub triangulation_min_traces: usize,

    /// Distinct substrate types required by the triangulation rule
    pub triangulation_min_substrates: usize,

    /// Treat causal claims between nodes on different layers as cross-layer
    /// even when the template declares local significance
    pub derive_cross_layer: bool,

    /// Two strengths closer than this are a tie
    pub tie_epsilon: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_strength: 0.3,
            bands: ConfidenceBands::default(),
            triangulation_min_traces: 3,
            triangulation_min_substrates: 2,
            derive_cross_layer: true,
            tie_epsilon: 1e-9,
        }
    }
}

impl ValidationConfig {
    /// Create a permissive configuration (low admission threshold)
    pub fn permissive() -> Self {
        Self {
            min_strength: 0.1,
            ..Self::default()
        }
    }

    /// Create a strict configuration (higher thresholds, wider triangulation)
    pub fn strict() -> Self {
        Self {
            min_strength: 0.5,
            bands: ConfidenceBands {
                verified: 0.9,
                plausible: 0.6,
            },
            triangulation_min_traces: 4,
            triangulation_min_substrates: 3,
            derive_cross_layer: true,
            tie_epsilon: 1e-9,
        }
    }

    /// Validate ranges
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.min_strength) {
            return Err(format!("min_strength must be in [0, 1], got {}", self.min_strength));
        }
        self.bands.validate()?;
        if self.triangulation_min_traces == 0 || self.triangulation_min_substrates == 0 {
            return Err("triangulation thresholds must be at least 1".to_string());
        }
        if self.triangulation_min_substrates > self.triangulation_min_traces {
            return Err(format!(
                "triangulation needs {} substrates but only {} traces",
                self.triangulation_min_substrates, self.triangulation_min_traces
            ));
        }
        if !(self.tie_epsilon >= 0.0) {
            return Err("tie_epsilon must be non-negative".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ValidationConfig::default();
        assert_eq!(config.min_strength, 0.3);
        assert_eq!(config.triangulation_min_traces, 3);
        assert_eq!(config.triangulation_min_substrates, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_permissive_config() {
        let config = ValidationConfig::permissive();
        assert!(config.min_strength < ValidationConfig::default().min_strength);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strict_config() {
        let config = ValidationConfig::strict();
        assert_eq!(config.bands.verified, 0.9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_triangulation() {
        let config = ValidationConfig {
            triangulation_min_traces: 1,
            triangulation_min_substrates: 2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
