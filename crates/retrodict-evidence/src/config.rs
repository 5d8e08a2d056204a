//! Evidence scoring configuration

use serde::{Deserialize, Serialize};

/// Tunable constant: share of a perfect trace's weight one trace can carry (default: 0.5)
pub const PER_TRACE_WEIGHT: f64 = 0.5;

/// Tunable constant: discount per redundant trace of the same substrate (default: 0.5)
pub const REDUNDANCY_DECAY: f64 = 0.5;

/// Tunable constant: weight boost per additional independent substrate (default: 0.1)
pub const DIVERSITY_BOOST: f64 = 0.1;

/// Configuration for evidence-strength pooling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    /// Maximum contribution of one trace, in (0, 1)
    pub per_trace_weight: f64,
    /// Multiplier applied to the k-th trace of an already-seen substrate, as `decay^k`
    pub redundancy_decay: f64,
    /// Fractional weight boost per additional distinct substrate
    pub diversity_boost: f64,
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            per_trace_weight: PER_TRACE_WEIGHT,
            redundancy_decay: REDUNDANCY_DECAY,
            diversity_boost: DIVERSITY_BOOST,
        }
    }
}

impl EvidenceConfig {
    /// Validate ranges
    pub fn validate(&self) -> Result<(), String> {
        if !(self.per_trace_weight > 0.0 && self.per_trace_weight < 1.0) {
            return Err(format!(
                "per_trace_weight must be in (0, 1), got {}",
                self.per_trace_weight
            ));
        }
        if !(0.0..=1.0).contains(&self.redundancy_decay) {
            return Err(format!(
                "redundancy_decay must be in [0, 1], got {}",
                self.redundancy_decay
            ));
        }
        if !(self.diversity_boost >= 0.0 && self.diversity_boost.is_finite()) {
            return Err(format!(
                "diversity_boost must be non-negative, got {}",
                self.diversity_boost
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EvidenceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_per_trace_weight_must_be_below_one() {
        let config = EvidenceConfig {
            per_trace_weight: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
