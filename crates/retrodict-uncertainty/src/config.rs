//! Uncertainty propagation configuration

use retrodict_domain::ConfidenceBands;
use serde::{Deserialize, Serialize};

/// Configuration for confidence propagation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UncertaintyConfig {
    /// Score bands for the categorical label
    pub bands: ConfidenceBands,

    /// Probability mass of the credible interval
    pub credible_level: f64,
}

impl Default for UncertaintyConfig {
    fn default() -> Self {
        Self {
            bands: ConfidenceBands::default(),
            credible_level: 0.95,
        }
    }
}

impl UncertaintyConfig {
    /// Validate ranges
    pub fn validate(&self) -> Result<(), String> {
        self.bands.validate()?;
        if !(self.credible_level > 0.0 && self.credible_level < 1.0) {
            return Err(format!(
                "credible_level must be in (0, 1), got {}",
                self.credible_level
            ));
        }
        Ok(())
    }
}
