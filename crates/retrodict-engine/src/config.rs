//! Engine configuration
//!
//! One TOML document with a table per pipeline stage. Every table and every
//! field is optional; missing values take the stage defaults.
//!
//! ```toml
//! [gatekeeper]
//! min_strength = 0.3
//!
//! [temporal]
//! max_iterations = 500
//! ```

use crate::EngineError;
use retrodict_causal::DagConfig;
use retrodict_evidence::EvidenceConfig;
use retrodict_gatekeeper::ValidationConfig;
use retrodict_temporal::TemporalConfig;
use retrodict_uncertainty::UncertaintyConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for every stage of the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Evidence-strength pooling
    pub evidence: EvidenceConfig,
    /// Admission rules
    pub gatekeeper: ValidationConfig,
    /// DAG construction
    pub causal: DagConfig,
    /// Temporal solver
    pub temporal: TemporalConfig,
    /// Confidence propagation
    pub uncertainty: UncertaintyConfig,
}

impl EngineConfig {
    /// Strict preset: stricter admission and no cross-layer slack
    pub fn strict() -> Self {
        Self {
            gatekeeper: ValidationConfig::strict(),
            causal: DagConfig::strict(),
            temporal: TemporalConfig::precise(),
            ..Self::default()
        }
    }

    /// Permissive preset for exploratory runs
    pub fn permissive() -> Self {
        Self {
            gatekeeper: ValidationConfig::permissive(),
            causal: DagConfig::permissive(),
            temporal: TemporalConfig::fast(),
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(source: &str) -> Result<Self, EngineError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate().map_err(EngineError::Config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Serialize to a TOML document
    pub fn to_toml(&self) -> Result<String, EngineError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate every stage, prefixing errors with the table name
    pub fn validate(&self) -> Result<(), String> {
        self.evidence.validate().map_err(|e| format!("[evidence] {}", e))?;
        self.gatekeeper.validate().map_err(|e| format!("[gatekeeper] {}", e))?;
        self.causal.validate().map_err(|e| format!("[causal] {}", e))?;
        self.temporal.validate().map_err(|e| format!("[temporal] {}", e))?;
        self.uncertainty.validate().map_err(|e| format!("[uncertainty] {}", e))?;
        Ok(())
    }
}
