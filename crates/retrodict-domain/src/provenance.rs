//! Provenance tracking for traces

use serde::{Deserialize, Serialize};

/// Where a trace came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    /// Source identifier (e.g., "lab:oxford-radiocarbon", "excavation:pylos-1952")
    pub source: String,

    /// Timestamp when the normalizer recorded this trace (ms since Unix epoch)
    pub recorded_at: u64,

    /// Optional method or rationale notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,

    /// Source type (e.g., "laboratory", "archive", "field-survey")
    pub source_type: String,
}

impl ProvenanceEntry {
    /// Create a new provenance entry
    pub fn new(source: impl Into<String>, recorded_at: u64, source_type: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            recorded_at,
            rationale: None,
            source_type: source_type.into(),
        }
    }

    /// Create a provenance entry with rationale
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }
}
