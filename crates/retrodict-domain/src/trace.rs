//! Trace module - immutable units of present-day evidence

use crate::{DomainError, ProvenanceEntry, TimeEstimate, TraceId};
use serde::{Deserialize, Serialize};

/// Physical form a trace was recovered from
///
/// Each substrate carries a reliability used by the evidence-strength
/// computation; that is the only behaviour that varies by substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstrateType {
    /// Stratigraphy, destruction layers, material remains
    Physical,
    /// DNA, bones, pollen of living systems
    Biological,
    /// Texts, art, oral tradition
    Cultural,
    /// Artifacts, tools, code
    Technological,
    /// Ledgers, prices, trade records
    Economic,
    /// Climate proxies, ice cores, sediment
    Planetary,
}

impl SubstrateType {
    /// All substrates
    pub const ALL: [SubstrateType; 6] = [
        SubstrateType::Physical,
        SubstrateType::Biological,
        SubstrateType::Cultural,
        SubstrateType::Technological,
        SubstrateType::Economic,
        SubstrateType::Planetary,
    ];

    /// Reliability multiplier in (0, 1]
    ///
    /// Cultural records are most exposed to authorial bias, physical and
    /// planetary proxies least.
    pub fn reliability(&self) -> f64 {
        match self {
            SubstrateType::Physical | SubstrateType::Planetary => 1.0,
            SubstrateType::Biological | SubstrateType::Technological => 0.95,
            SubstrateType::Economic => 0.9,
            SubstrateType::Cultural => 0.85,
        }
    }

    /// Get the substrate name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SubstrateType::Physical => "physical",
            SubstrateType::Biological => "biological",
            SubstrateType::Cultural => "cultural",
            SubstrateType::Technological => "technological",
            SubstrateType::Economic => "economic",
            SubstrateType::Planetary => "planetary",
        }
    }

    /// Parse a substrate from its name
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s.to_lowercase())
    }
}

/// Immutable evidentiary record supplied by the trace normalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Identifier assigned by the normalizer
    pub id: TraceId,
    /// Physical form of the evidence
    pub substrate_type: SubstrateType,
    /// Opaque normalized content
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Where the trace came from
    pub provenance: ProvenanceEntry,
    /// Dating of what the trace observes
    pub observed_at_uncertainty: TimeEstimate,
    /// Quality in [0, 1]
    pub quality_score: f64,
}

impl Trace {
    /// Create a trace with an empty payload
    pub fn new(
        id: impl Into<TraceId>,
        substrate_type: SubstrateType,
        provenance: ProvenanceEntry,
        observed_at_uncertainty: TimeEstimate,
        quality_score: f64,
    ) -> Self {
        Self {
            id: id.into(),
            substrate_type,
            payload: serde_json::Value::Null,
            provenance,
            observed_at_uncertainty,
            quality_score,
        }
    }

    /// Attach a payload
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Check required fields and ranges
    pub fn validate(&self) -> Result<(), DomainError> {
        let malformed = |issue: String| DomainError::MalformedTrace {
            trace: self.id.to_string(),
            issue,
        };

        if self.id.as_str().trim().is_empty() {
            return Err(malformed("id is empty".to_string()));
        }
        if !self.quality_score.is_finite() || !(0.0..=1.0).contains(&self.quality_score) {
            return Err(malformed(format!(
                "quality_score {} is outside [0, 1]",
                self.quality_score
            )));
        }
        if self.provenance.source.trim().is_empty() {
            return Err(malformed("provenance source is empty".to_string()));
        }
        self.observed_at_uncertainty
            .validate()
            .map_err(|e| malformed(e.to_string()))
    }
}
