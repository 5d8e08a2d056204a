//! Confidence module - categorical levels, score bands and intervals

use crate::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorical confidence label
///
/// Ordered: `Speculative < Plausible < Verified`, so `min` picks the weaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    /// Weakly supported
    Speculative,
    /// Moderately supported
    Plausible,
    /// Strongly supported and triangulated
    Verified,
}

impl ConfidenceLevel {
    /// Get the level name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Speculative => "SPECULATIVE",
            ConfidenceLevel::Plausible => "PLAUSIBLE",
            ConfidenceLevel::Verified => "VERIFIED",
        }
    }

    /// Parse a level from a string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SPECULATIVE" => Some(ConfidenceLevel::Speculative),
            "PLAUSIBLE" => Some(ConfidenceLevel::Plausible),
            "VERIFIED" => Some(ConfidenceLevel::Verified),
            _ => None,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConfidenceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid confidence level: {}", s))
    }
}

/// Score thresholds mapping a confidence score to a level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceBands {
    /// Minimum score for VERIFIED
    pub verified: f64,
    /// Minimum score for PLAUSIBLE
    pub plausible: f64,
}

impl Default for ConfidenceBands {
    fn default() -> Self {
        Self {
            verified: 0.85,
            plausible: 0.5,
        }
    }
}

impl ConfidenceBands {
    /// Level for a score
    pub fn classify(&self, score: f64) -> ConfidenceLevel {
        if score >= self.verified {
            ConfidenceLevel::Verified
        } else if score >= self.plausible {
            ConfidenceLevel::Plausible
        } else {
            ConfidenceLevel::Speculative
        }
    }

    /// Validate band ordering
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.plausible) || !(0.0..=1.0).contains(&self.verified) {
            return Err("confidence bands must be in [0.0, 1.0]".to_string());
        }
        if self.plausible > self.verified {
            return Err(format!(
                "plausible band ({}) must not exceed verified band ({})",
                self.plausible, self.verified
            ));
        }
        Ok(())
    }
}

/// Confidence interval representing [lower, upper] bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound [0.0, 1.0]
    pub lower: f64,
    /// Upper bound [0.0, 1.0]
    pub upper: f64,
}

impl ConfidenceInterval {
    /// Create a new confidence interval, rejecting out-of-range or inverted bounds
    pub fn new(lower: f64, upper: f64) -> Result<Self, DomainError> {
        if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) {
            return Err(DomainError::InvalidConfidence(format!(
                "bounds [{}, {}] must lie in [0, 1]",
                lower, upper
            )));
        }
        if lower > upper {
            return Err(DomainError::InvalidConfidence(format!(
                "lower bound {} exceeds upper bound {}",
                lower, upper
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Create an interval, clamping into [0, 1] and swapping inverted bounds
    pub fn clamped(lower: f64, upper: f64) -> Self {
        let lower = if lower.is_finite() { lower.clamp(0.0, 1.0) } else { 0.0 };
        let upper = if upper.is_finite() { upper.clamp(0.0, 1.0) } else { 1.0 };
        Self {
            lower: lower.min(upper),
            upper: upper.max(lower),
        }
    }

    /// Get the midpoint of the interval
    pub fn midpoint(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    /// Get the width of the interval (uncertainty measure)
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Check if the interval contains a value
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}
