//! Calibration of confidence levels against known outcomes
//!
//! Given claims whose truth is later established, checks that each level
//! earns its label: VERIFIED claims should be right at least 95% of the
//! time, PLAUSIBLE at least 70%. SPECULATIVE carries no accuracy target.

use retrodict_domain::{Claim, ClaimId, ConfidenceLevel};
use serde::Serialize;
use std::collections::BTreeMap;

/// Minimum accuracy a level must reach
pub fn accuracy_target(level: ConfidenceLevel) -> f64 {
    match level {
        ConfidenceLevel::Verified => 0.95,
        ConfidenceLevel::Plausible => 0.70,
        ConfidenceLevel::Speculative => 0.0,
    }
}

/// Outcome tally for one level
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelAccuracy {
    /// Claims at this level with a known outcome
    pub evaluated: usize,
    /// Of those, how many were right
    pub correct: usize,
    /// `correct / evaluated`; `None` with no data
    pub accuracy: Option<f64>,
    /// Target for the level
    pub target: f64,
    /// Whether the target is met; `None` with no data
    pub passed: Option<bool>,
}

impl LevelAccuracy {
    fn new(level: ConfidenceLevel, evaluated: usize, correct: usize) -> Self {
        let target = accuracy_target(level);
        let accuracy = (evaluated > 0).then(|| correct as f64 / evaluated as f64);
        Self {
            evaluated,
            correct,
            accuracy,
            target,
            passed: accuracy.map(|a| a >= target),
        }
    }
}

/// Accuracy of each confidence level over a labelled claim set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationReport {
    /// Per-level tallies
    pub levels: BTreeMap<ConfidenceLevel, LevelAccuracy>,
    /// Every level with data met its target
    pub overall_calibrated: bool,
    /// VERIFIED claims that turned out wrong
    pub overconfident: Vec<ClaimId>,
    /// SPECULATIVE claims that turned out right
    pub underconfident: Vec<ClaimId>,
    /// Outcomes naming no known claim
    pub unmatched: usize,
}

impl CalibrationReport {
    /// Score `claims` against `outcomes` (claim id -> was it true)
    pub fn evaluate<'a, I>(claims: I, outcomes: &BTreeMap<ClaimId, bool>) -> Self
    where
        I: IntoIterator<Item = &'a Claim>,
    {
        let mut tally: BTreeMap<ConfidenceLevel, (usize, usize)> = BTreeMap::new();
        let mut overconfident = Vec::new();
        let mut underconfident = Vec::new();
        let mut matched = 0usize;

        for claim in claims {
            let Some(&truth) = outcomes.get(&claim.id) else {
                continue;
            };
            matched += 1;
            let entry = tally.entry(claim.confidence_level).or_default();
            entry.0 += 1;
            if truth {
                entry.1 += 1;
            }
            match (claim.confidence_level, truth) {
                (ConfidenceLevel::Verified, false) => overconfident.push(claim.id),
                (ConfidenceLevel::Speculative, true) => underconfident.push(claim.id),
                _ => {}
            }
        }

        let levels: BTreeMap<ConfidenceLevel, LevelAccuracy> = [
            ConfidenceLevel::Verified,
            ConfidenceLevel::Plausible,
            ConfidenceLevel::Speculative,
        ]
        .into_iter()
        .map(|level| {
            let (evaluated, correct) = tally.get(&level).copied().unwrap_or_default();
            (level, LevelAccuracy::new(level, evaluated, correct))
        })
        .collect();
        let overall_calibrated = levels.values().all(|l| l.passed != Some(false));

        let report = Self {
            levels,
            overall_calibrated,
            overconfident,
            underconfident,
            unmatched: outcomes.len().saturating_sub(matched),
        };
        tracing::info!("Calibration: {}", report.summary());
        report
    }

    /// Tally for a level
    pub fn level(&self, level: ConfidenceLevel) -> &LevelAccuracy {
        // every level is inserted by evaluate
        &self.levels[&level]
    }

    /// Get a summary string
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .levels
            .iter()
            .rev()
            .map(|(level, acc)| match acc.accuracy {
                Some(a) => format!("{} {:.0}% of {}", level, a * 100.0, acc.evaluated),
                None => format!("{} NO_DATA", level),
            })
            .collect();
        format!(
            "{}; {} overconfident, {} underconfident; {}",
            parts.join(", "),
            self.overconfident.len(),
            self.underconfident.len(),
            if self.overall_calibrated {
                "calibrated"
            } else {
                "miscalibrated"
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrodict_domain::{
        Assertion, ClaimStatus, ConfidenceBands, EntityId, Layer, Significance, TraceId,
    };

    fn claim(score: f64) -> Claim {
        let entity = EntityId::new(format!("e{}", score));
        Claim {
            id: ClaimId::new(),
            label: entity.to_string(),
            assertion: Assertion::EntityExists {
                entity,
                layer: Layer::L1,
                kind: "site".into(),
            },
            significance: Significance::Local,
            supporting_traces: [TraceId::new("t")].into_iter().collect(),
            distinct_substrates: 1,
            strength: score,
            confidence_score: score,
            confidence_level: ConfidenceBands::default().classify(score),
            status: ClaimStatus::Active,
            supersedes: None,
            contested: false,
        }
    }

    #[test]
    fn test_levels_without_outcomes_report_no_data() {
        let claims = vec![claim(0.97), claim(0.5)];
        let outcomes = BTreeMap::from([(claims[0].id, true)]);
        let report = CalibrationReport::evaluate(&claims, &outcomes);

        let verified = report.level(ConfidenceLevel::Verified);
        assert_eq!(verified.evaluated, 1);
        assert_eq!(verified.passed, Some(true));
        assert_eq!(report.level(ConfidenceLevel::Plausible).accuracy, None);
        assert!(report.overall_calibrated);
        assert!(report.summary().contains("NO_DATA"));
    }

    #[test]
    fn test_wrong_verified_claim_is_overconfident() {
        let claims = vec![claim(0.96), claim(0.97), claim(0.2)];
        let outcomes = BTreeMap::from([
            (claims[0].id, true),
            (claims[1].id, false),
            (claims[2].id, true),
            (ClaimId::new(), true),
        ]);
        let report = CalibrationReport::evaluate(&claims, &outcomes);

        assert_eq!(report.overconfident, vec![claims[1].id]);
        assert_eq!(report.underconfident, vec![claims[2].id]);
        assert_eq!(report.level(ConfidenceLevel::Verified).accuracy, Some(0.5));
        assert!(!report.overall_calibrated);
        assert_eq!(report.unmatched, 1);
        // speculative has no floor to miss
        assert_eq!(report.level(ConfidenceLevel::Speculative).passed, Some(true));
    }
}
