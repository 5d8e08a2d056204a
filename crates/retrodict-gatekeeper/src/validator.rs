//! Claim admission logic

use crate::{ClaimLedger, GatekeeperError, ValidationConfig};
use rayon::prelude::*;
use retrodict_domain::{
    AdmissionDecision, Assertion, AssertionKey, AuditEvent, Claim, ClaimId, ClaimStatus,
    ConfidenceLevel, EvidenceSummary, Flag, FlagSubject, GapType, ReasonCode, Significance,
    TraceId, TriangulationCheck, VoidReason, VoidRecord,
};
use retrodict_evidence::{EvidenceGraph, ScoredCandidate};
use std::collections::BTreeSet;

/// Outcome for one candidate
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateOutcome {
    /// Candidate position in the evidence graph
    pub index: usize,
    /// Candidate label
    pub label: String,
    /// Decision
    pub decision: AdmissionDecision,
    /// Claim created, merged into or matched
    pub claim: Option<ClaimId>,
    /// Rejection reasons (if any)
    pub reasons: Vec<ReasonCode>,
}

/// Result of admitting one batch of candidates
#[derive(Debug, Clone, Default)]
pub struct AdmissionReport {
    /// One outcome per candidate, in candidate order
    pub outcomes: Vec<CandidateOutcome>,
    /// Existing claims superseded during this batch
    pub superseded: Vec<ClaimId>,
    /// Gaps left by rejected or superseded claims
    pub voids: Vec<VoidRecord>,
    /// Non-fatal findings
    pub flags: Vec<Flag>,
    /// Audit events, in commit order
    pub audit: Vec<AuditEvent>,
}

impl AdmissionReport {
    /// Outcome for a candidate index
    pub fn outcome(&self, index: usize) -> Option<&CandidateOutcome> {
        self.outcomes.iter().find(|o| o.index == index)
    }

    /// Claims created by this batch that are in force
    pub fn admitted(&self) -> impl Iterator<Item = ClaimId> + '_ {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.decision, AdmissionDecision::Admitted | AdmissionDecision::Merged))
            .filter_map(|o| o.claim)
    }

    /// Number of candidates with a decision
    pub fn count(&self, decision: AdmissionDecision) -> usize {
        self.outcomes.iter().filter(|o| o.decision == decision).count()
    }

    /// Get a summary string
    pub fn summary(&self) -> String {
        format!(
            "{} candidates: {} admitted, {} merged, {} duplicate, {} outranked, {} rejected, {} superseded",
            self.outcomes.len(),
            self.count(AdmissionDecision::Admitted),
            self.count(AdmissionDecision::Merged),
            self.count(AdmissionDecision::Duplicate),
            self.count(AdmissionDecision::Outranked),
            self.count(AdmissionDecision::Rejected),
            self.superseded.len(),
        )
    }
}

/// Evidence-level assessment, computed in parallel against a read-only ledger
struct Assessment<'g> {
    candidate: &'g ScoredCandidate,
    significance: Significance,
    triangulation: TriangulationCheck,
    dependency_cap: f64,
    reasons: Vec<ReasonCode>,
    details: Vec<String>,
}

/// The Gatekeeper admits candidate claims into the ledger
pub struct Gatekeeper {
    config: ValidationConfig,
}

impl Gatekeeper {
    /// Create a new Gatekeeper with the given configuration
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Create a Gatekeeper after validating the configuration
    pub fn try_new(config: ValidationConfig) -> Result<Self, GatekeeperError> {
        config.validate().map_err(GatekeeperError::Config)?;
        Ok(Self::new(config))
    }

    /// Create a Gatekeeper with default configuration
    pub fn default_config() -> Self {
        Self::new(ValidationConfig::default())
    }

    /// Active configuration
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Admit every candidate of an evidence graph into the ledger
    ///
    /// Candidates are processed in three phases (existence, then attributes
    /// and timing, then causal links) so dependencies are settled first.
    /// Within a phase candidates are assessed in parallel and committed
    /// sequentially in input order; conflict resolution only happens at
    /// commit time.
    pub fn admit(&self, graph: &EvidenceGraph<'_>, ledger: &mut ClaimLedger) -> AdmissionReport {
        let mut report = AdmissionReport::default();

        for phase in 0..=2u8 {
            let batch: Vec<&ScoredCandidate> = graph
                .candidates()
                .iter()
                .filter(|c| c.template.assertion.commit_phase() == phase)
                .collect();
            if batch.is_empty() {
                continue;
            }

            let assessments: Vec<Assessment<'_>> = {
                let snapshot: &ClaimLedger = ledger;
                batch.par_iter().map(|c| self.assess(*c, snapshot)).collect()
            };

            for assessment in assessments {
                self.commit(assessment, graph, ledger, &mut report);
            }
        }

        report.outcomes.sort_by_key(|o| o.index);
        tracing::info!("Admission: {}", report.summary());
        report
    }

    fn assess<'g>(&self, candidate: &'g ScoredCandidate, ledger: &ClaimLedger) -> Assessment<'g> {
        let assertion = &candidate.template.assertion;
        let evidence = &candidate.evidence;
        let mut reasons = Vec::new();
        let mut details = Vec::new();

        // 1. Dependencies must be established
        let mut dependency_cap: f64 = 1.0;
        for node in assertion.dependencies() {
            match ledger.node_score(&node) {
                Some(score) => dependency_cap = dependency_cap.min(score),
                None => {
                    push_reason(&mut reasons, ReasonCode::InsufficientEvidence);
                    details.push(format!("{} is not established", node));
                    dependency_cap = 0.0;
                }
            }
        }

        // 2. Strength threshold
        if evidence.trace_count() == 0 {
            push_reason(&mut reasons, ReasonCode::InsufficientEvidence);
            details.push("no supporting traces in the pool".to_string());
        } else if evidence.strength < self.config.min_strength {
            push_reason(&mut reasons, ReasonCode::InsufficientEvidence);
            details.push(format!(
                "strength {:.3} below minimum {:.3}",
                evidence.strength, self.config.min_strength
            ));
        }

        // 3. Triangulation
        let significance = self.significance(candidate, ledger);
        let triangulation = self.triangulation(significance, evidence);
        if !triangulation.passed() {
            push_reason(&mut reasons, ReasonCode::TriangulationViolation);
            details.push(format!(
                "{:?} significance needs {} traces from {} substrates, got {} from {}",
                significance,
                triangulation.min_traces,
                triangulation.min_substrates,
                triangulation.trace_count,
                triangulation.distinct_substrates
            ));
        }

        Assessment {
            candidate,
            significance,
            triangulation,
            dependency_cap,
            reasons,
            details,
        }
    }

    /// Declared significance, upgraded to cross-layer for causal links between layers
    fn significance(&self, candidate: &ScoredCandidate, ledger: &ClaimLedger) -> Significance {
        let declared = candidate.template.significance;
        if declared != Significance::Local || !self.config.derive_cross_layer {
            return declared;
        }
        if let Assertion::Causal { cause, effect, .. } = &candidate.template.assertion {
            if let (Some(a), Some(b)) = (ledger.node_layer(cause), ledger.node_layer(effect)) {
                if a != b {
                    return Significance::CrossLayer;
                }
            }
        }
        declared
    }

    fn triangulation(&self, significance: Significance, evidence: &EvidenceSummary) -> TriangulationCheck {
        TriangulationCheck {
            required: significance.requires_triangulation(),
            trace_count: evidence.trace_count(),
            distinct_substrates: evidence.distinct_substrates,
            min_traces: self.config.triangulation_min_traces,
            min_substrates: self.config.triangulation_min_substrates,
        }
    }

    fn commit(
        &self,
        assessment: Assessment<'_>,
        graph: &EvidenceGraph<'_>,
        ledger: &mut ClaimLedger,
        report: &mut AdmissionReport,
    ) {
        let candidate = assessment.candidate;
        let assertion = &candidate.template.assertion;
        let key = assertion.key();

        if !assessment.reasons.is_empty() {
            let detail = assessment.details.join("; ");
            self.reject(&assessment, key, assessment.reasons.clone(), detail, report);
            return;
        }

        let active: Vec<Claim> = ledger.active_for_key(&key).into_iter().cloned().collect();
        let (compatible, incompatible): (Vec<Claim>, Vec<Claim>) =
            active.into_iter().partition(|c| c.assertion.compatible_with(assertion));

        let strength = candidate.evidence.strength;
        let eps = self.config.tie_epsilon;

        // Contradiction: the strongest incompatible claim decides
        if let Some(rival) = incompatible.iter().max_by(|x, y| x.strength.total_cmp(&y.strength)) {
            if strength + eps < rival.strength {
                if rival.confidence_level == ConfidenceLevel::Verified {
                    let detail = format!(
                        "contradicts VERIFIED claim {} (strength {:.3} < {:.3})",
                        rival.id, strength, rival.strength
                    );
                    self.reject(
                        &assessment,
                        key,
                        vec![ReasonCode::ContradictionDetected],
                        detail,
                        report,
                    );
                } else {
                    self.record_outranked(&assessment, key, rival, ledger, report);
                }
                return;
            }
        }
        let (weaker, tied): (Vec<Claim>, Vec<Claim>) = incompatible
            .into_iter()
            .partition(|c| strength > c.strength + eps);

        // Compatible path: duplicate, merge, or fresh admission
        let incumbent = compatible
            .iter()
            .max_by(|x, y| x.confidence_score.total_cmp(&y.confidence_score));
        let linked = candidate.linked_traces();

        let (claim, decision, evidence) = match incumbent {
            Some(incumbent) if linked.is_subset(&incumbent.supporting_traces) => {
                report.audit.push(AuditEvent::Admission {
                    label: candidate.template.label.clone(),
                    key,
                    decision: AdmissionDecision::Duplicate,
                    claim: Some(incumbent.id),
                    evidence: candidate.evidence.clone(),
                    triangulation: assessment.triangulation,
                    confidence_score: incumbent.confidence_score,
                    reasons: vec![],
                    flags: vec![],
                    superseded: None,
                    detail: String::new(),
                });
                report.outcomes.push(CandidateOutcome {
                    index: candidate.index,
                    label: candidate.template.label.clone(),
                    decision: AdmissionDecision::Duplicate,
                    claim: Some(incumbent.id),
                    reasons: vec![],
                });
                return;
            }
            Some(incumbent) => {
                let union: BTreeSet<TraceId> =
                    incumbent.supporting_traces.union(&linked).cloned().collect();
                let merged = graph.score(&union);
                let assertion = merge_assertions(incumbent, assertion, strength);
                let claim = self.build_claim(
                    &candidate.template.label,
                    assertion,
                    assessment.significance,
                    &merged,
                    assessment.dependency_cap,
                    Some(incumbent.id),
                );
                ledger.supersede(incumbent.id, claim.0.id);
                report.superseded.push(incumbent.id);
                (claim, AdmissionDecision::Merged, merged)
            }
            None => {
                let claim = self.build_claim(
                    &candidate.template.label,
                    assertion.clone(),
                    assessment.significance,
                    &candidate.evidence,
                    assessment.dependency_cap,
                    weaker.first().map(|c| c.id),
                );
                (claim, AdmissionDecision::Admitted, candidate.evidence.clone())
            }
        };
        let (mut claim, capped) = claim;
        let claim_id = claim.id;
        let mut flags = Vec::new();

        if capped {
            flags.push(ReasonCode::TriangulationViolation);
            report.flags.push(Flag {
                subject: FlagSubject::Claim { claim: claim_id },
                reason: ReasonCode::TriangulationViolation,
                detail: format!(
                    "score {:.3} is in the VERIFIED band but the claim is not triangulated; capped to PLAUSIBLE",
                    claim.confidence_score
                ),
            });
        }

        // Stronger candidate supersedes weaker incompatible claims
        for loser in &weaker {
            ledger.supersede(loser.id, claim_id);
            report.superseded.push(loser.id);
            push_reason(&mut flags, ReasonCode::ContradictionDetected);
            report.voids.push(VoidRecord {
                label: loser.label.clone(),
                key: key.clone(),
                reason: VoidReason::Superseded { by: claim_id },
                gap: gap_for(&loser.assertion),
                evidence: graph.score(&loser.supporting_traces),
                claim: Some(loser.id),
                detail: format!(
                    "outranked by '{}' (strength {:.3} > {:.3})",
                    candidate.template.label, strength, loser.strength
                ),
            });
        }

        // Ties are reported, not resolved
        if !tied.is_empty() {
            claim.contested = true;
            push_reason(&mut flags, ReasonCode::ContradictionDetected);
            for rival in &tied {
                ledger.mark_contested(rival.id);
                report.flags.push(Flag {
                    subject: FlagSubject::Claim { claim: rival.id },
                    reason: ReasonCode::ContradictionDetected,
                    detail: format!("tied with claim {} at strength {:.3}", claim_id, strength),
                });
            }
            report.flags.push(Flag {
                subject: FlagSubject::Claim { claim: claim_id },
                reason: ReasonCode::ContradictionDetected,
                detail: format!("tied with {} incompatible claim(s)", tied.len()),
            });
        }

        let triangulation = self.triangulation(assessment.significance, &evidence);
        report.audit.push(AuditEvent::Admission {
            label: candidate.template.label.clone(),
            key,
            decision,
            claim: Some(claim_id),
            evidence,
            triangulation,
            confidence_score: claim.confidence_score,
            reasons: vec![],
            flags,
            superseded: claim.supersedes,
            detail: String::new(),
        });
        report.outcomes.push(CandidateOutcome {
            index: candidate.index,
            label: candidate.template.label.clone(),
            decision,
            claim: Some(claim_id),
            reasons: vec![],
        });
        tracing::debug!(
            "Admitted '{}' as {} ({:.3})",
            claim.label,
            claim.confidence_level,
            claim.confidence_score
        );
        ledger.push(claim);
    }

    /// Record a losing candidate as an already-superseded claim
    fn record_outranked(
        &self,
        assessment: &Assessment<'_>,
        key: AssertionKey,
        rival: &Claim,
        ledger: &mut ClaimLedger,
        report: &mut AdmissionReport,
    ) {
        let candidate = assessment.candidate;
        let (mut claim, _) = self.build_claim(
            &candidate.template.label,
            candidate.template.assertion.clone(),
            assessment.significance,
            &candidate.evidence,
            assessment.dependency_cap,
            None,
        );
        claim.status = ClaimStatus::Superseded { by: rival.id };
        let claim_id = claim.id;
        let detail = format!(
            "outranked by claim {} (strength {:.3} < {:.3})",
            rival.id, candidate.evidence.strength, rival.strength
        );

        report.voids.push(VoidRecord {
            label: candidate.template.label.clone(),
            key: key.clone(),
            reason: VoidReason::Superseded { by: rival.id },
            gap: gap_for(&candidate.template.assertion),
            evidence: candidate.evidence.clone(),
            claim: Some(claim_id),
            detail: detail.clone(),
        });
        report.audit.push(AuditEvent::Admission {
            label: candidate.template.label.clone(),
            key,
            decision: AdmissionDecision::Outranked,
            claim: Some(claim_id),
            evidence: candidate.evidence.clone(),
            triangulation: assessment.triangulation,
            confidence_score: claim.confidence_score,
            reasons: vec![],
            flags: vec![ReasonCode::ContradictionDetected],
            superseded: None,
            detail,
        });
        report.outcomes.push(CandidateOutcome {
            index: candidate.index,
            label: candidate.template.label.clone(),
            decision: AdmissionDecision::Outranked,
            claim: Some(claim_id),
            reasons: vec![],
        });
        ledger.push(claim);
    }

    fn reject(
        &self,
        assessment: &Assessment<'_>,
        key: AssertionKey,
        reasons: Vec<ReasonCode>,
        detail: String,
        report: &mut AdmissionReport,
    ) {
        let candidate = assessment.candidate;
        let code = reasons.first().copied().unwrap_or(ReasonCode::InsufficientEvidence);

        tracing::debug!("Rejected '{}': {} ({})", candidate.template.label, code, detail);

        report.voids.push(VoidRecord {
            label: candidate.template.label.clone(),
            key: key.clone(),
            reason: VoidReason::Rejected {
                code,
                all: reasons.clone(),
            },
            gap: gap_for(&candidate.template.assertion),
            evidence: candidate.evidence.clone(),
            claim: None,
            detail: detail.clone(),
        });
        report.audit.push(AuditEvent::Admission {
            label: candidate.template.label.clone(),
            key,
            decision: AdmissionDecision::Rejected,
            claim: None,
            evidence: candidate.evidence.clone(),
            triangulation: assessment.triangulation,
            confidence_score: candidate.evidence.strength.min(assessment.dependency_cap),
            reasons: reasons.clone(),
            flags: vec![],
            superseded: None,
            detail,
        });
        report.outcomes.push(CandidateOutcome {
            index: candidate.index,
            label: candidate.template.label.clone(),
            decision: AdmissionDecision::Rejected,
            claim: None,
            reasons,
        });
    }

    /// Build a claim; the flag is set when a VERIFIED-band score was capped
    fn build_claim(
        &self,
        label: &str,
        assertion: Assertion,
        significance: Significance,
        evidence: &EvidenceSummary,
        dependency_cap: f64,
        supersedes: Option<ClaimId>,
    ) -> (Claim, bool) {
        let confidence_score = evidence.strength.min(dependency_cap);
        let mut confidence_level = self.config.bands.classify(confidence_score);
        let triangulated = evidence.trace_count() >= self.config.triangulation_min_traces
            && evidence.distinct_substrates >= self.config.triangulation_min_substrates;
        let capped = confidence_level == ConfidenceLevel::Verified && !triangulated;
        if capped {
            confidence_level = ConfidenceLevel::Plausible;
        }

        let claim = Claim {
            id: ClaimId::new(),
            label: label.to_string(),
            assertion,
            significance,
            supporting_traces: evidence.trace_ids().cloned().collect(),
            distinct_substrates: evidence.distinct_substrates,
            strength: evidence.strength,
            confidence_score,
            confidence_level,
            status: ClaimStatus::Active,
            supersedes,
            contested: false,
        };
        (claim, capped)
    }
}

fn push_reason(reasons: &mut Vec<ReasonCode>, reason: ReasonCode) {
    if !reasons.contains(&reason) {
        reasons.push(reason);
    }
}

/// Kind of gap a declined assertion leaves
pub(crate) fn gap_for(assertion: &Assertion) -> GapType {
    match assertion {
        Assertion::Causal { .. } => GapType::Causal,
        Assertion::Timing { .. } => GapType::Temporal,
        Assertion::EntityExists { .. } | Assertion::EventOccurred { .. } | Assertion::Attribute { .. } => {
            GapType::Evidential
        }
    }
}

/// Content of a merged claim: the stronger side's assertion, with event participants unioned
fn merge_assertions(incumbent: &Claim, candidate: &Assertion, candidate_strength: f64) -> Assertion {
    let mut merged = if candidate_strength > incumbent.strength {
        candidate.clone()
    } else {
        incumbent.assertion.clone()
    };
    if let (
        Assertion::EventOccurred { participants, .. },
        Assertion::EventOccurred { participants: a, .. },
        Assertion::EventOccurred { participants: b, .. },
    ) = (&mut merged, &incumbent.assertion, candidate)
    {
        *participants = a.union(b).cloned().collect();
    }
    merged
}
