//! Bayesian chronological ordering
//!
//! Each event starts from its prior and is refined by the ordering
//! constraints its causal edges imply (cause before effect). Updates are
//! damped Jacobi sweeps: every event in a component is recomputed from the
//! previous sweep's beliefs, so the result does not depend on visiting
//! order. Disjoint components share no state and are solved in parallel.

use crate::{CancelFlag, TemporalConfig, TemporalError};
use rayon::prelude::*;
use retrodict_causal::CausalGraph;
use retrodict_domain::{AuditEvent, EventId, NodeRef, ReasonCode, TimeDistribution};
use std::collections::{BTreeMap, BTreeSet};

/// Soft ordering constraint: `before` happened before `after`
#[derive(Debug, Clone, PartialEq)]
pub struct OrderingConstraint {
    /// Earlier event (cause)
    pub before: EventId,
    /// Later event (effect)
    pub after: EventId,
    /// Constraint strength in [0, 1] (the causal edge weight)
    pub weight: f64,
}

/// Everything a solve needs
#[derive(Debug, Clone, Default)]
pub struct SolveInput {
    /// Prior per dated event
    pub priors: BTreeMap<EventId, TimeDistribution>,
    /// Ordering constraints between dated events
    pub constraints: Vec<OrderingConstraint>,
    /// Groups of events solved together, each sorted
    pub components: Vec<Vec<EventId>>,
}

impl SolveInput {
    /// Derive constraints and components from a causal graph
    ///
    /// Only event-to-event edges between dated events constrain timing.
    /// With a `scope`, only components containing a scoped node are solved.
    pub fn from_graph(
        graph: &CausalGraph,
        priors: BTreeMap<EventId, TimeDistribution>,
        scope: Option<&BTreeSet<NodeRef>>,
    ) -> Self {
        let constraints = graph
            .edges()
            .into_iter()
            .filter_map(|edge| {
                let before = edge.cause.as_event()?;
                let after = edge.effect.as_event()?;
                if !priors.contains_key(before) || !priors.contains_key(after) {
                    return None;
                }
                Some(OrderingConstraint {
                    before: before.clone(),
                    after: after.clone(),
                    weight: edge.weight.clamp(0.0, 1.0),
                })
            })
            .collect();

        let mut covered: BTreeSet<EventId> = BTreeSet::new();
        let mut components: Vec<Vec<EventId>> = graph
            .components()
            .into_iter()
            .filter(|members| scope.map_or(true, |s| members.iter().any(|m| s.contains(m))))
            .map(|members| {
                members
                    .iter()
                    .filter_map(NodeRef::as_event)
                    .filter(|e| priors.contains_key(*e))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .filter(|events| !events.is_empty())
            .inspect(|events| covered.extend(events.iter().cloned()))
            .collect();

        // Dated events the graph does not know about stand alone
        if scope.is_none() {
            for event in priors.keys() {
                if !covered.contains(event) && !graph.contains(&NodeRef::Event(event.clone())) {
                    components.push(vec![event.clone()]);
                }
            }
        }

        Self {
            priors,
            constraints,
            components,
        }
    }

    /// Events this input will solve
    pub fn events(&self) -> BTreeSet<EventId> {
        self.components.iter().flatten().cloned().collect()
    }
}

/// Convergence record for one component
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentReport {
    /// Events in the component
    pub events: Vec<EventId>,
    /// Sweeps performed
    pub iterations: usize,
    /// Largest total-variation shift in the final sweep
    pub residual: f64,
    /// Whether the shift fell below tolerance before the cap
    pub converged: bool,
}

/// Result of a completed solve
#[derive(Debug, Clone, Default)]
pub struct SolveOutcome {
    /// Posterior per solved event
    pub posteriors: BTreeMap<EventId, TimeDistribution>,
    /// Events whose timing could not be settled
    pub underdetermined: BTreeSet<EventId>,
    /// One record per component, in input order
    pub components: Vec<ComponentReport>,
    /// Audit entries for underdetermined events
    pub audit: Vec<AuditEvent>,
}

impl SolveOutcome {
    /// Summary string
    pub fn summary(&self) -> String {
        let converged = self.components.iter().filter(|c| c.converged).count();
        format!(
            "{} events in {} components ({} converged), {} underdetermined",
            self.posteriors.len(),
            self.components.len(),
            converged,
            self.underdetermined.len()
        )
    }
}

/// Beliefs, events stuck on a zero product, and the convergence record
type ComponentResult = (BTreeMap<EventId, TimeDistribution>, BTreeSet<EventId>, ComponentReport);

/// Temporal solver
pub struct TemporalSolver {
    config: TemporalConfig,
}

impl TemporalSolver {
    /// Create a new solver
    pub fn new(config: TemporalConfig) -> Self {
        Self { config }
    }

    /// Create a solver after validating the configuration
    pub fn try_new(config: TemporalConfig) -> Result<Self, TemporalError> {
        config.validate().map_err(TemporalError::Config)?;
        Ok(Self::new(config))
    }

    /// Create with the default configuration
    pub fn default_config() -> Self {
        Self::new(TemporalConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &TemporalConfig {
        &self.config
    }

    /// Solve every component of the input
    ///
    /// Returns [`TemporalError::Cancelled`] as soon as any component sees the
    /// cancellation signal; no partial result is returned.
    pub fn solve(&self, input: &SolveInput, cancel: &CancelFlag) -> Result<SolveOutcome, TemporalError> {
        if cancel.is_cancelled() {
            return Err(TemporalError::Cancelled { iterations: 0 });
        }
        let grid = input.priors.values().next().map(|p| *p.grid());
        if input.priors.values().any(|p| Some(*p.grid()) != grid) {
            return Err(TemporalError::GridMismatch(
                "priors must share one grid".to_string(),
            ));
        }

        let results = input
            .components
            .par_iter()
            .map(|events| self.solve_component(events, input, cancel))
            .collect::<Result<Vec<_>, _>>()?;

        let mut outcome = SolveOutcome::default();
        for (beliefs, stuck, report) in results {
            for event in &report.events {
                if stuck.contains(event) || !report.converged {
                    outcome.underdetermined.insert(event.clone());
                    outcome.audit.push(AuditEvent::Temporal {
                        event: event.clone(),
                        reason: ReasonCode::TemporalUnderdetermined,
                        iterations: report.iterations,
                        residual: report.residual,
                    });
                }
            }
            outcome.posteriors.extend(beliefs);
            outcome.components.push(report);
        }

        if outcome.underdetermined.is_empty() {
            tracing::info!("Temporal solve: {}", outcome.summary());
        } else {
            tracing::warn!("Temporal solve: {}", outcome.summary());
        }
        Ok(outcome)
    }

    fn solve_component(
        &self,
        events: &[EventId],
        input: &SolveInput,
        cancel: &CancelFlag,
    ) -> Result<ComponentResult, TemporalError> {
        let members: BTreeSet<&EventId> = events.iter().collect();
        let mut beliefs: BTreeMap<EventId, TimeDistribution> = events
            .iter()
            .filter_map(|e| input.priors.get(e).map(|p| (e.clone(), p.clone())))
            .collect();
        let constraints: Vec<&OrderingConstraint> = input
            .constraints
            .iter()
            .filter(|c| members.contains(&c.before) && members.contains(&c.after))
            .collect();

        let mut report = ComponentReport {
            events: events.to_vec(),
            iterations: 0,
            residual: 0.0,
            converged: true,
        };
        let mut stuck = BTreeSet::new();
        if constraints.is_empty() {
            return Ok((beliefs, stuck, report));
        }

        report.converged = false;
        for iteration in 1..=self.config.max_iterations {
            if cancel.is_cancelled() {
                return Err(TemporalError::Cancelled {
                    iterations: iteration - 1,
                });
            }

            // Step 1: Profiles from the previous sweep
            let precedes: BTreeMap<&EventId, Vec<f64>> = beliefs
                .iter()
                .map(|(e, b)| (e, b.precedence_profile()))
                .collect();
            let exceeds: BTreeMap<&EventId, Vec<f64>> = beliefs
                .iter()
                .map(|(e, b)| (e, b.exceedance_profile()))
                .collect();

            // Step 2: Jacobi update of every event
            let mut next = BTreeMap::new();
            let mut shift: f64 = 0.0;
            stuck.clear();
            for (event, belief) in &beliefs {
                let Some(prior) = input.priors.get(event) else {
                    continue;
                };
                let mut mass = prior.mass().to_vec();
                for c in constraints.iter().filter(|c| &c.after == event) {
                    if let Some(profile) = precedes.get(&c.before) {
                        apply_factor(&mut mass, profile, c.weight);
                    }
                }
                for c in constraints.iter().filter(|c| &c.before == event) {
                    if let Some(profile) = exceeds.get(&c.after) {
                        apply_factor(&mut mass, profile, c.weight);
                    }
                }

                let updated = match TimeDistribution::from_mass(*prior.grid(), mass) {
                    Some(posterior) => posterior.blend(belief, self.config.damping),
                    None => {
                        // Constraints exclude every bin
                        stuck.insert(event.clone());
                        belief.clone()
                    }
                };
                shift = shift.max(updated.total_variation(belief));
                next.insert(event.clone(), updated);
            }

            // Step 3: Convergence check
            beliefs = next;
            report.iterations = iteration;
            report.residual = shift;
            if shift < self.config.tolerance {
                report.converged = true;
                break;
            }
        }

        if !report.converged {
            tracing::debug!(
                "Component of {} events hit the iteration cap (residual {:.2e})",
                events.len(),
                report.residual
            );
        }
        Ok((beliefs, stuck, report))
    }
}

impl Default for TemporalSolver {
    fn default() -> Self {
        Self::default_config()
    }
}

/// Multiply mass by `(1 - w) + w * profile`
fn apply_factor(mass: &mut [f64], profile: &[f64], weight: f64) {
    for (m, p) in mass.iter_mut().zip(profile) {
        *m *= (1.0 - weight) + weight * p;
    }
}
