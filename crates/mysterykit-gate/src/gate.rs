//! Quality gate evaluation
//!
//! Scores every phase of a completed session with the weighted metrics,
//! subtracts the duplicate-line penalty, averages the phase scores and maps
//! the overall score onto a [`ReadinessTier`].

use mysterykit_phase_api::{PhaseGraph, PhaseResult, PhaseStatus};
use mysterykit_utils::error::{ErrorCategory, UserFriendlyError};
use tracing::{debug, info};

use crate::duplicates::duplicate_penalty;
use crate::metrics::{LengthAdequacy, Metric, MetricInput, SectionCoverage, WordDiversity};
use crate::policy::GatePolicy;
use crate::types::{GateError, PhaseScore, QualityReport, SessionView, Suggestion};

struct WeightedMetric {
    weight: f64,
    metric: Box<dyn Metric>,
}

/// Scores sessions against a [`GatePolicy`]
pub struct QualityGate {
    policy: GatePolicy,
    metrics: Vec<WeightedMetric>,
}

impl QualityGate {
    /// Gate with the built-in length, structure and diversity metrics
    #[must_use]
    pub fn new(policy: GatePolicy) -> Self {
        let metrics = vec![
            WeightedMetric {
                weight: policy.length_weight,
                metric: Box::new(LengthAdequacy),
            },
            WeightedMetric {
                weight: policy.structure_weight,
                metric: Box::new(SectionCoverage),
            },
            WeightedMetric {
                weight: policy.diversity_weight,
                metric: Box::new(WordDiversity::new(policy.diversity_target)),
            },
        ];
        Self { policy, metrics }
    }

    /// Add a custom metric with its weight
    #[must_use]
    pub fn with_metric(mut self, weight: f64, metric: Box<dyn Metric>) -> Self {
        self.metrics.push(WeightedMetric { weight, metric });
        self
    }

    #[must_use]
    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// Score a completed session.
    ///
    /// Pure with respect to the session: the same results always produce the
    /// same report.
    ///
    /// # Errors
    ///
    /// Returns `GateError::SessionNotComplete` unless the session is COMPLETE.
    pub fn evaluate<S>(&self, session: &S, graph: &PhaseGraph) -> Result<QualityReport, GateError>
    where
        S: SessionView + ?Sized,
    {
        if !session.is_complete() {
            return Err(GateError::SessionNotComplete {
                session_id: session.session_id(),
                state: session.state_name().to_string(),
            });
        }

        let mut phases = std::collections::BTreeMap::new();
        let mut suggestions = Vec::new();

        for (phase, result) in session.results() {
            let spec = graph.spec(*phase);
            let input = MetricInput {
                phase: *phase,
                content: &result.content,
                min_length: spec.map_or(1, |s| s.min_length),
                sections: spec.map_or(&[][..], |s| s.sections()),
            };
            let score = self.score_phase(result, &input, &mut suggestions);
            debug!(phase = %phase, score = score.score, "Scored phase");
            phases.insert(*phase, score);
        }

        let overall = if phases.is_empty() {
            0.0
        } else {
            phases.values().map(|p| p.score).sum::<f64>() / phases.len() as f64
        };
        let tier = self.policy.tier_for(overall);

        info!(
            session_id = %session.session_id(),
            overall,
            tier = %tier,
            suggestions = suggestions.len(),
            "Quality gate evaluated"
        );

        Ok(QualityReport {
            session_id: session.session_id(),
            phases,
            overall,
            tier,
            suggestions,
        })
    }

    fn score_phase(
        &self,
        result: &PhaseResult,
        input: &MetricInput<'_>,
        suggestions: &mut Vec<Suggestion>,
    ) -> PhaseScore {
        let mut components = std::collections::BTreeMap::new();
        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        for entry in &self.metrics {
            let value = entry.metric.evaluate(input).clamp(0.0, 1.0);
            components.insert(entry.metric.name().to_string(), value);
            if entry.weight > 0.0 {
                weighted += entry.weight * value;
                total_weight += entry.weight;
            }
            if value < self.policy.metric_threshold {
                suggestions.push(Suggestion {
                    phase: input.phase,
                    metric: entry.metric.name().to_string(),
                    message: entry.metric.suggestion(input, value),
                });
            }
        }

        let base = if total_weight > 0.0 {
            weighted / total_weight * 100.0
        } else {
            0.0
        };

        let penalty = duplicate_penalty(
            input.content,
            self.policy.duplicate_tolerance,
            self.policy.duplicate_penalty,
        );
        if penalty > 0.0 {
            suggestions.push(Suggestion {
                phase: input.phase,
                metric: "duplication".to_string(),
                message: format!(
                    "{} repeats lines; remove copy-pasted entries ({penalty:.1} points lost)",
                    input.phase
                ),
            });
        }

        let mut score = (base - penalty).clamp(0.0, 100.0);
        let mut capped = false;
        if result.status != PhaseStatus::Succeeded || result.is_synthetic() {
            if score > self.policy.synthetic_score_cap {
                score = self.policy.synthetic_score_cap;
                capped = true;
            }
            suggestions.push(Suggestion {
                phase: input.phase,
                metric: "provider".to_string(),
                message: match &result.degraded_reason {
                    Some(reason) => format!(
                        "{} was not generated by a provider ({reason}); regenerate it",
                        input.phase
                    ),
                    None => format!(
                        "{} holds placeholder content ({}); regenerate it with a provider available",
                        input.phase, result.status
                    ),
                },
            });
        }

        PhaseScore {
            score,
            components,
            duplicate_penalty: penalty,
            capped,
        }
    }
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(GatePolicy::default())
    }
}

impl UserFriendlyError for GateError {
    fn user_message(&self) -> String {
        match self {
            Self::SessionNotComplete { session_id, state } => {
                format!("Session {session_id} cannot be scored while {state}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        Some("Only sessions that ran every phase to completion are scored.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        vec!["Run the pipeline to completion before invoking the quality gate".to_string()]
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Internal
    }
}
