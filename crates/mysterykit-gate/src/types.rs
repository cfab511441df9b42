//! Report types produced by the quality gate.

use std::collections::{BTreeMap, HashMap};

use mysterykit_phase_api::{PhaseId, PhaseResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::ReadinessTier;

/// Read access to a session for scoring
///
/// Keeps the gate independent of the engine that owns the session type.
pub trait SessionView {
    fn session_id(&self) -> String;

    /// True only in the COMPLETE state
    fn is_complete(&self) -> bool;

    /// Current state name, for error messages
    fn state_name(&self) -> &'static str;

    fn results(&self) -> &BTreeMap<PhaseId, PhaseResult>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("session {session_id} is {state}; only COMPLETE sessions can be scored")]
    SessionNotComplete { session_id: String, state: String },
}

/// Score of one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseScore {
    /// 0-100
    pub score: f64,
    /// Metric name → value in 0-1
    pub components: BTreeMap<String, f64>,
    /// Points removed for repeated lines
    pub duplicate_penalty: f64,
    /// True when the score was limited by the synthetic-content cap
    pub capped: bool,
}

/// One improvement hint, keyed by phase and metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub phase: PhaseId,
    pub metric: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub session_id: String,
    pub phases: BTreeMap<PhaseId, PhaseScore>,
    /// Arithmetic mean of phase scores
    pub overall: f64,
    pub tier: ReadinessTier,
    pub suggestions: Vec<Suggestion>,
}

impl QualityReport {
    /// Suggestions grouped by metric name
    #[must_use]
    pub fn suggestions_by_metric(&self) -> HashMap<&str, Vec<&Suggestion>> {
        let mut grouped: HashMap<&str, Vec<&Suggestion>> = HashMap::new();
        for suggestion in &self.suggestions {
            grouped
                .entry(suggestion.metric.as_str())
                .or_default()
                .push(suggestion);
        }
        grouped
    }
}
