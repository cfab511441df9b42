//! Generation session and its lifecycle state machine.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use mysterykit_gate::SessionView;
use mysterykit_phase_api::{GenerationParams, PhaseId, PhaseResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Session lifecycle. Transitions only move forward one step at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Pending,
    Running,
    Complete,
    Scored,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Scored => "SCORED",
        }
    }

    /// The single state reachable from this one
    #[must_use]
    pub const fn next(&self) -> Option<SessionState> {
        match self {
            Self::Pending => Some(Self::Running),
            Self::Running => Some(Self::Complete),
            Self::Complete => Some(Self::Scored),
            Self::Scored => None,
        }
    }

    #[must_use]
    pub fn can_transition(&self, to: SessionState) -> bool {
        self.next() == Some(to)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Violations of the session invariants. Always an orchestrator bug.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error("result for phase {phase} was already recorded")]
    DuplicateResult { phase: PhaseId },

    #[error("cannot record {phase} while session is {state}")]
    NotRunning { phase: PhaseId, state: SessionState },
}

/// One generation request: parameters, per-phase results and lifecycle
/// state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    params: GenerationParams,
    state: SessionState,
    results: BTreeMap<PhaseId, PhaseResult>,
}

impl GenerationSession {
    #[must_use]
    pub fn new(params: GenerationParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            params,
            state: SessionState::Pending,
            results: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn result(&self, phase: PhaseId) -> Option<&PhaseResult> {
        self.results.get(&phase)
    }

    /// Advance the lifecycle by one step.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` for backward, repeated or
    /// skipping transitions.
    pub fn transition(&mut self, to: SessionState) -> Result<(), SessionError> {
        if !self.state.can_transition(to) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// Store a phase result. Each phase is written at most once and only
    /// while the session is running.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRunning` outside RUNNING and
    /// `SessionError::DuplicateResult` for a second write to the same phase.
    pub fn record(&mut self, result: PhaseResult) -> Result<(), SessionError> {
        if self.state != SessionState::Running {
            return Err(SessionError::NotRunning {
                phase: result.phase,
                state: self.state,
            });
        }
        if self.results.contains_key(&result.phase) {
            return Err(SessionError::DuplicateResult {
                phase: result.phase,
            });
        }
        self.results.insert(result.phase, result);
        Ok(())
    }
}

impl SessionView for GenerationSession {
    fn session_id(&self) -> String {
        self.id.to_string()
    }

    fn is_complete(&self) -> bool {
        self.state == SessionState::Complete
    }

    fn state_name(&self) -> &'static str {
        self.state.as_str()
    }

    fn results(&self) -> &BTreeMap<PhaseId, PhaseResult> {
        &self.results
    }
}
