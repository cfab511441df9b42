//! Pipeline entry point
//!
//! [`Pipeline::generate`] validates parameters, runs the orchestrator over a
//! fresh session and scores the result. It is the only API that crosses the
//! crate boundary; every failure it returns is a [`PipelineError`].

use std::sync::Arc;
use std::time::Duration;

use mysterykit_config::Config;
use mysterykit_gate::{GateError, GatePolicy, QualityGate, QualityReport};
use mysterykit_llm::{ProviderChain, chain_from_config};
use mysterykit_phase_api::{GenerationParams, GraphError, PhaseGraph};
use mysterykit_phases::default_graph;
use mysterykit_utils::error::{
    ConfigError, ErrorCategory, ParameterValidationError, UserFriendlyError,
};
use mysterykit_utils::exit_codes::ExitCode;
use mysterykit_utils::logging::session_span;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Instrument, info};

use crate::executor::PhaseExecutor;
use crate::orchestrator::Orchestrator;
use crate::session::{GenerationSession, SessionError, SessionState};

/// Errors that cross the pipeline boundary
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidParameters(#[from] ParameterValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("Invalid phase graph: {0}")]
    Graph(#[from] GraphError),

    #[error("Session invariant violated: {0}")]
    Session(#[from] SessionError),

    #[error("Quality gate failed: {0}")]
    Gate(#[from] GateError),
}

impl PipelineError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidParameters(_) => ExitCode::INVALID_PARAMETERS,
            Self::Configuration(_) | Self::Graph(_) => ExitCode::CONFIGURATION,
            Self::Session(_) | Self::Gate(_) => ExitCode::INTERNAL,
        }
    }
}

impl UserFriendlyError for PipelineError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidParameters(e) => e.user_message(),
            Self::Configuration(e) => e.user_message(),
            Self::Graph(e) => format!("Phase plan is invalid: {e}"),
            Self::Session(e) => format!("Generation session became inconsistent: {e}"),
            Self::Gate(e) => e.user_message(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidParameters(e) => e.context(),
            Self::Configuration(e) => e.context(),
            Self::Graph(_) => Some(
                "Batches must be non-empty, at most three phases wide, and only depend on earlier batches."
                    .to_string(),
            ),
            Self::Session(_) => Some("This indicates a bug in the orchestrator.".to_string()),
            Self::Gate(e) => e.context(),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidParameters(e) => e.suggestions(),
            Self::Configuration(e) => e.suggestions(),
            Self::Graph(_) => vec!["Check the [pipeline] section of the configuration".to_string()],
            Self::Session(_) => vec!["Re-run with --verbose and report the log".to_string()],
            Self::Gate(e) => e.suggestions(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidParameters(_) => ErrorCategory::Validation,
            Self::Configuration(_) | Self::Graph(_) => ErrorCategory::Configuration,
            Self::Session(_) | Self::Gate(_) => ErrorCategory::Internal,
        }
    }
}

/// Scored session handed to the kit assembler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub session: GenerationSession,
    pub report: QualityReport,
}

/// Configured orchestrator plus quality gate
pub struct Pipeline {
    orchestrator: Orchestrator,
    gate: QualityGate,
}

impl Pipeline {
    #[must_use]
    pub fn new(chain: ProviderChain, graph: PhaseGraph, policy: GatePolicy, deadline: Duration) -> Self {
        Self {
            orchestrator: Orchestrator::new(PhaseExecutor::new(chain), Arc::new(graph), deadline),
            gate: QualityGate::new(policy),
        }
    }

    /// Build a pipeline from configuration, with providers constructed from
    /// `[[providers]]`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Configuration` or `PipelineError::Graph` when
    /// the configuration cannot be turned into a working pipeline.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let chain = chain_from_config(config)?;
        Self::with_chain(config, chain)
    }

    /// Build a pipeline from configuration with an explicit provider chain
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Graph` if the phase plan is invalid.
    pub fn with_chain(config: &Config, chain: ProviderChain) -> Result<Self, PipelineError> {
        let graph = default_graph(&config.pipeline)?;
        info!(
            providers = ?chain.providers(),
            phases = graph.len(),
            deadline_secs = config.pipeline.deadline().as_secs(),
            "Pipeline configured"
        );
        Ok(Self::new(
            chain,
            graph,
            GatePolicy::from_config(&config.quality),
            config.pipeline.deadline(),
        ))
    }

    /// Replace the quality gate, e.g. to register custom metrics
    #[must_use]
    pub fn with_gate(mut self, gate: QualityGate) -> Self {
        self.gate = gate;
        self
    }

    #[must_use]
    pub fn graph(&self) -> &PhaseGraph {
        self.orchestrator.graph()
    }

    /// Generate and score one mystery kit.
    ///
    /// Provider failures, timeouts and the pipeline deadline never surface
    /// here; they show up as FALLBACK or DEGRADED phase results.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::InvalidParameters` before any phase starts if
    /// `params` is malformed, and `Session` or `Gate` errors only when an
    /// internal invariant is broken.
    pub async fn generate(&self, params: GenerationParams) -> Result<GenerationOutcome, PipelineError> {
        params.validate()?;

        let mut session = GenerationSession::new(params);
        let span = session_span(&session.id().to_string());

        async move {
            self.orchestrator.run(&mut session).await?;
            let report = self.gate.evaluate(&session, self.orchestrator.graph())?;
            session.transition(SessionState::Scored)?;

            info!(
                overall = report.overall,
                tier = %report.tier,
                "Session scored"
            );
            Ok::<_, PipelineError>(GenerationOutcome { session, report })
        }
        .instrument(span)
        .await
    }
}
