//! mysterykit: phase-batched murder-mystery kit generation
//!
//! The pipeline runs eight content phases in four dependency-ordered
//! batches against a prioritized chain of LLM providers, substitutes
//! deterministic placeholders when providers fail, and scores the finished
//! session with a quality gate.
//!
//! ```no_run
//! use mysterykit::{Config, GenerationParams, Pipeline};
//!
//! # async fn demo() -> Result<(), mysterykit::PipelineError> {
//! let pipeline = Pipeline::from_config(&Config::default())?;
//! let outcome = pipeline
//!     .generate(GenerationParams::new(6, "a snowbound Alpine hotel"))
//!     .await?;
//! println!("{} ({:.1})", outcome.report.tier, outcome.report.overall);
//! # Ok(())
//! # }
//! ```

pub mod cli;

pub use mysterykit_config::{Config, ConfigSource, PipelineConfig, ProviderConfig, QualityConfig};
pub use mysterykit_engine::{
    GenerationOutcome, GenerationSession, Orchestrator, PhaseExecutor, Pipeline, PipelineError,
    SessionError, SessionState,
};
pub use mysterykit_gate::{
    GatePolicy, Metric, MetricInput, QualityGate, QualityReport, ReadinessTier, SessionView,
};
pub use mysterykit_llm::{
    FALLBACK_PROVIDER, ProviderChain, ProviderClient, ProviderDescriptor, ProviderRequest,
    ProviderResponse, chain_from_config,
};
pub use mysterykit_phase_api::{
    Difficulty, GenerationParams, PhaseGraph, PhaseId, PhaseResult, PhaseSpec, PhaseStatus,
};
pub use mysterykit_phases::default_graph;
pub use mysterykit_utils::error::UserFriendlyError;
pub use mysterykit_utils::exit_codes::ExitCode;

/// Crates re-exported for advanced use
pub mod crates {
    pub use mysterykit_config as config;
    pub use mysterykit_engine as engine;
    pub use mysterykit_gate as gate;
    pub use mysterykit_llm as llm;
    pub use mysterykit_phase_api as phase_api;
    pub use mysterykit_phases as phases;
    pub use mysterykit_utils as utils;
}
