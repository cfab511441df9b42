//! Execution engine for the mystery kit pipeline
//!
//! - [`PhaseExecutor`] turns one phase into exactly one result
//! - [`Orchestrator`] runs the phase graph batch by batch under a deadline
//! - [`GenerationSession`] holds results and the lifecycle state machine
//! - [`Pipeline`] ties them to the quality gate behind a single entry point

pub mod executor;
pub mod orchestrator;
pub mod pipeline;
pub mod session;

pub use executor::PhaseExecutor;
pub use orchestrator::Orchestrator;
pub use pipeline::{GenerationOutcome, Pipeline, PipelineError};
pub use session::{GenerationSession, SessionError, SessionState};
