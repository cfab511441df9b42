//! Phase contract for the mystery kit pipeline
//!
//! This crate holds the types shared between the orchestrator, the concrete
//! phase implementations and the quality gate: the [`Phase`] trait,
//! [`PhaseSpec`], [`PhaseResult`], [`GenerationParams`] and the validated
//! [`PhaseGraph`].

mod graph;
mod params;
mod phase;
mod result;

pub use graph::{GraphError, MAX_BATCH_WIDTH, PhaseGraph};
pub use params::{Difficulty, GenerationParams, MAX_PLAYERS, MIN_PLAYERS, UnknownDifficulty};
pub use phase::{Phase, PhaseBudget, PhaseContext, PhaseRequest, PhaseSpec};
pub use result::PhaseResult;
pub use mysterykit_utils::types::{PhaseId, PhaseStatus};
