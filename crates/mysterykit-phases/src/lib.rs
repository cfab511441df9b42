//! Concrete implementations of the mystery kit phases
//!
//! Each phase knows its dependencies, expected sections, default budget,
//! how to build its prompt from upstream results and what its placeholder
//! looks like. [`default_graph`] wires them into the standard four-batch
//! plan and applies per-phase overrides from configuration.

mod cast;
mod common;
mod concept;
mod incident;
mod wrapup;

use std::sync::Arc;
use std::time::Duration;

use mysterykit_config::PipelineConfig;
use mysterykit_phase_api::{GraphError, Phase, PhaseGraph, PhaseId, PhaseSpec};
use tracing::debug;

pub use cast::{CharacterProfilesPhase, RelationshipMapPhase};
pub use concept::ConceptPhase;
pub use incident::{EvidenceSetPhase, IncidentDetailsPhase};
pub use wrapup::{FacilitatorGuidePhase, ResolutionPhase, TimelinePhase};

/// The phase implementation for an identifier
#[must_use]
pub fn phase_for(id: PhaseId) -> Arc<dyn Phase> {
    match id {
        PhaseId::Concept => Arc::new(ConceptPhase::new()),
        PhaseId::CharacterProfiles => Arc::new(CharacterProfilesPhase::new()),
        PhaseId::RelationshipMap => Arc::new(RelationshipMapPhase::new()),
        PhaseId::IncidentDetails => Arc::new(IncidentDetailsPhase::new()),
        PhaseId::EvidenceSet => Arc::new(EvidenceSetPhase::new()),
        PhaseId::Timeline => Arc::new(TimelinePhase::new()),
        PhaseId::Resolution => Arc::new(ResolutionPhase::new()),
        PhaseId::FacilitatorGuide => Arc::new(FacilitatorGuidePhase::new()),
    }
}

/// Standard batching, in execution order
pub const DEFAULT_BATCHES: &[&[PhaseId]] = &[
    &[PhaseId::Concept],
    &[PhaseId::CharacterProfiles, PhaseId::RelationshipMap],
    &[PhaseId::IncidentDetails, PhaseId::EvidenceSet],
    &[
        PhaseId::Timeline,
        PhaseId::Resolution,
        PhaseId::FacilitatorGuide,
    ],
];

/// Spec for one phase with configuration overrides applied.
///
/// Timeout precedence: `[pipeline.phases.<phase>].timeout_secs`, then
/// `[pipeline].phase_timeout_secs`, then the phase's built-in default.
#[must_use]
pub fn configured_spec(id: PhaseId, pipeline: &PipelineConfig) -> PhaseSpec {
    let mut spec = PhaseSpec::new(phase_for(id));
    let overrides = pipeline.phase_override(id);

    if let Some(secs) = overrides
        .and_then(|o| o.timeout_secs)
        .or(pipeline.phase_timeout_secs)
    {
        spec = spec.with_timeout(Duration::from_secs(secs));
    }
    if let Some(min_length) = overrides.and_then(|o| o.min_length) {
        spec = spec.with_min_length(min_length);
    }
    if let Some(max_tokens) = overrides.and_then(|o| o.max_tokens) {
        spec = spec.with_max_tokens(max_tokens);
    }

    debug!(
        phase = %id,
        timeout_secs = spec.timeout.as_secs(),
        min_length = spec.min_length,
        max_tokens = spec.max_tokens,
        "Configured phase"
    );
    spec
}

/// Build the standard eight-phase graph.
///
/// # Errors
///
/// Returns `GraphError` if the plan fails validation.
pub fn default_graph(pipeline: &PipelineConfig) -> Result<PhaseGraph, GraphError> {
    let batches: Vec<Vec<PhaseSpec>> = DEFAULT_BATCHES
        .iter()
        .map(|batch| {
            batch
                .iter()
                .map(|&id| configured_spec(id, pipeline))
                .collect()
        })
        .collect();
    PhaseGraph::new(batches)
}
