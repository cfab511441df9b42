use std::time::Duration;

use anyhow::Result;
use mysterykit_llm::FallbackTemplate;
use mysterykit_phase_api::{
    GenerationParams, Phase, PhaseBudget, PhaseContext, PhaseId, PhaseRequest,
};

use crate::common::{SYSTEM_PROMPT, compose, template};

const SECTIONS: &[&str] = &["## Premise", "## Setting", "## Victim", "## Hook"];

/// Root phase: premise, setting and victim of the mystery.
///
/// Depends on nothing, so its request builder only fails if the generation
/// parameters themselves are unusable (which validation rules out).
#[derive(Debug, Clone, Default)]
pub struct ConceptPhase;

impl ConceptPhase {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Phase for ConceptPhase {
    fn id(&self) -> PhaseId {
        PhaseId::Concept
    }

    fn name(&self) -> &'static str {
        "Concept"
    }

    fn deps(&self) -> &'static [PhaseId] {
        &[]
    }

    fn sections(&self) -> &'static [&'static str] {
        SECTIONS
    }

    fn default_budget(&self) -> PhaseBudget {
        PhaseBudget {
            timeout: Duration::from_secs(30),
            min_length: 600,
            max_tokens: 1500,
        }
    }

    fn build_request(&self, ctx: &PhaseContext<'_>) -> Result<PhaseRequest> {
        let params = ctx.params;
        let task = format!(
            "Design the core concept of a murder mystery for exactly {} players. \
             Name the victim, explain why every guest is present and end with a hook \
             the host can read aloud.",
            params.player_count
        );
        Ok(PhaseRequest::new(
            SYSTEM_PROMPT,
            compose(&task, params, &[], SECTIONS),
        ))
    }

    fn fallback_template(&self, params: &GenerationParams) -> FallbackTemplate {
        template("Mystery Concept", SECTIONS, params)
    }
}
