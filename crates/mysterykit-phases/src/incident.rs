//! Third batch: the crime and the clues that point at it.

use std::time::Duration;

use anyhow::Result;
use mysterykit_llm::FallbackTemplate;
use mysterykit_phase_api::{
    GenerationParams, Phase, PhaseBudget, PhaseContext, PhaseId, PhaseRequest,
};

use crate::common::{SYSTEM_PROMPT, compose, excerpt, roster, template};

const INCIDENT_SECTIONS: &[&str] = &["## The Crime", "## Method", "## Discovery"];
const EVIDENCE_SECTIONS: &[&str] = &["## Physical Evidence", "## Testimony", "## Red Herrings"];

#[derive(Debug, Clone, Default)]
pub struct IncidentDetailsPhase;

impl IncidentDetailsPhase {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Phase for IncidentDetailsPhase {
    fn id(&self) -> PhaseId {
        PhaseId::IncidentDetails
    }

    fn name(&self) -> &'static str {
        "Incident Details"
    }

    fn deps(&self) -> &'static [PhaseId] {
        &[
            PhaseId::Concept,
            PhaseId::CharacterProfiles,
            PhaseId::RelationshipMap,
        ]
    }

    fn sections(&self) -> &'static [&'static str] {
        INCIDENT_SECTIONS
    }

    fn default_budget(&self) -> PhaseBudget {
        PhaseBudget {
            timeout: Duration::from_secs(40),
            min_length: 1000,
            max_tokens: 2500,
        }
    }

    fn build_request(&self, ctx: &PhaseContext<'_>) -> Result<PhaseRequest> {
        let names = roster(ctx)?;
        let task = format!(
            "Describe the crime in detail. Exactly one of these characters is the \
             culprit: {}. Cover where and how it happened and who found the body.",
            names.join(", ")
        );
        let upstream = [
            ("Concept", excerpt(ctx, PhaseId::Concept)?),
            ("Relationships", excerpt(ctx, PhaseId::RelationshipMap)?),
        ];
        Ok(PhaseRequest::new(
            SYSTEM_PROMPT,
            compose(&task, ctx.params, &upstream, INCIDENT_SECTIONS),
        ))
    }

    fn fallback_template(&self, params: &GenerationParams) -> FallbackTemplate {
        template("Incident Details", INCIDENT_SECTIONS, params)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EvidenceSetPhase;

impl EvidenceSetPhase {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Phase for EvidenceSetPhase {
    fn id(&self) -> PhaseId {
        PhaseId::EvidenceSet
    }

    fn name(&self) -> &'static str {
        "Evidence Set"
    }

    fn deps(&self) -> &'static [PhaseId] {
        &[PhaseId::Concept, PhaseId::CharacterProfiles]
    }

    fn sections(&self) -> &'static [&'static str] {
        EVIDENCE_SECTIONS
    }

    fn default_budget(&self) -> PhaseBudget {
        PhaseBudget {
            timeout: Duration::from_secs(40),
            min_length: 1000,
            max_tokens: 2500,
        }
    }

    fn build_request(&self, ctx: &PhaseContext<'_>) -> Result<PhaseRequest> {
        let names = roster(ctx)?;
        let clue_count = (ctx.params.player_count as usize * 2).max(8);
        let task = format!(
            "Create {clue_count} pieces of evidence. Every character ({}) must be \
             implicated by at least one clue; mark which clues are red herrings.",
            names.join(", ")
        );
        let upstream = [
            ("Concept", excerpt(ctx, PhaseId::Concept)?),
            ("Characters", excerpt(ctx, PhaseId::CharacterProfiles)?),
        ];
        Ok(PhaseRequest::new(
            SYSTEM_PROMPT,
            compose(&task, ctx.params, &upstream, EVIDENCE_SECTIONS),
        ))
    }

    fn fallback_template(&self, params: &GenerationParams) -> FallbackTemplate {
        let clues = (1..=(params.player_count * 2).max(8))
            .map(|i| format!("### Clue {i}"))
            .collect();
        template("Evidence Set", EVIDENCE_SECTIONS, params).with_entries(clues)
    }
}
