//! Final batch: timeline, solution and the host's guide.

use std::time::Duration;

use anyhow::Result;
use mysterykit_llm::FallbackTemplate;
use mysterykit_phase_api::{
    GenerationParams, Phase, PhaseBudget, PhaseContext, PhaseId, PhaseRequest,
};

use crate::common::{SYSTEM_PROMPT, compose, excerpt, roster, template};

const TIMELINE_SECTIONS: &[&str] = &["## Before the Party", "## The Evening", "## Aftermath"];
const RESOLUTION_SECTIONS: &[&str] = &["## Culprit", "## Reasoning", "## Reveal Script"];
const GUIDE_SECTIONS: &[&str] = &["## Preparation", "## Running Order", "## Hints"];

#[derive(Debug, Clone, Default)]
pub struct TimelinePhase;

impl TimelinePhase {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Phase for TimelinePhase {
    fn id(&self) -> PhaseId {
        PhaseId::Timeline
    }

    fn name(&self) -> &'static str {
        "Timeline"
    }

    fn deps(&self) -> &'static [PhaseId] {
        &[
            PhaseId::Concept,
            PhaseId::CharacterProfiles,
            PhaseId::IncidentDetails,
            PhaseId::EvidenceSet,
        ]
    }

    fn sections(&self) -> &'static [&'static str] {
        TIMELINE_SECTIONS
    }

    fn default_budget(&self) -> PhaseBudget {
        PhaseBudget {
            timeout: Duration::from_secs(30),
            min_length: 800,
            max_tokens: 2000,
        }
    }

    fn build_request(&self, ctx: &PhaseContext<'_>) -> Result<PhaseRequest> {
        let names = roster(ctx)?;
        let task = format!(
            "Write a timestamped timeline of the fatal evening. Account for the \
             whereabouts of {} at every step and place each clue where it was left.",
            names.join(", ")
        );
        let upstream = [
            ("Incident", excerpt(ctx, PhaseId::IncidentDetails)?),
            ("Evidence", excerpt(ctx, PhaseId::EvidenceSet)?),
        ];
        Ok(PhaseRequest::new(
            SYSTEM_PROMPT,
            compose(&task, ctx.params, &upstream, TIMELINE_SECTIONS),
        ))
    }

    fn fallback_template(&self, params: &GenerationParams) -> FallbackTemplate {
        template("Timeline", TIMELINE_SECTIONS, params)
    }
}

/// Names the culprit. Works from the incident and evidence only; it does
/// not need the roster.
#[derive(Debug, Clone, Default)]
pub struct ResolutionPhase;

impl ResolutionPhase {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Phase for ResolutionPhase {
    fn id(&self) -> PhaseId {
        PhaseId::Resolution
    }

    fn name(&self) -> &'static str {
        "Resolution"
    }

    fn deps(&self) -> &'static [PhaseId] {
        &[
            PhaseId::Concept,
            PhaseId::IncidentDetails,
            PhaseId::EvidenceSet,
        ]
    }

    fn sections(&self) -> &'static [&'static str] {
        RESOLUTION_SECTIONS
    }

    fn default_budget(&self) -> PhaseBudget {
        PhaseBudget {
            timeout: Duration::from_secs(30),
            min_length: 800,
            max_tokens: 2000,
        }
    }

    fn build_request(&self, ctx: &PhaseContext<'_>) -> Result<PhaseRequest> {
        let task = "Write the solution. Name the culprit, then walk through the chain \
                    of evidence that proves it, and finish with a script the host reads \
                    at the reveal.";
        let upstream = [
            ("Concept", excerpt(ctx, PhaseId::Concept)?),
            ("Incident", excerpt(ctx, PhaseId::IncidentDetails)?),
            ("Evidence", excerpt(ctx, PhaseId::EvidenceSet)?),
        ];
        Ok(PhaseRequest::new(
            SYSTEM_PROMPT,
            compose(task, ctx.params, &upstream, RESOLUTION_SECTIONS),
        ))
    }

    fn fallback_template(&self, params: &GenerationParams) -> FallbackTemplate {
        template("Resolution", RESOLUTION_SECTIONS, params)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FacilitatorGuidePhase;

impl FacilitatorGuidePhase {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Phase for FacilitatorGuidePhase {
    fn id(&self) -> PhaseId {
        PhaseId::FacilitatorGuide
    }

    fn name(&self) -> &'static str {
        "Facilitator Guide"
    }

    fn deps(&self) -> &'static [PhaseId] {
        &[
            PhaseId::Concept,
            PhaseId::CharacterProfiles,
            PhaseId::RelationshipMap,
            PhaseId::EvidenceSet,
        ]
    }

    fn sections(&self) -> &'static [&'static str] {
        GUIDE_SECTIONS
    }

    fn default_budget(&self) -> PhaseBudget {
        PhaseBudget {
            timeout: Duration::from_secs(35),
            min_length: 1000,
            max_tokens: 2500,
        }
    }

    fn build_request(&self, ctx: &PhaseContext<'_>) -> Result<PhaseRequest> {
        let names = roster(ctx)?;
        let task = format!(
            "Write the host's guide for a game at {} difficulty. Explain what to prepare, when to \
             hand out each clue, and give one nudge per character ({}) for stuck players.",
            ctx.params.difficulty,
            names.join(", ")
        );
        let upstream = [
            ("Concept", excerpt(ctx, PhaseId::Concept)?),
            ("Relationships", excerpt(ctx, PhaseId::RelationshipMap)?),
            ("Evidence", excerpt(ctx, PhaseId::EvidenceSet)?),
        ];
        Ok(PhaseRequest::new(
            SYSTEM_PROMPT,
            compose(&task, ctx.params, &upstream, GUIDE_SECTIONS),
        ))
    }

    fn fallback_template(&self, params: &GenerationParams) -> FallbackTemplate {
        template("Facilitator Guide", GUIDE_SECTIONS, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysterykit_phase_api::{Difficulty, PhaseResult, PhaseStatus};
    use std::collections::BTreeMap;

    fn full_upstream() -> BTreeMap<PhaseId, PhaseResult> {
        [
            (PhaseId::Concept, "## Premise\nstorm"),
            (PhaseId::CharacterProfiles, "### Ada\n### Bram\n### Cleo\n"),
            (PhaseId::RelationshipMap, "## Connections\nrivals"),
            (PhaseId::IncidentDetails, "## The Crime\npoison"),
            (PhaseId::EvidenceSet, "## Physical Evidence\nvial"),
        ]
        .into_iter()
        .map(|(id, content)| {
            (id, PhaseResult::new(id, PhaseStatus::Succeeded, content, "p"))
        })
        .collect()
    }

    #[test]
    fn test_final_batch_builders_succeed_with_full_upstream() {
        let params = GenerationParams::new(6, "manor").with_difficulty(Difficulty::Easy);
        let upstream = full_upstream();
        let ctx = PhaseContext::new("s", &params, &upstream);

        let timeline = TimelinePhase::new().build_request(&ctx).unwrap();
        assert!(timeline.prompt.contains("Ada, Bram, Cleo"));
        assert!(timeline.prompt.contains("poison"));

        let resolution = ResolutionPhase::new().build_request(&ctx).unwrap();
        assert!(resolution.prompt.contains("vial"));

        let guide = FacilitatorGuidePhase::new().build_request(&ctx).unwrap();
        assert!(guide.prompt.contains("at easy difficulty"));
        assert!(guide.prompt.contains("rivals"));
    }

    #[test]
    fn test_resolution_tolerates_missing_roster() {
        let params = GenerationParams::new(6, "manor");
        let mut upstream = full_upstream();
        upstream.remove(&PhaseId::CharacterProfiles);
        let ctx = PhaseContext::new("s", &params, &upstream);

        assert!(ResolutionPhase::new().build_request(&ctx).is_ok());
        assert!(TimelinePhase::new().build_request(&ctx).is_err());
    }
}
