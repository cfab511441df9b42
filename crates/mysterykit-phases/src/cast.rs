//! Second batch: who the characters are and how they are tied together.

use std::time::Duration;

use anyhow::Result;
use mysterykit_llm::FallbackTemplate;
use mysterykit_phase_api::{
    GenerationParams, Phase, PhaseBudget, PhaseContext, PhaseId, PhaseRequest,
};

use crate::common::{SYSTEM_PROMPT, compose, excerpt, suspect_entries, template};

const PROFILE_SECTIONS: &[&str] = &["## Cast", "## Secrets", "## Motives"];
const RELATIONSHIP_SECTIONS: &[&str] = &["## Connections", "## Rivalries", "## Alliances"];

/// One profile per player. Each character must get its own `### ` heading;
/// later phases read the roster from those headings.
#[derive(Debug, Clone, Default)]
pub struct CharacterProfilesPhase;

impl CharacterProfilesPhase {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Phase for CharacterProfilesPhase {
    fn id(&self) -> PhaseId {
        PhaseId::CharacterProfiles
    }

    fn name(&self) -> &'static str {
        "Character Profiles"
    }

    fn deps(&self) -> &'static [PhaseId] {
        &[PhaseId::Concept]
    }

    fn sections(&self) -> &'static [&'static str] {
        PROFILE_SECTIONS
    }

    fn default_budget(&self) -> PhaseBudget {
        PhaseBudget {
            timeout: Duration::from_secs(45),
            min_length: 1500,
            max_tokens: 3000,
        }
    }

    fn build_request(&self, ctx: &PhaseContext<'_>) -> Result<PhaseRequest> {
        let concept = excerpt(ctx, PhaseId::Concept)?;
        let task = format!(
            "Write {} character profiles for this mystery. Give every character \
             a '### Name' heading under '## Cast', then list each one's secret and motive.",
            ctx.params.player_count
        );
        Ok(PhaseRequest::new(
            SYSTEM_PROMPT,
            compose(&task, ctx.params, &[("Concept", concept)], PROFILE_SECTIONS),
        ))
    }

    fn fallback_template(&self, params: &GenerationParams) -> FallbackTemplate {
        template("Character Profiles", PROFILE_SECTIONS, params)
            .with_entries(suspect_entries(params))
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipMapPhase;

impl RelationshipMapPhase {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Phase for RelationshipMapPhase {
    fn id(&self) -> PhaseId {
        PhaseId::RelationshipMap
    }

    fn name(&self) -> &'static str {
        "Relationship Map"
    }

    fn deps(&self) -> &'static [PhaseId] {
        &[PhaseId::Concept]
    }

    fn sections(&self) -> &'static [&'static str] {
        RELATIONSHIP_SECTIONS
    }

    fn default_budget(&self) -> PhaseBudget {
        PhaseBudget {
            timeout: Duration::from_secs(30),
            min_length: 800,
            max_tokens: 2000,
        }
    }

    // Runs beside the character profiles, so it works from the concept's
    // cast of roles rather than finished names.
    fn build_request(&self, ctx: &PhaseContext<'_>) -> Result<PhaseRequest> {
        let concept = excerpt(ctx, PhaseId::Concept)?;
        let task = format!(
            "Map the relationships between the {} guests implied by this concept: \
             who owes whom, who resents whom and which pairs would cover for each other.",
            ctx.params.player_count
        );
        Ok(PhaseRequest::new(
            SYSTEM_PROMPT,
            compose(&task, ctx.params, &[("Concept", concept)], RELATIONSHIP_SECTIONS),
        ))
    }

    fn fallback_template(&self, params: &GenerationParams) -> FallbackTemplate {
        template("Relationship Map", RELATIONSHIP_SECTIONS, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysterykit_llm::SyntheticFallback;
    use mysterykit_phase_api::{PhaseResult, PhaseStatus};
    use std::collections::BTreeMap;

    fn upstream_with_concept() -> BTreeMap<PhaseId, PhaseResult> {
        let mut upstream = BTreeMap::new();
        upstream.insert(
            PhaseId::Concept,
            PhaseResult::new(
                PhaseId::Concept,
                PhaseStatus::Succeeded,
                "# Concept\n## Premise\nA storm traps the guests.",
                "p",
            ),
        );
        upstream
    }

    #[test]
    fn test_profiles_request_embeds_concept() {
        let params = GenerationParams::new(6, "manor");
        let upstream = upstream_with_concept();
        let ctx = PhaseContext::new("s", &params, &upstream);

        let request = CharacterProfilesPhase::new().build_request(&ctx).unwrap();

        assert!(request.prompt.contains("Write 6 character profiles"));
        assert!(request.prompt.contains("A storm traps the guests."));
    }

    #[test]
    fn test_profiles_request_fails_without_concept() {
        let params = GenerationParams::new(6, "manor");
        let upstream = BTreeMap::new();
        let ctx = PhaseContext::new("s", &params, &upstream);
        assert!(CharacterProfilesPhase::new().build_request(&ctx).is_err());
        assert!(RelationshipMapPhase::new().build_request(&ctx).is_err());
    }

    #[test]
    fn test_profiles_fallback_names_every_player() {
        let params = GenerationParams::new(5, "manor");
        let rendered =
            SyntheticFallback::render(&CharacterProfilesPhase::new().fallback_template(&params));
        assert_eq!(crate::common::parse_roster(&rendered).len(), 5);
    }
}
