//! Prompt fragments and upstream parsing shared by every phase.

use std::sync::LazyLock;

use anyhow::{Result, bail};
use mysterykit_llm::FallbackTemplate;
use mysterykit_phase_api::{GenerationParams, PhaseContext, PhaseId};
use regex::Regex;

pub(crate) const SYSTEM_PROMPT: &str = "You are a senior murder-mystery party designer. \
You write complete, playable kit material in markdown for a host and their guests.";

/// Appended to every generative prompt so providers return the document
/// itself rather than commentary about it.
pub(crate) const OUTPUT_RULES: &str = "

OUTPUT RULES:
1. Output the document itself, starting with its '# ' title line
2. Use exactly the '## ' section headings listed above, in order
3. Do not open with 'Here is', 'I have created' or similar commentary
4. Do not repeat the same sentence or bullet twice";

/// Upstream material is clipped to this many characters per phase
const UPSTREAM_EXCERPT_CHARS: usize = 4000;

/// Fewest characters a usable roster must name
const MIN_ROSTER: usize = 2;

static CHARACTER_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^###[ \t]+(.+?)[ \t]*$").unwrap());

/// Upstream content clipped on a char boundary
pub(crate) fn excerpt(ctx: &PhaseContext<'_>, phase: PhaseId) -> Result<String> {
    let content = ctx.upstream_content(phase)?;
    if content.chars().count() <= UPSTREAM_EXCERPT_CHARS {
        return Ok(content.to_string());
    }
    let mut clipped: String = content.chars().take(UPSTREAM_EXCERPT_CHARS).collect();
    clipped.push_str("\n[...]");
    Ok(clipped)
}

/// Character names from the `### ` headings of the character profiles.
///
/// # Errors
///
/// Fails when the profiles are missing or name fewer than two characters.
pub(crate) fn roster(ctx: &PhaseContext<'_>) -> Result<Vec<String>> {
    let content = ctx.upstream_content(PhaseId::CharacterProfiles)?;
    let names = parse_roster(content);
    if names.len() < MIN_ROSTER {
        bail!(
            "character profiles name {} character(s); at least {MIN_ROSTER} are needed",
            names.len()
        );
    }
    Ok(names)
}

pub(crate) fn parse_roster(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in CHARACTER_HEADING.captures_iter(content) {
        let name = caps[1].trim().trim_matches(|c: char| c == '*' || c == '_').trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Assemble a prompt: task line, parameter summary, upstream material,
/// required sections, output rules.
pub(crate) fn compose(
    task: &str,
    params: &GenerationParams,
    upstream: &[(&str, String)],
    sections: &[&str],
) -> String {
    let mut prompt = format!("{task}\n\nParty: {}.\n", params.summary());
    for (label, body) in upstream {
        prompt.push_str("\n--- ");
        prompt.push_str(label);
        prompt.push_str(" ---\n");
        prompt.push_str(body);
        prompt.push('\n');
    }
    prompt.push_str("\nRequired sections:\n");
    for section in sections {
        prompt.push_str(section);
        prompt.push('\n');
    }
    prompt.push_str(OUTPUT_RULES);
    prompt
}

/// Placeholder template with the phase's sections and the party summary
pub(crate) fn template(title: &str, sections: &[&str], params: &GenerationParams) -> FallbackTemplate {
    FallbackTemplate::new(
        title,
        sections.iter().map(|s| (*s).to_string()).collect(),
    )
    .with_context(params.summary())
}

/// `### Suspect N` entries, one per player
pub(crate) fn suspect_entries(params: &GenerationParams) -> Vec<String> {
    (1..=params.player_count)
        .map(|i| format!("### Suspect {i}"))
        .collect()
}
