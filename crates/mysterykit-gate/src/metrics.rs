//! Pluggable per-phase quality metrics.
//!
//! A metric maps one phase's content to a value in `0.0..=1.0`. The gate
//! combines metric values with configured weights.

use std::collections::HashSet;

use mysterykit_phase_api::PhaseId;

/// What a metric gets to look at
#[derive(Debug, Clone, Copy)]
pub struct MetricInput<'a> {
    pub phase: PhaseId,
    pub content: &'a str,
    /// Minimum acceptable length in characters
    pub min_length: usize,
    /// Expected section markers
    pub sections: &'a [&'static str],
}

/// A single scoring heuristic
///
/// Implementations must be deterministic: identical input always yields
/// the identical value.
pub trait Metric: Send + Sync {
    /// Stable name used as the component key and suggestion key
    fn name(&self) -> &'static str;

    /// Value in `0.0..=1.0`; out-of-range values are clamped by the gate
    fn evaluate(&self, input: &MetricInput<'_>) -> f64;

    /// Advice shown when the value falls below the configured threshold
    fn suggestion(&self, input: &MetricInput<'_>, value: f64) -> String;
}

/// Content length relative to the phase minimum, capped at 1
#[derive(Debug, Clone, Copy, Default)]
pub struct LengthAdequacy;

impl Metric for LengthAdequacy {
    fn name(&self) -> &'static str {
        "length"
    }

    fn evaluate(&self, input: &MetricInput<'_>) -> f64 {
        let length = input.content.trim().chars().count();
        if input.min_length == 0 {
            return if length > 0 { 1.0 } else { 0.0 };
        }
        (length as f64 / input.min_length as f64).min(1.0)
    }

    fn suggestion(&self, input: &MetricInput<'_>, value: f64) -> String {
        format!(
            "{} is too short ({:.0}% of the {} character minimum); ask for more detail",
            input.phase,
            value * 100.0,
            input.min_length
        )
    }
}

/// Fraction of expected section markers present, case-insensitively
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionCoverage;

impl SectionCoverage {
    fn missing<'a>(input: &MetricInput<'a>) -> Vec<&'a str> {
        let lowered = input.content.to_lowercase();
        input
            .sections
            .iter()
            .copied()
            .filter(|section| !lowered.contains(&section.to_lowercase()))
            .collect()
    }
}

impl Metric for SectionCoverage {
    fn name(&self) -> &'static str {
        "structure"
    }

    fn evaluate(&self, input: &MetricInput<'_>) -> f64 {
        if input.sections.is_empty() {
            return 1.0;
        }
        let present = input.sections.len() - Self::missing(input).len();
        present as f64 / input.sections.len() as f64
    }

    fn suggestion(&self, input: &MetricInput<'_>, _value: f64) -> String {
        format!(
            "{} is missing sections: {}",
            input.phase,
            Self::missing(input).join(", ")
        )
    }
}

/// Unique-word ratio relative to a target ratio, capped at 1
#[derive(Debug, Clone, Copy)]
pub struct WordDiversity {
    target: f64,
}

impl WordDiversity {
    #[must_use]
    pub fn new(target: f64) -> Self {
        Self {
            target: if target > 0.0 { target } else { 1.0 },
        }
    }
}

impl Metric for WordDiversity {
    fn name(&self) -> &'static str {
        "diversity"
    }

    fn evaluate(&self, input: &MetricInput<'_>) -> f64 {
        let words: Vec<String> = input
            .content
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        if words.is_empty() {
            return 0.0;
        }
        let unique: HashSet<&str> = words.iter().map(String::as_str).collect();
        let ratio = unique.len() as f64 / words.len() as f64;
        (ratio / self.target).min(1.0)
    }

    fn suggestion(&self, input: &MetricInput<'_>, _value: f64) -> String {
        format!(
            "{} reuses the same words heavily; vary names, places and descriptions",
            input.phase
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(content: &'a str, min_length: usize, sections: &'a [&'static str]) -> MetricInput<'a> {
        MetricInput {
            phase: PhaseId::Concept,
            content,
            min_length,
            sections,
        }
    }

    #[test]
    fn test_length_is_capped_ratio() {
        assert_eq!(LengthAdequacy.evaluate(&input(&"x".repeat(50), 100, &[])), 0.5);
        assert_eq!(LengthAdequacy.evaluate(&input(&"x".repeat(500), 100, &[])), 1.0);
        assert_eq!(LengthAdequacy.evaluate(&input("   ", 100, &[])), 0.0);
        assert_eq!(LengthAdequacy.evaluate(&input("x", 0, &[])), 1.0);
    }

    #[test]
    fn test_structure_case_insensitive() {
        let sections: &[&'static str] = &["## Premise", "## Victim", "## Hook", "## Setting"];
        let value = SectionCoverage.evaluate(&input("## PREMISE\n## victim\n", 1, sections));
        assert_eq!(value, 0.5);
        let advice = SectionCoverage.suggestion(&input("## premise", 1, sections), value);
        assert!(advice.contains("## Victim, ## Hook, ## Setting"));
    }

    #[test]
    fn test_structure_without_sections_is_full() {
        assert_eq!(SectionCoverage.evaluate(&input("anything", 1, &[])), 1.0);
    }

    #[test]
    fn test_diversity_against_target() {
        let metric = WordDiversity::new(0.5);
        // 2 unique of 4 words
        assert_eq!(metric.evaluate(&input("cat dog cat dog", 1, &[])), 1.0);
        // 1 unique of 4 words
        assert_eq!(metric.evaluate(&input("cat cat CAT cat", 1, &[])), 0.5);
        assert_eq!(metric.evaluate(&input("---", 1, &[])), 0.0);
    }
}
