//! Near-duplicate line detection.

use std::collections::HashMap;

/// Lowercase, keep letters/digits/spaces, collapse whitespace.
pub(crate) fn normalize_line(line: &str) -> String {
    line.chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Occurrences of normalized lines beyond `tolerance`, and the number of
/// non-blank lines considered.
pub(crate) fn excess_duplicates(content: &str, tolerance: usize) -> (usize, usize) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut total = 0;
    for line in content.lines() {
        let normalized = normalize_line(line);
        if normalized.is_empty() {
            continue;
        }
        total += 1;
        *counts.entry(normalized).or_insert(0) += 1;
    }
    let excess = counts
        .values()
        .map(|&count| count.saturating_sub(tolerance))
        .sum();
    (excess, total)
}

/// Penalty points: `excess / total × max_points`
pub(crate) fn duplicate_penalty(content: &str, tolerance: usize, max_points: f64) -> f64 {
    let (excess, total) = excess_duplicates(content, tolerance);
    if total == 0 || excess == 0 {
        return 0.0;
    }
    excess as f64 / total as f64 * max_points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ignores_case_and_punctuation() {
        assert_eq!(normalize_line("- The  Butler, did IT!"), "the butler did it");
        assert_eq!(normalize_line("   ---   "), "");
    }

    #[test]
    fn test_lines_within_tolerance_are_free() {
        let content = "a clue\nA clue.\nanother line\n";
        assert_eq!(excess_duplicates(content, 2), (0, 3));
        assert_eq!(duplicate_penalty(content, 2, 30.0), 0.0);
    }

    #[test]
    fn test_excess_penalized_proportionally() {
        // "same" occurs 5 times, tolerance 2 -> 3 excess of 6 lines
        let content = "same\nsame\nsame\nsame\nsame\nunique\n\n";
        assert_eq!(excess_duplicates(content, 2), (3, 6));
        assert_eq!(duplicate_penalty(content, 2, 30.0), 15.0);
    }
}
