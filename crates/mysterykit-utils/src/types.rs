//! Core identifiers shared across the pipeline crates.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier for a phase in the mystery kit generation pipeline.
///
/// Each phase produces one piece of textual content. The order of the
/// variants matches the canonical pipeline order, which is also the ordering
/// used for `BTreeMap` keys in sessions and reports.
///
/// # Serialization
///
/// `PhaseId` serializes to its camelCase name (e.g. `"characterProfiles"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PhaseId {
    /// Premise, setting, victim and tone of the mystery.
    Concept,
    /// One profile per player character, with secrets and motives.
    CharacterProfiles,
    /// How the characters know, owe and resent each other.
    RelationshipMap,
    /// The crime itself: method, location, discovery.
    IncidentDetails,
    /// Physical and testimonial clues handed to players.
    EvidenceSet,
    /// Minute-by-minute account of the fatal evening.
    Timeline,
    /// The solution and the reasoning chain that proves it.
    Resolution,
    /// Running order and hints for the host.
    FacilitatorGuide,
}

impl PhaseId {
    /// Every phase in canonical pipeline order.
    pub const ALL: [PhaseId; 8] = [
        Self::Concept,
        Self::CharacterProfiles,
        Self::RelationshipMap,
        Self::IncidentDetails,
        Self::EvidenceSet,
        Self::Timeline,
        Self::Resolution,
        Self::FacilitatorGuide,
    ];

    /// Returns the canonical camelCase name used in configuration keys,
    /// JSON output and log fields.
    ///
    /// # Example
    ///
    /// ```rust
    /// use mysterykit_utils::types::PhaseId;
    ///
    /// assert_eq!(PhaseId::Concept.as_str(), "concept");
    /// assert_eq!(PhaseId::CharacterProfiles.as_str(), "characterProfiles");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::CharacterProfiles => "characterProfiles",
            Self::RelationshipMap => "relationshipMap",
            Self::IncidentDetails => "incidentDetails",
            Self::EvidenceSet => "evidenceSet",
            Self::Timeline => "timeline",
            Self::Resolution => "resolution",
            Self::FacilitatorGuide => "facilitatorGuide",
        }
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown phase '{0}'")]
pub struct UnknownPhase(pub String);

impl FromStr for PhaseId {
    type Err = UnknownPhase;

    /// Parses the camelCase name; matching is case-insensitive so that
    /// `characterprofiles`-style keys from hand-written config still resolve.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownPhase(s.to_string()))
    }
}

/// Terminal status of a phase result.
///
/// Ordering is by severity: `Succeeded < Fallback < Degraded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseStatus {
    /// A provider returned usable content.
    Succeeded,
    /// Every provider failed; content is the synthetic placeholder.
    Fallback,
    /// The phase ran with a reduced payload or was skipped by the pipeline
    /// deadline.
    Degraded,
}

impl PhaseStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "SUCCEEDED",
            Self::Fallback => "FALLBACK",
            Self::Degraded => "DEGRADED",
        }
    }

    /// True when the content came from a real provider response.
    #[must_use]
    pub const fn is_provider_content(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_phase_id_round_trips_through_str() {
        for phase in PhaseId::ALL {
            assert_eq!(phase.as_str().parse::<PhaseId>().unwrap(), phase);
        }
    }

    #[test]
    fn test_phase_id_parse_is_case_insensitive() {
        assert_eq!(
            "CHARACTERPROFILES".parse::<PhaseId>().unwrap(),
            PhaseId::CharacterProfiles
        );
        assert_eq!(" timeline ".parse::<PhaseId>().unwrap(), PhaseId::Timeline);
    }

    #[test]
    fn test_phase_id_parse_rejects_unknown() {
        let err = "epilogue".parse::<PhaseId>().unwrap_err();
        assert_eq!(err.to_string(), "unknown phase 'epilogue'");
    }

    #[test]
    fn test_phase_id_serializes_camel_case() {
        let json = serde_json::to_string(&PhaseId::FacilitatorGuide).unwrap();
        assert_eq!(json, "\"facilitatorGuide\"");
    }

    #[test]
    fn test_status_severity_order() {
        assert!(PhaseStatus::Succeeded < PhaseStatus::Fallback);
        assert!(PhaseStatus::Fallback < PhaseStatus::Degraded);
        assert_eq!(
            PhaseStatus::Fallback.max(PhaseStatus::Degraded),
            PhaseStatus::Degraded
        );
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&PhaseStatus::Succeeded).unwrap();
        assert_eq!(json, "\"SUCCEEDED\"");
    }

    proptest! {
        #[test]
        fn prop_parse_accepts_only_known_names(input in "[a-zA-Z ]{0,24}") {
            let known = PhaseId::ALL
                .iter()
                .any(|p| p.as_str().eq_ignore_ascii_case(input.trim()));
            prop_assert_eq!(input.parse::<PhaseId>().is_ok(), known);
        }
    }
}
