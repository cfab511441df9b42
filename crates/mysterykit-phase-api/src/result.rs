use chrono::{DateTime, Utc};
use mysterykit_llm::{FALLBACK_PROVIDER, ProviderAttempt};
use mysterykit_utils::types::{PhaseId, PhaseStatus};
use serde::{Deserialize, Serialize};

/// Outcome of one phase. Recorded once per session and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: PhaseId,
    pub status: PhaseStatus,
    pub content: String,
    /// Provider that produced `content`, or `fallback-synthetic`
    pub provider: String,
    pub duration_ms: u64,
    /// Start offset from pipeline start
    pub started_ms: u64,
    /// Finish offset from pipeline start
    pub finished_ms: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<ProviderAttempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
}

impl PhaseResult {
    #[must_use]
    pub fn new(
        phase: PhaseId,
        status: PhaseStatus,
        content: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            status,
            content: content.into(),
            provider: provider.into(),
            duration_ms: 0,
            started_ms: 0,
            finished_ms: 0,
            timestamp: Utc::now(),
            attempts: Vec::new(),
            degraded_reason: None,
        }
    }

    /// Set start/finish offsets; duration is derived from them.
    #[must_use]
    pub fn with_timing(mut self, started_ms: u64, finished_ms: u64) -> Self {
        self.started_ms = started_ms;
        self.finished_ms = finished_ms.max(started_ms);
        self.duration_ms = self.finished_ms - started_ms;
        self
    }

    #[must_use]
    pub fn with_attempts(mut self, attempts: Vec<ProviderAttempt>) -> Self {
        self.attempts = attempts;
        self
    }

    #[must_use]
    pub fn with_degraded_reason(mut self, reason: impl Into<String>) -> Self {
        self.degraded_reason = Some(reason.into());
        self
    }

    /// True when the content is the synthetic placeholder
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.provider == FALLBACK_PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_derives_duration() {
        let result = PhaseResult::new(PhaseId::Concept, PhaseStatus::Succeeded, "x", "groq")
            .with_timing(1000, 2500);
        assert_eq!(result.duration_ms, 1500);
        assert!(!result.is_synthetic());
    }

    #[test]
    fn test_serialized_shape() {
        let result = PhaseResult::new(
            PhaseId::CharacterProfiles,
            PhaseStatus::Fallback,
            "placeholder",
            FALLBACK_PROVIDER,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["phase"], "characterProfiles");
        assert_eq!(json["status"], "FALLBACK");
        assert_eq!(json["provider"], "fallback-synthetic");
        assert!(json.get("attempts").is_none());
        assert!(json.get("degraded_reason").is_none());
        assert!(result.is_synthetic());
    }
}
