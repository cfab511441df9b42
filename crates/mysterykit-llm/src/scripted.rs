//! In-memory provider with scripted latency and outcomes.
//!
//! Used by the test suites and by `mysterykit generate --demo`. Latency is
//! simulated with `tokio::time::sleep`, so tests running on a paused clock
//! observe exact timings.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mysterykit_utils::error::ProviderError;
use mysterykit_utils::types::PhaseId;

use crate::types::{ProviderClient, ProviderRequest, ProviderResponse};

/// Requests seen by a [`ScriptedProvider`], in arrival order
pub type CallLog = Arc<Mutex<Vec<ProviderRequest>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedContent {
    /// Markdown covering every expected section and the minimum length
    WellFormed,
    Fixed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    Succeed {
        latency: Duration,
        content: ScriptedContent,
    },
    Fail {
        latency: Duration,
        error: ProviderError,
    },
    /// Never answers
    Hang,
}

impl Behavior {
    #[must_use]
    pub fn succeed_after(latency: Duration) -> Self {
        Self::Succeed {
            latency,
            content: ScriptedContent::WellFormed,
        }
    }

    #[must_use]
    pub fn succeed_with(latency: Duration, content: impl Into<String>) -> Self {
        Self::Succeed {
            latency,
            content: ScriptedContent::Fixed(content.into()),
        }
    }

    #[must_use]
    pub fn fail(error: ProviderError) -> Self {
        Self::fail_after(Duration::ZERO, error)
    }

    #[must_use]
    pub fn fail_after(latency: Duration, error: ProviderError) -> Self {
        Self::Fail { latency, error }
    }
}

pub struct ScriptedProvider {
    name: String,
    default: Behavior,
    per_phase: HashMap<PhaseId, Behavior>,
    calls: CallLog,
}

impl ScriptedProvider {
    #[must_use]
    pub fn new(name: impl Into<String>, default: Behavior) -> Self {
        Self {
            name: name.into(),
            default,
            per_phase: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Override the behaviour for one phase
    #[must_use]
    pub fn with_phase(mut self, phase: PhaseId, behavior: Behavior) -> Self {
        self.per_phase.insert(phase, behavior);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared handle to the call log; stays valid after the provider is
    /// moved into a chain.
    #[must_use]
    pub fn calls_handle(&self) -> CallLog {
        Arc::clone(&self.calls)
    }

    fn behavior_for(&self, phase: PhaseId) -> &Behavior {
        self.per_phase.get(&phase).unwrap_or(&self.default)
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    async fn invoke(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }

        match self.behavior_for(request.phase).clone() {
            Behavior::Succeed { latency, content } => {
                tokio::time::sleep(latency).await;
                let text = match content {
                    ScriptedContent::WellFormed => well_formed(&request, &self.name),
                    ScriptedContent::Fixed(text) => text,
                };
                Ok(ProviderResponse::new(text, self.name.clone(), "scripted")
                    .with_duration(latency))
            }
            Behavior::Fail { latency, error } => {
                tokio::time::sleep(latency).await;
                Err(error)
            }
            Behavior::Hang => {
                std::future::pending::<()>().await;
                Err(ProviderError::Timeout {
                    duration: request.timeout,
                })
            }
        }
    }
}

/// Every line carries numbered tokens so no two lines repeat and the word
/// mix stays varied.
fn well_formed(request: &ProviderRequest, provider: &str) -> String {
    let target = request.min_length().unwrap_or(0) * 3 / 2;
    let mut sections = request.expected_sections();
    if sections.is_empty() {
        sections.push("## Notes".to_string());
    }

    let mut out = String::new();
    let _ = writeln!(out, "# {} ({provider})\n", request.phase);

    let mut counter = 0usize;
    let mut line = |out: &mut String| {
        counter += 1;
        let n = counter;
        let _ = writeln!(
            out,
            "- detail{n} clue{n} motive{n} alibi{n} witness{n} record{n}"
        );
    };

    for (index, section) in sections.iter().enumerate() {
        let _ = writeln!(out, "{section}");
        for entry in 1..=2 {
            let _ = writeln!(out, "### Entry {}.{entry}", index + 1);
            line(&mut out);
        }
        out.push('\n');
    }

    while out.chars().count() < target {
        line(&mut out);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{META_MIN_LENGTH, META_SECTIONS};
    use serde_json::json;
    use std::collections::HashSet;

    fn request(phase: PhaseId) -> ProviderRequest {
        ProviderRequest::new("s", phase, 1000, Duration::from_secs(10), Vec::new())
            .with_metadata(META_SECTIONS, json!(["## Cast", "## Secrets"]))
            .with_metadata(META_MIN_LENGTH, json!(900))
    }

    #[tokio::test(start_paused = true)]
    async fn test_well_formed_content_meets_hints() {
        let provider = ScriptedProvider::new("p", Behavior::succeed_after(Duration::from_secs(1)));
        let response = provider
            .invoke(request(PhaseId::CharacterProfiles))
            .await
            .unwrap();

        assert!(response.content.chars().count() >= 900);
        assert!(response.content.contains("## Cast"));
        assert!(response.content.contains("## Secrets"));
        assert!(response.content.contains("### Entry 1.1"));
        assert_eq!(response.duration_ms, 1000);

        let lines: Vec<&str> = response
            .content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .collect();
        let unique: HashSet<&str> = lines.iter().copied().collect();
        assert_eq!(lines.len(), unique.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_phase_override_and_call_log() {
        let provider = ScriptedProvider::new("p", Behavior::succeed_after(Duration::ZERO))
            .with_phase(
                PhaseId::Timeline,
                Behavior::fail(ProviderError::Quota("limit".into())),
            );
        let calls = provider.calls_handle();

        assert!(provider.invoke(request(PhaseId::Concept)).await.is_ok());
        let err = provider.invoke(request(PhaseId::Timeline)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Quota(_)));

        let phases: Vec<PhaseId> = calls.lock().unwrap().iter().map(|r| r.phase).collect();
        assert_eq!(phases, vec![PhaseId::Concept, PhaseId::Timeline]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_content_returned_verbatim() {
        let provider = ScriptedProvider::new(
            "p",
            Behavior::succeed_with(Duration::from_millis(10), "exact text"),
        );
        let response = provider.invoke(request(PhaseId::Concept)).await.unwrap();
        assert_eq!(response.content, "exact text");
        assert_eq!(response.provider, "p");
    }
}
