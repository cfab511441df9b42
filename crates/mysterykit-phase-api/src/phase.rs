use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use mysterykit_llm::FallbackTemplate;
use mysterykit_utils::types::PhaseId;

use crate::params::GenerationParams;
use crate::result::PhaseResult;

/// Context handed to a phase when its request is built
#[derive(Debug, Clone, Copy)]
pub struct PhaseContext<'a> {
    pub session_id: &'a str,
    pub params: &'a GenerationParams,
    /// Results recorded so far, including every dependency
    pub upstream: &'a BTreeMap<PhaseId, PhaseResult>,
}

impl<'a> PhaseContext<'a> {
    #[must_use]
    pub fn new(
        session_id: &'a str,
        params: &'a GenerationParams,
        upstream: &'a BTreeMap<PhaseId, PhaseResult>,
    ) -> Self {
        Self {
            session_id,
            params,
            upstream,
        }
    }

    /// Content of an upstream phase.
    ///
    /// # Errors
    ///
    /// Fails when the phase has no recorded result or its content is blank.
    pub fn upstream_content(&self, phase: PhaseId) -> Result<&'a str> {
        let result = self
            .upstream
            .get(&phase)
            .ok_or_else(|| anyhow!("upstream phase '{phase}' has no result"))?;
        if result.content.trim().is_empty() {
            return Err(anyhow!("upstream phase '{phase}' produced blank content"));
        }
        Ok(result.content.as_str())
    }
}

/// Prompt pair produced by a phase's request builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseRequest {
    pub system: String,
    pub prompt: String,
}

impl PhaseRequest {
    #[must_use]
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
        }
    }
}

/// Timeout, length floor and token budget of one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseBudget {
    pub timeout: Duration,
    pub min_length: usize,
    pub max_tokens: u32,
}

/// Core trait every pipeline phase implements
///
/// Implementations are stateless: both request building and fallback
/// rendering are pure functions of their inputs.
pub trait Phase: Send + Sync {
    /// Returns the unique identifier for this phase
    fn id(&self) -> PhaseId;

    /// Human-readable name
    fn name(&self) -> &'static str;

    /// Phases that must complete before this phase can run
    fn deps(&self) -> &'static [PhaseId];

    /// Section markers expected in this phase's content, e.g. `## Premise`
    fn sections(&self) -> &'static [&'static str];

    /// Built-in budget before configuration overrides
    fn default_budget(&self) -> PhaseBudget;

    /// Build the provider request from upstream results.
    ///
    /// Errors mean the upstream material is unusable; the executor then
    /// falls back to [`Phase::minimal_request`] and marks the result
    /// degraded.
    fn build_request(&self, ctx: &PhaseContext<'_>) -> Result<PhaseRequest>;

    /// Request built from the generation parameters alone
    fn minimal_request(&self, params: &GenerationParams) -> PhaseRequest {
        PhaseRequest::new(
            "You write murder-mystery party kits. Answer in markdown.",
            format!(
                "Write the {} for a murder-mystery party ({}). Use these sections: {}.",
                self.name().to_lowercase(),
                params.summary(),
                self.sections().join(", ")
            ),
        )
    }

    /// Placeholder shape used when no provider answers
    fn fallback_template(&self, params: &GenerationParams) -> FallbackTemplate;
}

/// A phase plus the effective dependencies and budget it runs with.
#[derive(Clone)]
pub struct PhaseSpec {
    pub phase: Arc<dyn Phase>,
    pub dependencies: Vec<PhaseId>,
    pub timeout: Duration,
    pub min_length: usize,
    pub max_tokens: u32,
}

impl PhaseSpec {
    #[must_use]
    pub fn new(phase: Arc<dyn Phase>) -> Self {
        let budget = phase.default_budget();
        Self {
            dependencies: phase.deps().to_vec(),
            timeout: budget.timeout,
            min_length: budget.min_length,
            max_tokens: budget.max_tokens,
            phase,
        }
    }

    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<PhaseId>) -> Self {
        self.dependencies = dependencies;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn id(&self) -> PhaseId {
        self.phase.id()
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.phase.name()
    }

    #[must_use]
    pub fn sections(&self) -> &'static [&'static str] {
        self.phase.sections()
    }

    /// Fallback template sized to this spec's minimum length
    #[must_use]
    pub fn fallback(&self, params: &GenerationParams) -> FallbackTemplate {
        self.phase
            .fallback_template(params)
            .with_min_length(self.min_length)
    }
}

impl std::fmt::Debug for PhaseSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseSpec")
            .field("id", &self.id())
            .field("dependencies", &self.dependencies)
            .field("timeout", &self.timeout)
            .field("min_length", &self.min_length)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}
