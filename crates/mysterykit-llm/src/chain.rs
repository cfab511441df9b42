//! Ordered provider fallback chain.
//!
//! Providers are tried strictly in priority order. The first success wins;
//! when every provider has failed the chain renders the phase's fallback
//! template instead, so a caller always gets content back.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use mysterykit_utils::error::{ConfigError, ProviderError, ProviderErrorKind};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::fallback::{FALLBACK_PROVIDER, FallbackTemplate, SyntheticFallback};
use crate::types::{ProviderClient, ProviderRequest};

/// A named, ranked generation backend.
#[derive(Clone)]
pub struct ProviderDescriptor {
    pub name: String,
    /// Lower runs first
    pub priority: u32,
    /// Upper bound on tokens requested from this provider
    pub max_tokens: u32,
    pub client: Arc<dyn ProviderClient>,
}

impl ProviderDescriptor {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        priority: u32,
        max_tokens: u32,
        client: Arc<dyn ProviderClient>,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            max_tokens,
            client,
        }
    }
}

impl std::fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

/// Classified result of one provider attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    Success,
    Timeout,
    HttpError,
    AuthError,
}

impl From<ProviderErrorKind> for AttemptOutcome {
    fn from(kind: ProviderErrorKind) -> Self {
        match kind {
            ProviderErrorKind::Timeout => Self::Timeout,
            ProviderErrorKind::HttpError => Self::HttpError,
            ProviderErrorKind::AuthError => Self::AuthError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAttempt {
    pub provider: String,
    pub outcome: AttemptOutcome,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What the chain produced for one request
#[derive(Debug, Clone)]
pub struct ChainOutcome {
    pub content: String,
    /// Provider that produced `content`, or [`FALLBACK_PROVIDER`]
    pub provider: String,
    pub fallback_used: bool,
    pub attempts: Vec<ProviderAttempt>,
    pub duration: Duration,
}

/// Providers in priority order plus the synthetic last resort.
#[derive(Debug, Clone, Default)]
pub struct ProviderChain {
    descriptors: Vec<ProviderDescriptor>,
}

impl ProviderChain {
    /// Build a chain. Equal priorities keep the order they were given in.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if two descriptors share a name.
    pub fn new(mut descriptors: Vec<ProviderDescriptor>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for descriptor in &descriptors {
            if !seen.insert(descriptor.name.clone()) {
                return Err(ConfigError::InvalidValue {
                    key: "providers".to_string(),
                    value: format!("duplicate provider name '{}'", descriptor.name),
                });
            }
        }
        descriptors.sort_by_key(|d| d.priority);
        Ok(Self { descriptors })
    }

    /// A chain with no providers; every run produces fallback content.
    #[must_use]
    pub fn synthetic_only() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn providers(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Try each provider in order until one returns non-blank content.
    ///
    /// Each attempt is bounded by `request.timeout`, further shortened to
    /// whatever is left before `hard_deadline`. Providers that would get no
    /// time at all are skipped.
    pub async fn run(
        &self,
        request: ProviderRequest,
        hard_deadline: Option<Instant>,
        fallback: &FallbackTemplate,
    ) -> ChainOutcome {
        let started = Instant::now();
        let mut attempts = Vec::with_capacity(self.descriptors.len());

        for descriptor in &self.descriptors {
            let timeout = match hard_deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        debug!(
                            phase = %request.phase,
                            provider = %descriptor.name,
                            "Skipping provider, hard deadline reached"
                        );
                        continue;
                    }
                    request.timeout.min(remaining)
                }
                None => request.timeout,
            };

            let mut attempt_request = request.clone();
            attempt_request.timeout = timeout;
            attempt_request.max_tokens = request.max_tokens.min(descriptor.max_tokens);

            debug!(
                session_id = %request.session_id,
                phase = %request.phase,
                provider = %descriptor.name,
                timeout_ms = timeout.as_millis() as u64,
                max_tokens = attempt_request.max_tokens,
                "Attempting provider"
            );

            let attempt_started = Instant::now();
            let result =
                match tokio::time::timeout(timeout, descriptor.client.invoke(attempt_request)).await
                {
                    Ok(Ok(response)) if response.content.trim().is_empty() => {
                        Err(ProviderError::EmptyResponse)
                    }
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout { duration: timeout }),
                };
            let duration_ms = attempt_started.elapsed().as_millis() as u64;

            match result {
                Ok(response) => {
                    attempts.push(ProviderAttempt {
                        provider: descriptor.name.clone(),
                        outcome: AttemptOutcome::Success,
                        duration_ms,
                        error: None,
                    });
                    debug!(
                        phase = %request.phase,
                        provider = %descriptor.name,
                        elapsed_ms = duration_ms,
                        "Provider succeeded"
                    );
                    return ChainOutcome {
                        content: response.content,
                        provider: descriptor.name.clone(),
                        fallback_used: false,
                        attempts,
                        duration: started.elapsed(),
                    };
                }
                Err(err) => {
                    debug!(
                        phase = %request.phase,
                        provider = %descriptor.name,
                        elapsed_ms = duration_ms,
                        error = %err,
                        "Provider attempt failed"
                    );
                    attempts.push(ProviderAttempt {
                        provider: descriptor.name.clone(),
                        outcome: err.kind().into(),
                        duration_ms,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        warn!(
            session_id = %request.session_id,
            phase = %request.phase,
            attempts = attempts.len(),
            "All providers exhausted, using synthetic fallback"
        );

        ChainOutcome {
            content: SyntheticFallback::render(fallback),
            provider: FALLBACK_PROVIDER.to_string(),
            fallback_used: true,
            attempts,
            duration: started.elapsed(),
        }
    }
}
