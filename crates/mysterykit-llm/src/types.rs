//! Core types for the generation provider abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use mysterykit_utils::error::ProviderError;
use mysterykit_utils::types::PhaseId;

/// Metadata key carrying the phase's expected section markers
pub const META_SECTIONS: &str = "sections";

/// Metadata key carrying the phase's minimum content length
pub const META_MIN_LENGTH: &str = "min_length";

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions
    System,
    /// User input
    User,
    /// Assistant response
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Input to a single provider invocation
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Session this request belongs to, for log correlation
    pub session_id: String,
    /// Phase the content is generated for
    pub phase: PhaseId,
    /// Model override; empty means the backend's configured model
    pub model: String,
    /// Token budget for this attempt
    pub max_tokens: u32,
    /// Deadline for this attempt
    pub timeout: Duration,
    /// Ordered list of messages in the conversation
    pub messages: Vec<Message>,
    /// Provider-specific metadata and phase hints (e.g. `temperature`,
    /// [`META_SECTIONS`], [`META_MIN_LENGTH`])
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ProviderRequest {
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        phase: PhaseId,
        max_tokens: u32,
        timeout: Duration,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            phase,
            model: String::new(),
            max_tokens,
            timeout,
            messages,
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Section markers the phase expects, if the caller attached them
    #[must_use]
    pub fn expected_sections(&self) -> Vec<String> {
        self.metadata
            .get(META_SECTIONS)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Minimum content length the phase expects, if the caller attached it
    #[must_use]
    pub fn min_length(&self) -> Option<usize> {
        self.metadata
            .get(META_MIN_LENGTH)
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
    }
}

/// Successful provider response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Generated text
    pub content: String,
    /// Provider name as reported by the backend
    pub provider: String,
    /// Model that was actually used
    pub model_used: String,
    /// Wall time of the invocation in milliseconds
    pub duration_ms: u64,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
}

impl ProviderResponse {
    #[must_use]
    pub fn new(
        content: impl Into<String>,
        provider: impl Into<String>,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            provider: provider.into(),
            model_used: model_used.into(),
            duration_ms: 0,
            tokens_input: None,
            tokens_output: None,
        }
    }

    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = duration.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_tokens(mut self, input: u64, output: u64) -> Self {
        self.tokens_input = Some(input);
        self.tokens_output = Some(output);
        self
    }
}

/// Trait for generation backend implementations
///
/// All providers (HTTP APIs, SDKs, in-memory scripts) implement this trait,
/// allowing the provider chain to work with any of them without knowing
/// implementation details. Implementations should honour
/// `request.timeout`, but the chain enforces it regardless.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Invoke the backend with the given request
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` for any failure during invocation:
    /// timeouts, HTTP/transport failures, authentication failures and empty
    /// responses.
    async fn invoke(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;
}
