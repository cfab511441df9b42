//! Anthropic HTTP backend implementation
//!
//! Talks to the Anthropic Messages API.

use crate::http_client::{HttpClient, HttpParams};
use crate::types::{Message, ProviderClient, ProviderRequest, ProviderResponse, Role};
use async_trait::async_trait;
use mysterykit_config::ProviderConfig;
use mysterykit_utils::error::ProviderError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

/// Default Anthropic API endpoint
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone)]
pub(crate) struct AnthropicBackend {
    client: Arc<HttpClient>,
    name: String,
    base_url: String,
    api_key: String,
    default_model: String,
    default_params: HttpParams,
}

impl AnthropicBackend {
    /// # Errors
    ///
    /// Returns `ProviderError::Misconfiguration` if the HTTP client cannot be constructed
    pub fn new(
        name: impl Into<String>,
        api_key: String,
        base_url: Option<String>,
        default_model: String,
        default_params: HttpParams,
    ) -> Result<Self, ProviderError> {
        let client = HttpClient::new()?;

        Ok(Self {
            client: Arc::new(client),
            name: name.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            default_model,
            default_params,
        })
    }

    /// Build from a `[[providers]]` entry, reading the API key from the
    /// environment variable it names.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Misconfiguration` if the API key variable is
    /// not set or the HTTP client cannot be constructed.
    pub fn from_provider_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let api_key_env = config.api_key_env();
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ProviderError::Misconfiguration(format!(
                    "API key for provider '{}' not found in environment variable '{}'",
                    config.name, api_key_env
                ))
            })?;

        let defaults = HttpParams::default();
        let params = HttpParams {
            max_tokens: config.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: config.temperature.unwrap_or(defaults.temperature),
        };

        Self::new(
            config.name.clone(),
            api_key,
            config.base_url.clone(),
            config.model.clone(),
            params,
        )
    }

    /// Resolve parameters for this request
    ///
    /// 1. `request.model` overrides `default_model` when non-empty
    /// 2. `request.max_tokens` is capped by the configured maximum
    /// 3. `request.metadata["temperature"]` overrides the configured temperature
    fn resolve_params(&self, request: &ProviderRequest) -> (String, HttpParams) {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let max_tokens = request.max_tokens.min(self.default_params.max_tokens).max(1);

        let temperature = request
            .metadata
            .get("temperature")
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
            .unwrap_or(self.default_params.temperature);

        (
            model,
            HttpParams {
                max_tokens,
                temperature,
            },
        )
    }

    /// Split system messages into the top-level `system` field used by the
    /// Messages API.
    fn convert_messages(messages: &[Message]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system_prompt: Option<String> = None;
        let mut anthropic_messages = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => {
                    if let Some(existing) = system_prompt.as_mut() {
                        existing.push_str("\n\n");
                        existing.push_str(&msg.content);
                    } else {
                        system_prompt = Some(msg.content.clone());
                    }
                }
                Role::User => anthropic_messages.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: msg.content.clone(),
                }),
                Role::Assistant => anthropic_messages.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content: msg.content.clone(),
                }),
            }
        }

        (system_prompt, anthropic_messages)
    }
}

#[async_trait]
impl ProviderClient for AnthropicBackend {
    async fn invoke(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let started = Instant::now();
        let (model, params) = self.resolve_params(&request);

        debug!(
            provider = %self.name,
            phase = %request.phase,
            model = %model,
            max_tokens = params.max_tokens,
            timeout_ms = request.timeout.as_millis() as u64,
            "Invoking Anthropic backend"
        );

        let (system, messages) = Self::convert_messages(&request.messages);
        let body = AnthropicRequest {
            model: model.clone(),
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system,
        };

        let http_request = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let response = self
            .client
            .execute(http_request, request.timeout, &self.name)
            .await?;

        let response_body: AnthropicResponse = response.json().await.map_err(|e| {
            ProviderError::Transport(format!("Failed to parse Anthropic response: {e}"))
        })?;

        let content: String = response_body
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        if content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        let mut result = ProviderResponse::new(content, self.name.clone(), model)
            .with_duration(started.elapsed());
        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.input_tokens, usage.output_tokens);
        }

        debug!(
            provider = %self.name,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            "Anthropic invocation completed"
        );

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    messages: Vec<AnthropicMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysterykit_config::ProviderKind;
    use mysterykit_utils::types::PhaseId;
    use std::time::Duration;

    fn backend(params: HttpParams) -> AnthropicBackend {
        AnthropicBackend::new(
            "anthropic",
            "test-key".to_string(),
            None,
            "default-model".to_string(),
            params,
        )
        .unwrap()
    }

    fn request(max_tokens: u32) -> ProviderRequest {
        ProviderRequest::new(
            "session",
            PhaseId::Concept,
            max_tokens,
            Duration::from_secs(30),
            vec![],
        )
    }

    #[test]
    fn test_resolve_params_uses_defaults() {
        let backend = backend(HttpParams {
            max_tokens: 1024,
            temperature: 0.5,
        });

        let (model, params) = backend.resolve_params(&request(4000));

        assert_eq!(model, "default-model");
        assert_eq!(params.max_tokens, 1024);
        assert_eq!(params.temperature, 0.5);
    }

    #[test]
    fn test_resolve_params_keeps_smaller_phase_budget() {
        let backend = backend(HttpParams::default());
        let (_, params) = backend.resolve_params(&request(1500));
        assert_eq!(params.max_tokens, 1500);
    }

    #[test]
    fn test_resolve_params_overrides_model_and_temperature() {
        let backend = backend(HttpParams::default());
        let mut req = request(100);
        req.model = "custom-model".to_string();
        req.metadata
            .insert("temperature".to_string(), serde_json::json!(0.3));

        let (model, params) = backend.resolve_params(&req);

        assert_eq!(model, "custom-model");
        assert!((params.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn test_convert_messages_separates_system() {
        let messages = vec![
            Message::system("You write mysteries"),
            Message::system("Use markdown"),
            Message::user("Hello"),
            Message::new(Role::Assistant, "Hi there!"),
        ];

        let (system, converted) = AnthropicBackend::convert_messages(&messages);

        assert_eq!(
            system,
            Some("You write mysteries\n\nUse markdown".to_string())
        );
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[0].role, "user");
        assert_eq!(converted[1].role, "assistant");
    }

    #[test]
    fn test_from_provider_config_missing_api_key() {
        let test_env_var = "MYSTERYKIT_ANTHROPIC_KEY_TEST_MISSING";
        unsafe {
            std::env::remove_var(test_env_var);
        }

        let config = ProviderConfig {
            name: "careful".to_string(),
            kind: ProviderKind::Anthropic,
            priority: 2,
            model: "claude".to_string(),
            base_url: None,
            api_key_env: Some(test_env_var.to_string()),
            max_tokens: None,
            temperature: None,
        };

        match AnthropicBackend::from_provider_config(&config) {
            Err(ProviderError::Misconfiguration(msg)) => {
                assert!(msg.contains(test_env_var), "got: {msg}");
                assert!(msg.contains("careful"), "got: {msg}");
            }
            _ => panic!("Expected Misconfiguration error for missing API key"),
        }
    }
}
