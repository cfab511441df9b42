//! OpenAI-compatible HTTP backend
//!
//! Covers any endpoint speaking the chat-completions protocol: OpenAI,
//! OpenRouter, Groq and similar gateways.

use crate::http_client::{HttpClient, HttpParams};
use crate::types::{Message, ProviderClient, ProviderRequest, ProviderResponse, Role};
use async_trait::async_trait;
use mysterykit_config::ProviderConfig;
use mysterykit_utils::error::ProviderError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

/// Default endpoint when `base_url` is not configured
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Clone)]
pub(crate) struct OpenAiCompatibleBackend {
    client: Arc<HttpClient>,
    name: String,
    base_url: String,
    api_key: String,
    default_model: String,
    default_params: HttpParams,
}

impl OpenAiCompatibleBackend {
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
        Self::new(
            config.name.clone(),
            api_key,
            config.base_url.clone(),
            config.model.clone(),
            HttpParams {
                max_tokens: config.max_tokens.unwrap_or(defaults.max_tokens),
                temperature: config.temperature.unwrap_or(defaults.temperature),
            },
        )
    }

    fn resolve_params(&self, request: &ProviderRequest) -> (String, HttpParams) {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let temperature = request
            .metadata
            .get("temperature")
            .and_then(|v| v.as_f64())
            .map(|v| v as f32)
            .unwrap_or(self.default_params.temperature);

        (
            model,
            HttpParams {
                max_tokens: request.max_tokens.min(self.default_params.max_tokens).max(1),
                temperature,
            },
        )
    }

    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|msg| ChatMessage {
                role: match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                }
                .to_string(),
                content: msg.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl ProviderClient for OpenAiCompatibleBackend {
    async fn invoke(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let started = Instant::now();
        let (model, params) = self.resolve_params(&request);

        debug!(
            provider = %self.name,
            phase = %request.phase,
            model = %model,
            max_tokens = params.max_tokens,
            "Invoking OpenAI-compatible backend"
        );

        let body = ChatRequest {
            model: model.clone(),
            messages: Self::convert_messages(&request.messages),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: false,
        };

        let http_request = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body);

        let response = self
            .client
            .execute(http_request, request.timeout, &self.name)
            .await?;

        let response_body: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::Transport(format!("Failed to parse chat completion response: {e}"))
        })?;

        let content = response_body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        let model_used = response_body.model.unwrap_or(model);
        let mut result = ProviderResponse::new(content, self.name.clone(), model_used)
            .with_duration(started.elapsed());
        if let Some(usage) = response_body.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }

        Ok(result)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
