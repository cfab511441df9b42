//! Error taxonomy shared across mysterykit crates.
//!
//! Only [`ParameterValidationError`] and [`ConfigError`] are meant to reach a
//! caller of the pipeline. [`ProviderError`] is absorbed by the provider chain
//! and ends up, at most, as a recorded attempt on a phase result.

use std::time::Duration;
use thiserror::Error;

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;

    /// Render message, context and suggestions as a multi-line block for
    /// terminal output.
    fn display_for_user(&self) -> String {
        let mut out = format!("Error: {}", self.user_message());
        if let Some(context) = self.context() {
            out.push_str("\n\n");
            out.push_str(&context);
        }
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            out.push_str("\n\nSuggestions:");
            for suggestion in suggestions {
                out.push_str("\n  - ");
                out.push_str(&suggestion);
            }
        }
        out
    }
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    ProviderIntegration,
    PhaseExecution,
    Internal,
}

/// Configuration errors. Fatal at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Invalid phase graph: {0}")]
    InvalidGraph(String),
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::MissingRequired(key) => format!("Required configuration '{key}' is missing"),
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::InvalidGraph(reason) => format!("Phase graph is malformed: {reason}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with optional [pipeline], [[providers]] and [quality] sections."
                    .to_string(),
            ),
            Self::MissingRequired(_) => None,
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific range requirements."
            )),
            Self::NotFound { .. } => Some(
                "mysterykit searches for .mysterykit/config.toml starting from the current directory upward."
                    .to_string(),
            ),
            Self::InvalidGraph(_) => Some(
                "Every phase dependency must point at a phase in a strictly earlier batch.".to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax using a TOML validator".to_string(),
                "Compare with the example configuration in the README".to_string(),
            ],
            Self::MissingRequired(key) => vec![format!("Add '{key}' to the configuration file")],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "pipeline.deadline_secs" | "pipeline.phase_timeout_secs" => {
                    vec!["Use a whole number of seconds between 5 and 3600".to_string()]
                }
                k if k.starts_with("providers") => vec![
                    "Give every provider a unique name and a supported kind".to_string(),
                    "Supported kinds: anthropic, openai-compatible".to_string(),
                ],
                k if k.starts_with("quality") => vec![
                    "Tier thresholds must satisfy premium >= standard >= basic".to_string(),
                    "Scores and thresholds are on a 0-100 scale".to_string(),
                ],
                _ => vec!["Check the documentation for valid values".to_string()],
            },
            Self::NotFound { path } => vec![
                format!("Create a configuration file at {path}"),
                "Run without --config to use built-in defaults".to_string(),
            ],
            Self::InvalidGraph(_) => vec![
                "Move the dependent phase into a later batch".to_string(),
                "Remove dependencies on phases that are not part of the graph".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Caller-supplied generation parameters were rejected before any phase ran.
///
/// Carries every violation found, not just the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid generation parameters: {}", .violations.join("; "))]
pub struct ParameterValidationError {
    pub violations: Vec<String>,
}

impl ParameterValidationError {
    #[must_use]
    pub fn new(violations: Vec<String>) -> Self {
        Self { violations }
    }
}

impl UserFriendlyError for ParameterValidationError {
    fn user_message(&self) -> String {
        format!(
            "{} generation parameter(s) rejected: {}",
            self.violations.len(),
            self.violations.join("; ")
        )
    }

    fn context(&self) -> Option<String> {
        Some("Parameters are validated before any phase runs; nothing was generated.".to_string())
    }

    fn suggestions(&self) -> Vec<String> {
        vec![
            "Use between 4 and 20 players".to_string(),
            "Provide a short, non-empty setting description".to_string(),
        ]
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

/// Coarse failure class reported by the provider invocation contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderErrorKind {
    Timeout,
    HttpError,
    AuthError,
}

/// Per-attempt failure of a single generation backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Invocation did not finish within its deadline
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Non-success HTTP status other than auth/quota
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Authentication failure (401, 403, missing API key)
    #[error("Provider authentication error: {0}")]
    Auth(String),

    /// Rate limit or quota exceeded (429)
    #[error("Provider quota exceeded: {0}")]
    Quota(String),

    /// Connection, TLS or body decoding failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response parsed but carried no usable text
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// Provider could not be constructed from configuration
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),
}

impl ProviderError {
    /// Map onto the three failure classes of the invocation contract.
    #[must_use]
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            Self::Timeout { .. } => ProviderErrorKind::Timeout,
            Self::Auth(_) | Self::Misconfiguration(_) => ProviderErrorKind::AuthError,
            Self::Http { .. } | Self::Quota(_) | Self::Transport(_) | Self::EmptyResponse => {
                ProviderErrorKind::HttpError
            }
        }
    }
}

impl UserFriendlyError for ProviderError {
    fn user_message(&self) -> String {
        match self {
            Self::Timeout { duration } => {
                format!("Generation provider timed out after {duration:?}")
            }
            Self::Http { status, message } => {
                format!("Generation provider returned HTTP {status}: {message}")
            }
            Self::Auth(msg) => format!("Generation provider authentication failed: {msg}"),
            Self::Quota(msg) => format!("Generation provider quota exceeded: {msg}"),
            Self::Transport(msg) => format!("Generation provider unreachable: {msg}"),
            Self::EmptyResponse => "Generation provider returned no text".to_string(),
            Self::Misconfiguration(msg) => format!("Generation provider misconfigured: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        Some(
            "Provider failures are recovered by trying the next provider; placeholder content is used when all fail."
                .to_string(),
        )
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Auth(_) | Self::Misconfiguration(_) => vec![
                "Check that the environment variable named by api_key_env is set".to_string(),
                "Verify the API key is valid and not expired".to_string(),
            ],
            Self::Timeout { .. } => {
                vec!["Increase the phase timeout in [pipeline.phases.<phase>]".to_string()]
            }
            Self::Quota(_) => vec![
                "Wait a few minutes and try again".to_string(),
                "Add a secondary provider with a different quota".to_string(),
            ],
            _ => vec!["Check the provider's status page for known issues".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Auth(_) | Self::Misconfiguration(_) => ErrorCategory::Configuration,
            Self::Timeout { .. } => ErrorCategory::PhaseExecution,
            _ => ErrorCategory::ProviderIntegration,
        }
    }
}
