//! Generation provider abstraction and fallback chain
//!
//! Every backend implements [`ProviderClient`]. A [`ProviderChain`] tries
//! them in priority order and falls back to deterministic synthetic content
//! when all of them fail, so phase execution never depends on a single
//! provider being healthy.

mod anthropic_backend;
mod chain;
mod fallback;
pub(crate) mod http_client;
mod openai_backend;
pub mod scripted;
mod types;

pub use chain::{AttemptOutcome, ChainOutcome, ProviderAttempt, ProviderChain, ProviderDescriptor};
pub use fallback::{FALLBACK_PROVIDER, FallbackTemplate, SyntheticFallback};
pub use types::{
    META_MIN_LENGTH, META_SECTIONS, Message, ProviderClient, ProviderRequest, ProviderResponse,
    Role,
};
pub use mysterykit_utils::error::{ProviderError, ProviderErrorKind};

pub(crate) use anthropic_backend::AnthropicBackend;
pub(crate) use openai_backend::OpenAiCompatibleBackend;

use std::sync::Arc;

use mysterykit_config::{Config, ConfigError, ProviderConfig, ProviderKind};
use tracing::{info, warn};

/// Default per-provider token ceiling when `max_tokens` is not configured
const DEFAULT_PROVIDER_MAX_TOKENS: u32 = 4096;

/// Construct the client for one `[[providers]]` entry.
///
/// # Errors
///
/// Returns `ProviderError::Misconfiguration` if the API key is missing or
/// the HTTP client cannot be built.
pub fn client_for_provider(
    provider: &ProviderConfig,
) -> Result<Arc<dyn ProviderClient>, ProviderError> {
    Ok(match provider.kind {
        ProviderKind::Anthropic => Arc::new(AnthropicBackend::from_provider_config(provider)?),
        ProviderKind::OpenaiCompatible => {
            Arc::new(OpenAiCompatibleBackend::from_provider_config(provider)?)
        }
    })
}

/// Build the provider chain described by `config.providers`.
///
/// Providers that cannot be constructed (typically a missing API key) are
/// skipped with a warning rather than failing startup; a chain with no
/// usable providers still works and yields synthetic fallback content.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` if provider names collide.
pub fn chain_from_config(config: &Config) -> Result<ProviderChain, ConfigError> {
    let mut descriptors = Vec::with_capacity(config.providers.len());

    for provider in config.providers_by_priority() {
        match client_for_provider(provider) {
            Ok(client) => descriptors.push(ProviderDescriptor::new(
                provider.name.clone(),
                provider.priority,
                provider.max_tokens.unwrap_or(DEFAULT_PROVIDER_MAX_TOKENS),
                client,
            )),
            Err(err) => {
                warn!(
                    provider = %provider.name,
                    kind = %provider.kind,
                    error = %err,
                    "Skipping provider that could not be constructed"
                );
            }
        }
    }

    let chain = ProviderChain::new(descriptors)?;
    info!(providers = ?chain.providers(), "Provider chain ready");
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_from_config_skips_providers_without_keys() {
        let config = Config::from_toml_str(
            r#"
            [[providers]]
            name = "keyed"
            kind = "openai-compatible"
            priority = 2
            model = "m"
            api_key_env = "MYSTERYKIT_LLM_TEST_KEY_PRESENT"

            [[providers]]
            name = "unkeyed"
            kind = "anthropic"
            priority = 1
            model = "m"
            api_key_env = "MYSTERYKIT_LLM_TEST_KEY_ABSENT"
            "#,
        )
        .unwrap();
        unsafe {
            std::env::set_var("MYSTERYKIT_LLM_TEST_KEY_PRESENT", "secret");
            std::env::remove_var("MYSTERYKIT_LLM_TEST_KEY_ABSENT");
        }

        let chain = chain_from_config(&config).unwrap();
        assert_eq!(chain.providers(), vec!["keyed"]);

        unsafe {
            std::env::remove_var("MYSTERYKIT_LLM_TEST_KEY_PRESENT");
        }
    }

    #[test]
    fn test_chain_from_empty_config_is_synthetic_only() {
        let chain = chain_from_config(&Config::default()).unwrap();
        assert!(chain.is_empty());
    }
}
