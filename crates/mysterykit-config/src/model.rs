use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use mysterykit_utils::error::ConfigError;
use mysterykit_utils::types::PhaseId;

/// Default global pipeline deadline in seconds
pub const DEFAULT_DEADLINE_SECS: u64 = 240;

/// Configuration for mysterykit.
///
/// Every section is optional; an empty file (or no file) yields a valid
/// configuration with no providers, which makes every phase use synthetic
/// fallback content.
///
/// # Example
///
/// ```rust
/// use mysterykit_config::Config;
///
/// let config = Config::from_toml_str(r#"
///     [pipeline]
///     deadline_secs = 120
///
///     [[providers]]
///     name = "groq"
///     kind = "openai-compatible"
///     priority = 1
///     model = "llama-3.3-70b-versatile"
///     base_url = "https://api.groq.com/openai/v1/chat/completions"
///     api_key_env = "GROQ_API_KEY"
/// "#)?;
///
/// assert_eq!(config.pipeline.deadline_secs, 120);
/// assert_eq!(config.providers.len(), 1);
/// # Ok::<(), mysterykit_config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub quality: QualityConfig,
}

impl Config {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidFile` on TOML syntax or schema errors and
    /// `ConfigError::InvalidValue` when a value is out of range.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::InvalidFile(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file cannot be read, otherwise
    /// the errors of [`Config::from_toml_str`].
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::NotFound {
            path: path.display().to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Providers sorted by priority; equal priorities keep declaration order.
    #[must_use]
    pub fn providers_by_priority(&self) -> Vec<&ProviderConfig> {
        let mut providers: Vec<&ProviderConfig> = self.providers.iter().collect();
        providers.sort_by_key(|p| p.priority);
        providers
    }
}

/// `[pipeline]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Global ceiling on pipeline latency. Batches that would start after
    /// it are skipped and recorded as degraded.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    /// Per-attempt timeout applied to every phase without its own override
    #[serde(default)]
    pub phase_timeout_secs: Option<u64>,
    /// Per-phase overrides keyed by phase name (e.g. `characterProfiles`)
    #[serde(default)]
    pub phases: BTreeMap<String, PhaseOverride>,
}

fn default_deadline_secs() -> u64 {
    DEFAULT_DEADLINE_SECS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deadline_secs: DEFAULT_DEADLINE_SECS,
            phase_timeout_secs: None,
            phases: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    /// Look up the override for a phase. Keys match case-insensitively.
    #[must_use]
    pub fn phase_override(&self, phase: PhaseId) -> Option<&PhaseOverride> {
        self.phases
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(phase.as_str()))
            .map(|(_, value)| value)
    }
}

/// `[pipeline.phases.<phase>]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseOverride {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

/// Wire protocol spoken by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI-style chat completions (OpenAI, OpenRouter, Groq, ...)
    OpenaiCompatible,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenaiCompatible => write!(f, "openai-compatible"),
        }
    }
}

/// One `[[providers]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    pub kind: ProviderKind,
    /// Lower runs first
    #[serde(default = "default_priority")]
    pub priority: u32,
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_priority() -> u32 {
    100
}

impl ProviderConfig {
    /// Environment variable consulted for the API key
    #[must_use]
    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(match self.kind {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenaiCompatible => "OPENAI_API_KEY",
        })
    }
}

/// `[quality]` section: weights, thresholds and tier boundaries used by the
/// quality gate. Scores are on a 0-100 scale, component thresholds on 0-1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub premium: f64,
    pub standard: f64,
    pub basic: f64,
    pub length_weight: f64,
    pub structure_weight: f64,
    pub diversity_weight: f64,
    /// A metric below this value produces an improvement suggestion
    pub metric_threshold: f64,
    /// Unique-word ratio that earns the full diversity score
    pub diversity_target: f64,
    /// Occurrences of one normalized line allowed before it is penalized
    pub duplicate_tolerance: usize,
    /// Points removed when every line is an excess duplicate
    pub duplicate_penalty: f64,
    /// Ceiling for phases whose content is not a provider response
    pub synthetic_score_cap: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            premium: 90.0,
            standard: 80.0,
            basic: 70.0,
            length_weight: 40.0,
            structure_weight: 30.0,
            diversity_weight: 30.0,
            metric_threshold: 0.7,
            diversity_target: 0.35,
            duplicate_tolerance: 2,
            duplicate_penalty: 30.0,
            synthetic_score_cap: 40.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.pipeline.deadline(), Duration::from_secs(240));
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_full_document_parses() {
        let config = Config::from_toml_str(
            r#"
            [pipeline]
            deadline_secs = 90
            phase_timeout_secs = 20

            [pipeline.phases.characterProfiles]
            timeout_secs = 45
            min_length = 1200

            [[providers]]
            name = "fast"
            kind = "openai-compatible"
            priority = 1
            model = "llama"

            [[providers]]
            name = "careful"
            kind = "anthropic"
            priority = 2
            model = "claude"
            api_key_env = "MY_KEY"
            max_tokens = 4096

            [quality]
            premium = 92.5
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.phase_timeout_secs, Some(20));
        let profiles = config
            .pipeline
            .phase_override(PhaseId::CharacterProfiles)
            .unwrap();
        assert_eq!(profiles.timeout_secs, Some(45));
        assert_eq!(profiles.min_length, Some(1200));
        assert!(config.pipeline.phase_override(PhaseId::Timeline).is_none());

        assert_eq!(config.providers[0].kind, ProviderKind::OpenaiCompatible);
        assert_eq!(config.providers[0].api_key_env(), "OPENAI_API_KEY");
        assert_eq!(config.providers[1].api_key_env(), "MY_KEY");
        assert_eq!(config.quality.premium, 92.5);
        assert_eq!(config.quality.standard, 80.0);
    }

    #[test]
    fn test_providers_by_priority_is_stable() {
        let config = Config::from_toml_str(
            r#"
            [[providers]]
            name = "b"
            kind = "anthropic"
            priority = 2
            model = "m"

            [[providers]]
            name = "a"
            kind = "anthropic"
            priority = 1
            model = "m"

            [[providers]]
            name = "c"
            kind = "anthropic"
            priority = 2
            model = "m"
            "#,
        )
        .unwrap();

        let names: Vec<&str> = config
            .providers_by_priority()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_invalid_toml_is_invalid_file() {
        let err = Config::from_toml_str("[pipeline\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile(_)));
    }

    #[test]
    fn test_unknown_provider_kind_is_invalid_file() {
        let err = Config::from_toml_str(
            r#"
            [[providers]]
            name = "x"
            kind = "carrier-pigeon"
            model = "m"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile(_)));
    }
}
