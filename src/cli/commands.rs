//! Command implementations

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use mysterykit_config::{Config, ConfigSource};
use mysterykit_engine::{GenerationOutcome, Pipeline, PipelineError};
use mysterykit_llm::scripted::{Behavior, ScriptedProvider};
use mysterykit_llm::{ProviderChain, ProviderDescriptor};
use mysterykit_phase_api::{Difficulty, GenerationParams};
use mysterykit_phases::default_graph;
use mysterykit_utils::error::{ConfigError, ErrorCategory, UserFriendlyError};
use mysterykit_utils::exit_codes::ExitCode;
use serde_json::json;
use thiserror::Error;

/// Failures a command can end with
#[derive(Error, Debug)]
pub(crate) enum CommandError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Failed to write output: {0:#}")]
    Output(anyhow::Error),
}

impl CommandError {
    pub(crate) fn exit_code(&self) -> ExitCode {
        match self {
            Self::Pipeline(e) => e.exit_code(),
            Self::Output(_) => ExitCode::INTERNAL,
        }
    }
}

impl UserFriendlyError for CommandError {
    fn user_message(&self) -> String {
        match self {
            Self::Pipeline(e) => e.user_message(),
            Self::Output(_) => self.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Pipeline(e) => e.context(),
            Self::Output(_) => {
                Some("The kit was generated but could not be written to stdout.".to_string())
            }
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Pipeline(e) => e.suggestions(),
            Self::Output(_) => vec![
                "Check that the receiving end of the pipe is still reading".to_string(),
                "Redirect output to a file instead".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Pipeline(e) => e.category(),
            Self::Output(_) => ErrorCategory::Internal,
        }
    }
}

/// Where provider content comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProviderMode {
    /// `[[providers]]` from configuration
    Configured,
    /// Built-in scripted providers, no network
    Demo,
    /// No providers at all
    Offline,
}

pub(crate) struct GenerateRequest {
    pub players: u32,
    pub setting: String,
    pub era: Option<String>,
    pub tone: Option<String>,
    pub difficulty: Difficulty,
    pub json: bool,
}

impl GenerateRequest {
    fn params(&self) -> GenerationParams {
        let mut params =
            GenerationParams::new(self.players, self.setting.clone()).with_difficulty(self.difficulty);
        if let Some(era) = &self.era {
            params = params.with_era(era.clone());
        }
        if let Some(tone) = &self.tone {
            params = params.with_tone(tone.clone());
        }
        params
    }
}

fn demo_chain() -> Result<ProviderChain, ConfigError> {
    let primary = ScriptedProvider::new("demo-primary", Behavior::succeed_after(Duration::from_millis(250)));
    let secondary =
        ScriptedProvider::new("demo-secondary", Behavior::succeed_after(Duration::from_millis(400)));
    ProviderChain::new(vec![
        ProviderDescriptor::new("demo-primary", 1, 4096, Arc::new(primary)),
        ProviderDescriptor::new("demo-secondary", 2, 4096, Arc::new(secondary)),
    ])
}

fn build_pipeline(config: &Config, mode: ProviderMode) -> Result<Pipeline, PipelineError> {
    match mode {
        ProviderMode::Configured => Pipeline::from_config(config),
        ProviderMode::Demo => Pipeline::with_chain(config, demo_chain()?),
        ProviderMode::Offline => Pipeline::with_chain(config, ProviderChain::synthetic_only()),
    }
}

pub(crate) async fn generate(
    config: &Config,
    mode: ProviderMode,
    request: GenerateRequest,
) -> Result<(), CommandError> {
    let pipeline = build_pipeline(config, mode)?;
    let outcome = pipeline.generate(request.params()).await?;

    let stdout = std::io::stdout();
    emit(&mut stdout.lock(), &outcome, request.json).map_err(CommandError::Output)
}

fn emit<W: Write>(out: &mut W, outcome: &GenerationOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        let rendered =
            serde_json::to_string_pretty(outcome).context("Failed to serialize outcome")?;
        writeln!(out, "{rendered}").context("Failed to emit outcome JSON")?;
    } else {
        write!(out, "{}", render_summary(outcome)).context("Failed to emit summary")?;
    }
    out.flush().context("Failed to flush output")?;
    Ok(())
}

fn render_summary(outcome: &GenerationOutcome) -> String {
    use mysterykit_gate::SessionView;
    use std::fmt::Write as _;

    let report = &outcome.report;
    let mut out = String::new();
    let _ = writeln!(out, "Session {}", outcome.session.id());
    let _ = writeln!(out, "  {}", outcome.session.params().summary());
    let _ = writeln!(out);
    for (phase, result) in outcome.session.results() {
        let score = report.phases.get(phase).map_or(0.0, |s| s.score);
        let _ = writeln!(
            out,
            "  {:<18} {:<9} {:>5.1}  {} ({} ms)",
            phase.to_string(),
            result.status.to_string(),
            score,
            result.provider,
            result.duration_ms
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Overall: {:.1} ({})", report.overall, report.tier);
    if !report.suggestions.is_empty() {
        let _ = writeln!(out, "Suggestions:");
        for suggestion in &report.suggestions {
            let _ = writeln!(out, "  - [{}] {}", suggestion.metric, suggestion.message);
        }
    }
    out
}

pub(crate) fn plan(
    config: &Config,
    source: &ConfigSource,
    mode: ProviderMode,
    json: bool,
) -> Result<(), PipelineError> {
    let graph = default_graph(&config.pipeline)?;
    let providers: Vec<String> = match mode {
        ProviderMode::Configured => config
            .providers_by_priority()
            .iter()
            .map(|p| p.name.clone())
            .collect(),
        ProviderMode::Demo => demo_chain()?.providers().iter().map(|s| s.to_string()).collect(),
        ProviderMode::Offline => Vec::new(),
    };

    if json {
        let batches: Vec<_> = graph
            .batches()
            .iter()
            .map(|batch| {
                batch
                    .iter()
                    .map(|spec| {
                        json!({
                            "phase": spec.id(),
                            "name": spec.name(),
                            "dependencies": spec.dependencies,
                            "timeout_secs": spec.timeout.as_secs(),
                            "min_length": spec.min_length,
                            "max_tokens": spec.max_tokens,
                        })
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        let plan = json!({
            "config_source": source.to_string(),
            "deadline_secs": config.pipeline.deadline().as_secs(),
            "providers": providers,
            "batches": batches,
        });
        println!("{plan:#}");
        return Ok(());
    }

    println!("Configuration: {source}");
    println!("Deadline: {}s", config.pipeline.deadline().as_secs());
    if providers.is_empty() {
        println!("Providers: none (placeholder content only)");
    } else {
        println!("Providers: {}", providers.join(" → "));
    }
    for (index, batch) in graph.batches().iter().enumerate() {
        println!("Batch {}:", index + 1);
        for spec in batch {
            let deps: Vec<String> = spec.dependencies.iter().map(ToString::to_string).collect();
            println!(
                "  {:<18} timeout {:>3}s  min {:>5} chars  after [{}]",
                spec.id().to_string(),
                spec.timeout.as_secs(),
                spec.min_length,
                deps.join(", ")
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysterykit_engine::SessionState;
    use mysterykit_gate::ReadinessTier;

    fn request() -> GenerateRequest {
        GenerateRequest {
            players: 6,
            setting: "Manor".to_string(),
            era: Some("1920s".to_string()),
            tone: None,
            difficulty: Difficulty::Easy,
            json: false,
        }
    }

    #[test]
    fn test_request_params() {
        let params = request().params();
        assert_eq!(params.player_count, 6);
        assert_eq!(params.era.as_deref(), Some("1920s"));
        assert_eq!(params.difficulty, Difficulty::Easy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_pipeline_is_premium() {
        let pipeline = build_pipeline(&Config::default(), ProviderMode::Demo).unwrap();
        let outcome = pipeline.generate(request().params()).await.unwrap();
        assert_eq!(outcome.session.state(), SessionState::Scored);
        assert_eq!(outcome.report.tier, ReadinessTier::Premium);

        let summary = render_summary(&outcome);
        assert!(summary.contains("demo-primary"));
        assert!(summary.contains("PREMIUM"));
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_failure_is_reported_with_nonzero_exit() {
        let pipeline = build_pipeline(&Config::default(), ProviderMode::Offline).unwrap();
        let outcome = pipeline.generate(request().params()).await.unwrap();

        let err = emit(&mut ClosedPipe, &outcome, true).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to emit outcome JSON"));

        let err = CommandError::Output(err);
        assert_eq!(err.exit_code(), ExitCode::INTERNAL);
        assert!(err.display_for_user().contains("Redirect output"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_writes_parseable_json() {
        let pipeline = build_pipeline(&Config::default(), ProviderMode::Offline).unwrap();
        let outcome = pipeline.generate(request().params()).await.unwrap();

        let mut buf = Vec::new();
        emit(&mut buf, &outcome, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["session"]["state"], "SCORED");
    }

    #[test]
    fn test_pipeline_errors_keep_their_exit_code() {
        let err = CommandError::from(PipelineError::Configuration(ConfigError::MissingRequired(
            "providers".into(),
        )));
        assert_eq!(err.exit_code(), ExitCode::CONFIGURATION);
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_summary_lists_suggestions() {
        let pipeline = build_pipeline(&Config::default(), ProviderMode::Offline).unwrap();
        let outcome = pipeline.generate(request().params()).await.unwrap();
        let summary = render_summary(&outcome);
        assert!(summary.contains("INSUFFICIENT"));
        assert!(summary.contains("Suggestions:"));
        assert!(summary.contains("fallback-synthetic"));
    }
}
