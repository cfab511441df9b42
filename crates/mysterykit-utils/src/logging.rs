//! Tracing setup and structured log helpers.

use std::io::IsTerminal;
use tracing::{Level, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, minimal
    #[default]
    Compact,
    /// Compact with targets and span close events carrying durations
    Verbose,
    /// One JSON object per event, for log shippers
    Json,
}

/// Check if colored output should be used.
///
/// Returns true only if stderr is a terminal and `NO_COLOR` is not set.
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Default filter directive when `RUST_LOG` is not set.
fn default_directive(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Verbose => "mysterykit=debug,info",
        LogFormat::Compact | LogFormat::Json => "mysterykit=info,warn",
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the format's default filter. Logs go to
/// stderr so that JSON results on stdout stay machine-readable.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_tracing(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(format)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Compact => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_color())
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?,
        LogFormat::Verbose => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_color())
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?,
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()?,
    }

    Ok(())
}

/// Span covering one pipeline run.
pub fn session_span(session_id: &str) -> tracing::Span {
    span!(Level::INFO, "generation_session", session_id = %session_id)
}

/// Span covering one phase execution inside a session.
pub fn phase_span(session_id: &str, phase: &str, batch: usize) -> tracing::Span {
    span!(
        Level::INFO,
        "phase_execution",
        session_id = %session_id,
        phase = %phase,
        batch = batch,
    )
}
