//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, initializes tracing, discovers configuration,
//! creates the tokio runtime and dispatches to a command. It owns all error
//! output; main.rs only maps the returned code to the process exit status.

use clap::Parser;
use mysterykit_config::Config;
use mysterykit_utils::error::UserFriendlyError;
use mysterykit_utils::exit_codes::ExitCode;
use mysterykit_utils::logging::{LogFormat, init_tracing};
use tracing::debug;

use super::args::{Cli, Commands};
use super::commands::{self, CommandError, ProviderMode};

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` after the error has already been printed.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else if cli.verbose {
        LogFormat::Verbose
    } else {
        LogFormat::Compact
    };
    if let Err(e) = init_tracing(format) {
        eprintln!("warning: failed to initialize logging: {e}");
    }

    let (config, source) = match Config::discover(cli.config.as_deref()) {
        Ok(found) => found,
        Err(err) => {
            eprintln!("{}", err.display_for_user());
            return Err(ExitCode::CONFIGURATION);
        }
    };
    debug!(source = %source, "Configuration loaded");

    let mode = if cli.offline {
        ProviderMode::Offline
    } else if cli.demo {
        ProviderMode::Demo
    } else {
        ProviderMode::Configured
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    let result = match cli.command {
        Commands::Generate {
            players,
            setting,
            era,
            tone,
            difficulty,
            json,
        } => {
            let request = commands::GenerateRequest {
                players,
                setting,
                era,
                tone,
                difficulty,
                json,
            };
            runtime.block_on(commands::generate(&config, mode, request))
        }
        Commands::Plan { json } => {
            commands::plan(&config, &source, mode, json).map_err(CommandError::from)
        }
    };

    result.map_err(|err| {
        eprintln!("{}", err.display_for_user());
        err.exit_code()
    })
}
