//! CLI argument definitions

use clap::{Parser, Subcommand};
use mysterykit_phase_api::Difficulty;
use std::path::PathBuf;

/// mysterykit - generate murder-mystery party kits with LLM providers
#[derive(Parser, Debug)]
#[command(name = "mysterykit")]
#[command(about = "Generate murder-mystery party kits through a phase-batched LLM pipeline")]
#[command(long_about = r#"
mysterykit generates a complete murder-mystery party kit in eight phases,
run in four dependency-ordered batches. Each phase tries the configured
providers in priority order and falls back to a deterministic placeholder
when none answers. The finished kit is scored and assigned a readiness tier.

EXAMPLES:
  # Generate a kit for eight players
  mysterykit generate --players 8 --setting "a snowbound Alpine hotel"

  # Full JSON outcome for the assembler
  mysterykit generate --players 6 --setting "a riverboat casino" --json

  # Exercise the pipeline without network access
  mysterykit --demo generate --players 5 --setting "an orbital station"

  # Show the batch plan with effective timeouts
  mysterykit plan

CONFIGURATION:
  Discovered from --config, then $MYSTERYKIT_CONFIG, then
  .mysterykit/config.toml searching upward from the working directory,
  then ~/.config/mysterykit/config.toml, then built-in defaults.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use no providers; every phase gets placeholder content
    #[arg(long, global = true, conflicts_with = "demo")]
    pub offline: bool,

    /// Use built-in scripted providers instead of real ones
    #[arg(long, global = true)]
    pub demo: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate and score a mystery kit
    Generate {
        /// Number of players (4-20)
        #[arg(long, short = 'p')]
        players: u32,

        /// Where the mystery takes place
        #[arg(long, short = 's')]
        setting: String,

        /// Historical period, e.g. "1920s"
        #[arg(long)]
        era: Option<String>,

        /// Overall mood, e.g. "comedic"
        #[arg(long)]
        tone: Option<String>,

        /// easy, medium or hard
        #[arg(long, default_value = "medium")]
        difficulty: Difficulty,

        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the validated batch plan
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
}
