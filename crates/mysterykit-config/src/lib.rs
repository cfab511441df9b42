//! Configuration for mysterykit.
//!
//! Configuration is plain data: provider credentials are referenced by the
//! name of an environment variable and resolved when the provider chain is
//! built, never stored here.

mod discovery;
mod model;
mod validation;

pub use discovery::{CONFIG_ENV_VAR, ConfigSource};
pub use model::{
    Config, PhaseOverride, PipelineConfig, ProviderConfig, ProviderKind, QualityConfig,
};
pub use mysterykit_utils::error::ConfigError;
