use std::ffi::OsString;
use std::path::{Path, PathBuf};

use mysterykit_utils::error::ConfigError;
use tracing::debug;

use crate::model::Config;

/// Environment variable naming a configuration file
pub const CONFIG_ENV_VAR: &str = "MYSTERYKIT_CONFIG";

const CONFIG_DIR: &str = ".mysterykit";
const CONFIG_FILE: &str = "config.toml";

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Path given on the command line
    Explicit(PathBuf),
    /// Path from `MYSTERYKIT_CONFIG`
    Environment(PathBuf),
    /// `.mysterykit/config.toml` found walking up from the working directory
    Discovered(PathBuf),
    /// `~/.config/mysterykit/config.toml`
    User(PathBuf),
    /// No file; built-in defaults
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit(p) => write!(f, "cli ({})", p.display()),
            Self::Environment(p) => write!(f, "{CONFIG_ENV_VAR} ({})", p.display()),
            Self::Discovered(p) => write!(f, "discovered ({})", p.display()),
            Self::User(p) => write!(f, "user ({})", p.display()),
            Self::Defaults => write!(f, "defaults"),
        }
    }
}

impl Config {
    /// Discover configuration using CLI semantics.
    ///
    /// Precedence (highest first):
    /// 1. `explicit` path (must exist)
    /// 2. `MYSTERYKIT_CONFIG` environment variable (must exist)
    /// 3. `.mysterykit/config.toml` in the working directory or a parent
    /// 4. `~/.config/mysterykit/config.toml`
    /// 5. Built-in defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` when an explicitly named file is
    /// missing, or a parse/validation error from the file that was selected.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        let cwd = std::env::current_dir().map_err(|e| ConfigError::InvalidFile(format!(
            "cannot determine working directory: {e}"
        )))?;
        let user_dir = dirs::config_dir().map(|dir| dir.join("mysterykit"));
        discover_from(
            explicit,
            std::env::var_os(CONFIG_ENV_VAR),
            &cwd,
            user_dir.as_deref(),
        )
    }
}

pub(crate) fn discover_from(
    explicit: Option<&Path>,
    env_value: Option<OsString>,
    start: &Path,
    user_dir: Option<&Path>,
) -> Result<(Config, ConfigSource), ConfigError> {
    if let Some(path) = explicit {
        return load_required(path).map(|c| (c, ConfigSource::Explicit(path.to_path_buf())));
    }

    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        let path = PathBuf::from(value);
        return load_required(&path).map(|c| (c, ConfigSource::Environment(path)));
    }

    if let Some(path) = find_upward(start) {
        debug!(path = %path.display(), "Using discovered configuration");
        return Config::load(&path).map(|c| (c, ConfigSource::Discovered(path)));
    }

    if let Some(dir) = user_dir {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            debug!(path = %path.display(), "Using user configuration");
            return Config::load(&path).map(|c| (c, ConfigSource::User(path)));
        }
    }

    debug!("No configuration file found, using defaults");
    Ok((Config::default(), ConfigSource::Defaults))
}

fn load_required(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound {
            path: path.display().to_string(),
        });
    }
    Config::load(path)
}

/// Walk up at most 10 directories looking for `.mysterykit/config.toml`
fn find_upward(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    for _ in 0..10 {
        let candidate = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            break;
        }
    }

    None
}
