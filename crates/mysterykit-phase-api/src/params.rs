use std::fmt;
use std::str::FromStr;

use mysterykit_utils::error::ParameterValidationError;
use serde::{Deserialize, Serialize};

pub const MIN_PLAYERS: u32 = 4;
pub const MAX_PLAYERS: u32 = 20;
const MAX_SETTING_CHARS: usize = 200;
const MAX_SHORT_FIELD_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty '{0}' (expected easy, medium or hard)")]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(UnknownDifficulty(s.to_string())),
        }
    }
}

/// Caller-supplied inputs for one generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub player_count: u32,
    /// Where the mystery takes place, e.g. "a snowbound Alpine hotel"
    pub setting: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub era: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
}

impl GenerationParams {
    #[must_use]
    pub fn new(player_count: u32, setting: impl Into<String>) -> Self {
        Self {
            player_count,
            setting: setting.into(),
            era: None,
            tone: None,
            difficulty: Difficulty::default(),
        }
    }

    #[must_use]
    pub fn with_era(mut self, era: impl Into<String>) -> Self {
        self.era = Some(era.into());
        self
    }

    #[must_use]
    pub fn with_tone(mut self, tone: impl Into<String>) -> Self {
        self.tone = Some(tone.into());
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Check every field and report all violations at once.
    ///
    /// # Errors
    ///
    /// Returns `ParameterValidationError` listing each rejected field.
    pub fn validate(&self) -> Result<(), ParameterValidationError> {
        let mut violations = Vec::new();

        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.player_count) {
            violations.push(format!(
                "player_count must be between {MIN_PLAYERS} and {MAX_PLAYERS} (got {})",
                self.player_count
            ));
        }

        if self.setting.trim().is_empty() {
            violations.push("setting must not be empty".to_string());
        } else if self.setting.chars().count() > MAX_SETTING_CHARS {
            violations.push(format!(
                "setting must be at most {MAX_SETTING_CHARS} characters"
            ));
        }

        for (field, value) in [("era", &self.era), ("tone", &self.tone)] {
            if let Some(value) = value
                && value.chars().count() > MAX_SHORT_FIELD_CHARS
            {
                violations.push(format!(
                    "{field} must be at most {MAX_SHORT_FIELD_CHARS} characters"
                ));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ParameterValidationError::new(violations))
        }
    }

    /// One-line human summary used in prompts and placeholder content
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} players", self.player_count),
            self.setting.trim().to_string(),
        ];
        if let Some(era) = self.era.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            parts.push(era.to_string());
        }
        if let Some(tone) = self.tone.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            parts.push(format!("{tone} tone"));
        }
        parts.push(format!("{} difficulty", self.difficulty));
        parts.join(", ")
    }
}
