//! Gate policy: tier boundaries, weights and thresholds.

use mysterykit_config::QualityConfig;
use serde::{Deserialize, Serialize};

/// Readiness of a generated kit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadinessTier {
    Insufficient,
    Basic,
    Standard,
    Premium,
}

impl ReadinessTier {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insufficient => "INSUFFICIENT",
            Self::Basic => "BASIC",
            Self::Standard => "STANDARD",
            Self::Premium => "PREMIUM",
        }
    }
}

impl std::fmt::Display for ReadinessTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoring policy, normally built from `[quality]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatePolicy {
    pub premium: f64,
    pub standard: f64,
    pub basic: f64,
    pub length_weight: f64,
    pub structure_weight: f64,
    pub diversity_weight: f64,
    pub metric_threshold: f64,
    pub diversity_target: f64,
    pub duplicate_tolerance: usize,
    pub duplicate_penalty: f64,
    pub synthetic_score_cap: f64,
}

impl GatePolicy {
    #[must_use]
    pub fn from_config(quality: &QualityConfig) -> Self {
        Self {
            premium: quality.premium,
            standard: quality.standard,
            basic: quality.basic,
            length_weight: quality.length_weight,
            structure_weight: quality.structure_weight,
            diversity_weight: quality.diversity_weight,
            metric_threshold: quality.metric_threshold,
            diversity_target: quality.diversity_target,
            duplicate_tolerance: quality.duplicate_tolerance,
            duplicate_penalty: quality.duplicate_penalty,
            synthetic_score_cap: quality.synthetic_score_cap,
        }
    }

    /// Map an overall score onto a tier. Boundaries are inclusive.
    #[must_use]
    pub fn tier_for(&self, score: f64) -> ReadinessTier {
        if score >= self.premium {
            ReadinessTier::Premium
        } else if score >= self.standard {
            ReadinessTier::Standard
        } else if score >= self.basic {
            ReadinessTier::Basic
        } else {
            ReadinessTier::Insufficient
        }
    }
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self::from_config(&QualityConfig::default())
    }
}
