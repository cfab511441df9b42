use std::collections::HashSet;

use mysterykit_utils::error::ConfigError;
use mysterykit_utils::types::PhaseId;

use crate::model::Config;

fn invalid(key: impl Into<String>, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        // Validate pipeline deadline
        if self.pipeline.deadline_secs < 5 {
            return Err(invalid(
                "pipeline.deadline_secs",
                "must be at least 5 seconds",
            ));
        }
        if self.pipeline.deadline_secs > 3600 {
            return Err(invalid(
                "pipeline.deadline_secs",
                "exceeds maximum limit of 3600 seconds (1 hour)",
            ));
        }

        if let Some(timeout) = self.pipeline.phase_timeout_secs {
            validate_timeout("pipeline.phase_timeout_secs", timeout)?;
        }

        for (key, phase) in &self.pipeline.phases {
            if key.parse::<PhaseId>().is_err() {
                return Err(invalid(
                    format!("pipeline.phases.{key}"),
                    "is not a known phase",
                ));
            }
            if let Some(timeout) = phase.timeout_secs {
                validate_timeout(&format!("pipeline.phases.{key}.timeout_secs"), timeout)?;
            }
            if phase.min_length == Some(0) {
                return Err(invalid(
                    format!("pipeline.phases.{key}.min_length"),
                    "must be greater than 0",
                ));
            }
            if phase.max_tokens == Some(0) {
                return Err(invalid(
                    format!("pipeline.phases.{key}.max_tokens"),
                    "must be greater than 0",
                ));
            }
        }

        // Validate providers
        let mut names = HashSet::new();
        for (index, provider) in self.providers.iter().enumerate() {
            let key = format!("providers[{index}]");
            if provider.name.trim().is_empty() {
                return Err(invalid(format!("{key}.name"), "must not be empty"));
            }
            if !names.insert(provider.name.as_str()) {
                return Err(invalid(
                    format!("{key}.name"),
                    format!("duplicate provider name '{}'", provider.name),
                ));
            }
            if provider.model.trim().is_empty() {
                return Err(invalid(format!("{key}.model"), "must not be empty"));
            }
            if provider.max_tokens == Some(0) {
                return Err(invalid(format!("{key}.max_tokens"), "must be greater than 0"));
            }
            if let Some(temperature) = provider.temperature
                && !(0.0..=2.0).contains(&temperature)
            {
                return Err(invalid(
                    format!("{key}.temperature"),
                    "must be between 0.0 and 2.0",
                ));
            }
        }

        self.validate_quality()
    }

    fn validate_quality(&self) -> Result<(), ConfigError> {
        let q = &self.quality;

        for (key, value) in [
            ("quality.premium", q.premium),
            ("quality.standard", q.standard),
            ("quality.basic", q.basic),
            ("quality.synthetic_score_cap", q.synthetic_score_cap),
            ("quality.duplicate_penalty", q.duplicate_penalty),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(key, "must be between 0 and 100"));
            }
        }

        if !(q.premium >= q.standard && q.standard >= q.basic) {
            return Err(invalid(
                "quality.premium",
                format!(
                    "tiers out of order: premium {} / standard {} / basic {}",
                    q.premium, q.standard, q.basic
                ),
            ));
        }

        for (key, value) in [
            ("quality.length_weight", q.length_weight),
            ("quality.structure_weight", q.structure_weight),
            ("quality.diversity_weight", q.diversity_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(key, "must be a finite, non-negative number"));
            }
        }
        if q.length_weight + q.structure_weight + q.diversity_weight <= 0.0 {
            return Err(invalid(
                "quality.length_weight",
                "at least one metric weight must be positive",
            ));
        }

        if !(0.0..=1.0).contains(&q.metric_threshold) {
            return Err(invalid("quality.metric_threshold", "must be between 0.0 and 1.0"));
        }
        if !(q.diversity_target > 0.0 && q.diversity_target <= 1.0) {
            return Err(invalid(
                "quality.diversity_target",
                "must be greater than 0.0 and at most 1.0",
            ));
        }
        if q.duplicate_tolerance == 0 {
            return Err(invalid("quality.duplicate_tolerance", "must be at least 1"));
        }

        Ok(())
    }
}

fn validate_timeout(key: &str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(invalid(key, "must be at least 1 second"));
    }
    if secs > 600 {
        return Err(invalid(key, "exceeds maximum limit of 600 seconds"));
    }
    Ok(())
}
