use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

use crate::risk::RiskPolicy;

pub const ENV_DURATION_UNIT: &str = "CRITICAL_PATH_DURATION_UNIT";
pub const ENV_HOURS_PER_DAY: &str = "CRITICAL_PATH_HOURS_PER_DAY";
pub const ENV_FLOAT_EPSILON: &str = "CRITICAL_PATH_FLOAT_EPSILON";
/// Path of a JSON config file loaded before the other overrides.
pub const ENV_CONFIG_FILE: &str = "CRITICAL_PATH_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Unit shared by task durations, floats and the total duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    #[default]
    Hours,
    Days,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Hours => "hours",
            DurationUnit::Days => "days",
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DurationUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hours" | "hour" | "h" => Ok(DurationUnit::Hours),
            "days" | "day" | "d" => Ok(DurationUnit::Days),
            other => Err(ConfigError::InvalidValue {
                key: ENV_DURATION_UNIT.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub duration_unit: DurationUnit,
    /// Hours in one day when durations are expressed in hours; lags and
    /// fixed start offsets (always days) are scaled by it.
    pub hours_per_day: f64,
    /// Floats within this distance of zero count as zero.
    pub float_epsilon: f64,
    pub risk: RiskPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            duration_unit: DurationUnit::Hours,
            hours_per_day: 24.0,
            float_epsilon: 1e-9,
            risk: RiskPolicy::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn in_days() -> Self {
        Self {
            duration_unit: DurationUnit::Days,
            ..Self::default()
        }
    }

    /// Multiplier turning a day count into the configured unit.
    pub fn units_per_day(&self) -> f64 {
        match self.duration_unit {
            DurationUnit::Hours => self.hours_per_day,
            DurationUnit::Days => 1.0,
        }
    }

    pub fn days_to_units(&self, days: f64) -> f64 {
        days * self.units_per_day()
    }

    pub fn units_to_days(&self, units: f64) -> f64 {
        units / self.units_per_day()
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// `CRITICAL_PATH_CONFIG` file (or the defaults) overlaid with the
    /// other `CRITICAL_PATH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base = match std::env::var(ENV_CONFIG_FILE) {
            Ok(path) => Self::from_json_file(path)?,
            Err(_) => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from any key lookup (environment, CLI flags, tests).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(unit) = lookup(ENV_DURATION_UNIT) {
            self.duration_unit = unit.parse()?;
        }
        if let Some(raw) = lookup(ENV_HOURS_PER_DAY) {
            self.hours_per_day = parse_f64(ENV_HOURS_PER_DAY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FLOAT_EPSILON) {
            self.float_epsilon = parse_f64(ENV_FLOAT_EPSILON, &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.hours_per_day.is_finite() || self.hours_per_day <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "hours_per_day must be positive (got {})",
                self.hours_per_day
            )));
        }
        if !self.float_epsilon.is_finite() || self.float_epsilon < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "float_epsilon must be non-negative (got {})",
                self.float_epsilon
            )));
        }
        if !self.risk.is_ordered() {
            return Err(ConfigError::Invalid(
                "risk thresholds must satisfy 0 <= medium <= high <= critical <= 100".to_string(),
            ));
        }
        if !self.risk.near_critical_float_days.is_finite() || self.risk.near_critical_float_days < 0.0
        {
            return Err(ConfigError::Invalid(format!(
                "near_critical_float_days must be non-negative (got {})",
                self.risk.near_critical_float_days
            )));
        }
        Ok(())
    }
}

fn parse_f64(key: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim().parse::<f64>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: raw.to_string(),
    })
}
