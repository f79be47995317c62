use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall schedule risk derived from the critical-path metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    /// One level up, saturating at `Critical`.
    pub fn escalate(self) -> Self {
        match self {
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium => RiskLevel::High,
            RiskLevel::High | RiskLevel::Critical => RiskLevel::Critical,
        }
    }

    pub fn is_high_risk(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold policy used to classify an analysis.
///
/// The defaults are placeholders for the team's business rule; every value
/// can be overridden through [`AnalysisConfig`](crate::config::AnalysisConfig).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskPolicy {
    /// Critical-task share (percent) at which the level becomes MEDIUM.
    pub medium_threshold_pct: f64,
    /// Critical-task share (percent) at which the level becomes HIGH.
    pub high_threshold_pct: f64,
    /// Critical-task share (percent) at which the level becomes CRITICAL.
    pub critical_threshold_pct: f64,
    /// Non-critical tasks with less float than this (days) escalate the level.
    pub near_critical_float_days: f64,
    /// Lags longer than this (days) on critical edges are reported.
    pub long_lag_days: i32,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            medium_threshold_pct: 25.0,
            high_threshold_pct: 50.0,
            critical_threshold_pct: 75.0,
            near_critical_float_days: 1.0,
            long_lag_days: 1,
        }
    }
}

impl RiskPolicy {
    fn band(&self, critical_pct: f64) -> RiskLevel {
        if critical_pct >= self.critical_threshold_pct {
            RiskLevel::Critical
        } else if critical_pct >= self.high_threshold_pct {
            RiskLevel::High
        } else if critical_pct >= self.medium_threshold_pct {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// `min_nonzero_float_days` is the smallest positive float among
    /// non-critical tasks, already converted to days.
    pub fn classify(&self, critical_pct: f64, min_nonzero_float_days: Option<f64>) -> RiskLevel {
        let level = self.band(critical_pct);
        match min_nonzero_float_days {
            Some(float_days) if float_days < self.near_critical_float_days => level.escalate(),
            _ => level,
        }
    }

    pub(crate) fn is_ordered(&self) -> bool {
        0.0 <= self.medium_threshold_pct
            && self.medium_threshold_pct <= self.high_threshold_pct
            && self.high_threshold_pct <= self.critical_threshold_pct
            && self.critical_threshold_pct <= 100.0
    }
}
