use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifier of a task within one project.
pub type TaskId = i64;

/// A unit of work fed into the critical-path analysis.
///
/// `duration` is expressed in the unit configured on
/// [`AnalysisConfig`](crate::config::AnalysisConfig) (hours by default);
/// fixed start offsets are always expressed in days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub title: String,
    pub duration: f64,
    /// Start-no-earlier-than offset from project start, in days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_start_offset_days: Option<f64>,
    /// Calendar form of the fixed start; resolved against the project's work
    /// calendar by [`Schedule`](crate::schedule::Schedule).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_start_date: Option<NaiveDate>,
    /// Percent complete, 0 to 100.
    #[serde(default)]
    pub progress: u8,
}

impl Task {
    pub fn new(id: TaskId, title: impl Into<String>, duration: f64) -> Self {
        Self {
            id,
            title: title.into(),
            duration,
            fixed_start_offset_days: None,
            fixed_start_date: None,
            progress: 0,
        }
    }

    pub fn with_fixed_start_offset(mut self, offset_days: f64) -> Self {
        self.fixed_start_offset_days = Some(offset_days);
        self
    }

    pub fn with_fixed_start_date(mut self, date: NaiveDate) -> Self {
        self.fixed_start_date = Some(date);
        self
    }

    pub fn with_progress(mut self, percent: u8) -> Self {
        self.progress = percent;
        self
    }

    pub fn is_started(&self) -> bool {
        self.progress > 0
    }

    pub fn is_completed(&self) -> bool {
        self.progress >= 100
    }

    pub(crate) fn has_valid_progress(&self) -> bool {
        self.progress <= 100
    }

    pub(crate) fn has_valid_duration(&self) -> bool {
        self.duration.is_finite() && self.duration >= 0.0
    }

    pub(crate) fn has_valid_fixed_start(&self) -> bool {
        self.fixed_start_offset_days
            .map(|offset| offset.is_finite() && offset >= 0.0)
            .unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_helpers_set_optional_fields() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 12).unwrap();
        let task = Task::new(7, "Wire drivetrain", 6.0)
            .with_fixed_start_offset(2.0)
            .with_fixed_start_date(start);
        assert_eq!(task.fixed_start_offset_days, Some(2.0));
        assert_eq!(task.fixed_start_date, Some(start));
    }

    #[test]
    fn negative_and_nan_durations_are_invalid() {
        assert!(Task::new(1, "ok", 0.0).has_valid_duration());
        assert!(!Task::new(1, "neg", -1.0).has_valid_duration());
        assert!(!Task::new(1, "nan", f64::NAN).has_valid_duration());
        assert!(!Task::new(1, "off", 1.0)
            .with_fixed_start_offset(-0.5)
            .has_valid_fixed_start());
    }

    #[test]
    fn deserializes_camel_case_payload() {
        let task: Task = serde_json::from_str(
            r#"{"id": 3, "title": "Bumpers", "duration": 4.5, "fixedStartOffsetDays": 1.0}"#,
        )
        .unwrap();
        assert_eq!(task.id, 3);
        assert_eq!(task.fixed_start_offset_days, Some(1.0));
        assert_eq!(task.fixed_start_date, None);
        assert_eq!(task.progress, 0);
    }

    #[test]
    fn progress_drives_started_and_completed() {
        let fresh = Task::new(1, "Cut panels", 3.0);
        assert!(!fresh.is_started());
        assert!(!fresh.is_completed());

        let halfway = fresh.clone().with_progress(50);
        assert!(halfway.is_started());
        assert!(!halfway.is_completed());

        let done = fresh.clone().with_progress(100);
        assert!(done.is_completed());
        assert!(done.has_valid_progress());
        assert!(!fresh.with_progress(120).has_valid_progress());
    }
}
