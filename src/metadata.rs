use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    pub project_name: String,
    #[serde(default)]
    pub project_description: String,
    /// Offset zero of every analysis maps onto this date.
    pub project_start_date: NaiveDate,
    /// Target finish used for the horizon warning; analysis never depends on it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_goal_date: Option<NaiveDate>,
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            project_id: None,
            project_name: "New Project".to_string(),
            project_description: String::new(),
            project_start_date: chrono::Local::now().date_naive(),
            project_goal_date: None,
        }
    }
}

impl ProjectMetadata {
    pub fn new(project_name: impl Into<String>, project_start_date: NaiveDate) -> Self {
        Self {
            project_name: project_name.into(),
            project_start_date,
            ..Self::default()
        }
    }

    pub fn with_goal_date(mut self, goal: NaiveDate) -> Self {
        self.project_goal_date = Some(goal);
        self
    }
}
