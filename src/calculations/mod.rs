pub mod backward_pass;
pub mod forward_pass;

pub use backward_pass::{BackwardPass, LateDates};
pub use forward_pass::{EarlyDates, ForwardPass};

use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// Derived per-task schedule bounds, in the configured duration unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleNode {
    pub task_id: TaskId,
    pub earliest_start: f64,
    pub earliest_finish: f64,
    pub latest_start: f64,
    pub latest_finish: f64,
    pub float: f64,
    pub is_critical: bool,
}

impl ScheduleNode {
    pub fn duration(&self) -> f64 {
        self.earliest_finish - self.earliest_start
    }
}
