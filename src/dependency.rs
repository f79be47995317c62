use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::task::{Task, TaskId};

/// Which endpoint of the predecessor gates which endpoint of the successor.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyType {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
    /// Finish-to-start whose lag can never become a lead.
    Blocking,
    /// Advisory only; never constrains the schedule.
    Soft,
}

impl DependencyType {
    pub const ALL: [DependencyType; 6] = [
        DependencyType::FinishToStart,
        DependencyType::StartToStart,
        DependencyType::FinishToFinish,
        DependencyType::StartToFinish,
        DependencyType::Blocking,
        DependencyType::Soft,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "FINISH_TO_START",
            DependencyType::StartToStart => "START_TO_START",
            DependencyType::FinishToFinish => "FINISH_TO_FINISH",
            DependencyType::StartToFinish => "START_TO_FINISH",
            DependencyType::Blocking => "BLOCKING",
            DependencyType::Soft => "SOFT",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "Finish-to-Start",
            DependencyType::StartToStart => "Start-to-Start",
            DependencyType::FinishToFinish => "Finish-to-Finish",
            DependencyType::StartToFinish => "Start-to-Finish",
            DependencyType::Blocking => "Blocking",
            DependencyType::Soft => "Soft",
        }
    }

    /// Whether edges of this type feed the forward and backward passes.
    pub fn constrains_schedule(&self) -> bool {
        !matches!(self, DependencyType::Soft)
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDependencyTypeError(String);

impl fmt::Display for ParseDependencyTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown dependency type '{}'", self.0)
    }
}

impl std::error::Error for ParseDependencyTypeError {}

impl FromStr for DependencyType {
    type Err = ParseDependencyTypeError;

    /// Accepts the wire names (`FINISH_TO_START`) and the short codes used in
    /// scheduling tools (`FS`, `SS`, `FF`, `SF`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "FINISH_TO_START" | "FS" => Ok(DependencyType::FinishToStart),
            "START_TO_START" | "SS" => Ok(DependencyType::StartToStart),
            "FINISH_TO_FINISH" | "FF" => Ok(DependencyType::FinishToFinish),
            "START_TO_FINISH" | "SF" => Ok(DependencyType::StartToFinish),
            "BLOCKING" => Ok(DependencyType::Blocking),
            "SOFT" => Ok(DependencyType::Soft),
            _ => Err(ParseDependencyTypeError(s.to_string())),
        }
    }
}

fn default_active() -> bool {
    true
}

/// Directed relation `predecessor -> successor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyEdge {
    pub predecessor_id: TaskId,
    pub successor_id: TaskId,
    #[serde(rename = "type", default)]
    pub dependency_type: DependencyType,
    #[serde(default)]
    pub lag_days: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DependencyEdge {
    pub fn new(predecessor_id: TaskId, successor_id: TaskId, dependency_type: DependencyType) -> Self {
        Self {
            predecessor_id,
            successor_id,
            dependency_type,
            lag_days: 0,
            active: true,
            notes: None,
        }
    }

    pub fn finish_to_start(predecessor_id: TaskId, successor_id: TaskId) -> Self {
        Self::new(predecessor_id, successor_id, DependencyType::FinishToStart)
    }

    pub fn with_lag(mut self, lag_days: i32) -> Self {
        self.lag_days = lag_days;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Lag actually applied by the passes; blocking edges never allow a lead.
    pub fn effective_lag_days(&self) -> i32 {
        match self.dependency_type {
            DependencyType::Blocking => self.lag_days.max(0),
            _ => self.lag_days,
        }
    }

    /// Active edges that constrain earliest/latest dates.
    pub fn is_scheduling(&self) -> bool {
        self.active && self.dependency_type.constrains_schedule()
    }

    pub fn connects(&self, predecessor_id: TaskId, successor_id: TaskId) -> bool {
        self.predecessor_id == predecessor_id && self.successor_id == successor_id
    }

    /// Whether the predecessor's progress releases the successor. Start-based
    /// types need the predecessor started, the rest need it completed.
    pub fn is_satisfied_by(&self, predecessor: &Task) -> bool {
        if !self.is_scheduling() {
            return true;
        }
        match self.dependency_type {
            DependencyType::StartToStart | DependencyType::StartToFinish => predecessor.is_started(),
            DependencyType::FinishToStart | DependencyType::FinishToFinish | DependencyType::Blocking => {
                predecessor.is_completed()
            }
            DependencyType::Soft => true,
        }
    }
}

/// Compact edge view carried in analysis reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRef {
    pub predecessor_id: TaskId,
    pub successor_id: TaskId,
    #[serde(rename = "type")]
    pub dependency_type: DependencyType,
}

impl From<&DependencyEdge> for EdgeRef {
    fn from(edge: &DependencyEdge) -> Self {
        Self {
            predecessor_id: edge.predecessor_id,
            successor_id: edge.successor_id,
            dependency_type: edge.dependency_type,
        }
    }
}
