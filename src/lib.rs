pub mod analysis;
pub mod calculations;
pub mod calendar;
pub mod config;
pub mod dependency;
pub mod graph;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod logging;
pub mod metadata;
pub mod persistence;
pub mod risk;
pub mod schedule;
pub mod task;

pub use analysis::{AnalysisError, AnalysisResult, CriticalPathAnalyzer, ProjectInput};
pub use calculations::ScheduleNode;
pub use calendar::{CalendarError, WorkCalendar};
pub use config::{AnalysisConfig, DurationUnit};
pub use dependency::{DependencyEdge, DependencyType, EdgeRef};
pub use graph::{DependencyGraph, DependencyGraphBuilder, GraphError};
pub use metadata::ProjectMetadata;
pub use risk::{RiskLevel, RiskPolicy};
pub use schedule::{BulkOutcome, Schedule, ScheduleError};
pub use task::{Task, TaskId};
