use super::{PersistenceError, PersistenceResult};
use crate::analysis::AnalysisResult;
use crate::calendar::WorkCalendar;
use crate::dependency::{DependencyEdge, DependencyType};
use crate::metadata::ProjectMetadata;
use crate::schedule::Schedule;
use crate::task::{Task, TaskId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use tracing::info;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectSnapshot {
    metadata: ProjectMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    calendar: Option<WorkCalendar>,
    tasks: Vec<Task>,
    #[serde(default)]
    dependencies: Vec<DependencyEdge>,
}

impl ProjectSnapshot {
    fn from_schedule(schedule: &Schedule) -> Self {
        Self {
            metadata: schedule.metadata().clone(),
            calendar: Some(schedule.calendar().clone()),
            tasks: schedule.tasks().to_vec(),
            dependencies: schedule.dependencies().to_vec(),
        }
    }

    fn into_schedule(self) -> PersistenceResult<Schedule> {
        let mut schedule = Schedule::from_parts(self.metadata, self.tasks, self.dependencies)?;
        if let Some(calendar) = self.calendar {
            schedule.set_calendar(calendar);
        }
        Ok(schedule)
    }
}

pub fn save_schedule_to_json<P: AsRef<Path>>(schedule: &Schedule, path: P) -> PersistenceResult<()> {
    let snapshot = ProjectSnapshot::from_schedule(schedule);
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    info!(path = %path.as_ref().display(), tasks = snapshot.tasks.len(), "schedule saved");
    Ok(())
}

pub fn load_schedule_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Schedule> {
    let file = File::open(path)?;
    let snapshot: ProjectSnapshot = serde_json::from_reader(file)?;
    snapshot.into_schedule()
}

pub fn save_analysis_to_json<P: AsRef<Path>>(result: &AnalysisResult, path: P) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, result)?;
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct TaskCsvRecord {
    id: TaskId,
    #[serde(default)]
    title: String,
    duration: f64,
    #[serde(default)]
    fixed_start_offset_days: Option<f64>,
    #[serde(default)]
    fixed_start_date: Option<NaiveDate>,
    #[serde(default)]
    progress: Option<u8>,
}

impl From<&Task> for TaskCsvRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            duration: task.duration,
            fixed_start_offset_days: task.fixed_start_offset_days,
            fixed_start_date: task.fixed_start_date,
            progress: Some(task.progress),
        }
    }
}

impl From<TaskCsvRecord> for Task {
    fn from(record: TaskCsvRecord) -> Self {
        Task {
            id: record.id,
            title: record.title,
            duration: record.duration,
            fixed_start_offset_days: record.fixed_start_offset_days,
            fixed_start_date: record.fixed_start_date,
            progress: record.progress.unwrap_or_default(),
        }
    }
}

/// `type` accepts the wire names as well as FS/SS/FF/SF; empty means
/// finish-to-start. Empty `active` means active.
#[derive(Debug, Serialize, Deserialize)]
struct DependencyCsvRecord {
    predecessor_id: TaskId,
    successor_id: TaskId,
    #[serde(rename = "type", default)]
    dependency_type: String,
    #[serde(default)]
    lag_days: Option<i32>,
    #[serde(default)]
    active: Option<bool>,
    #[serde(default)]
    notes: Option<String>,
}

impl From<&DependencyEdge> for DependencyCsvRecord {
    fn from(edge: &DependencyEdge) -> Self {
        Self {
            predecessor_id: edge.predecessor_id,
            successor_id: edge.successor_id,
            dependency_type: edge.dependency_type.as_str().to_string(),
            lag_days: Some(edge.lag_days),
            active: Some(edge.active),
            notes: edge.notes.clone(),
        }
    }
}

impl DependencyCsvRecord {
    fn into_edge(self) -> PersistenceResult<DependencyEdge> {
        let dependency_type = if self.dependency_type.trim().is_empty() {
            DependencyType::default()
        } else {
            self.dependency_type
                .parse()
                .map_err(|err| PersistenceError::InvalidData(format!("{err}")))?
        };
        Ok(DependencyEdge {
            predecessor_id: self.predecessor_id,
            successor_id: self.successor_id,
            dependency_type,
            lag_days: self.lag_days.unwrap_or(0),
            active: self.active.unwrap_or(true),
            notes: self.notes.filter(|notes| !notes.trim().is_empty()),
        })
    }
}

pub fn save_tasks_to_csv<P: AsRef<Path>>(tasks: &[Task], path: P) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for task in tasks {
        writer.serialize(TaskCsvRecord::from(task))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_tasks_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<Task>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut tasks = Vec::new();
    for record in reader.deserialize::<TaskCsvRecord>() {
        tasks.push(Task::from(record?));
    }
    Ok(tasks)
}

pub fn save_dependencies_to_csv<P: AsRef<Path>>(
    dependencies: &[DependencyEdge],
    path: P,
) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for edge in dependencies {
        writer.serialize(DependencyCsvRecord::from(edge))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_dependencies_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<Vec<DependencyEdge>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut edges = Vec::new();
    for record in reader.deserialize::<DependencyCsvRecord>() {
        edges.push(record?.into_edge()?);
    }
    Ok(edges)
}

/// Builds a workspace from a task table and an optional dependency table.
pub fn load_schedule_from_csv<P, Q>(
    metadata: ProjectMetadata,
    tasks_path: P,
    dependencies_path: Option<Q>,
) -> PersistenceResult<Schedule>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let tasks = load_tasks_from_csv(tasks_path)?;
    let dependencies = match dependencies_path {
        Some(path) => load_dependencies_from_csv(path)?,
        None => Vec::new(),
    };
    Ok(Schedule::from_parts(metadata, tasks, dependencies)?)
}

#[derive(Debug, Serialize)]
struct AnalysisCsvRecord<'a> {
    task_id: TaskId,
    title: &'a str,
    earliest_start: f64,
    earliest_finish: f64,
    latest_start: f64,
    latest_finish: f64,
    float: f64,
    is_critical: bool,
}

/// One row per analysed task, in the report's topological order.
pub fn export_analysis_to_csv<P: AsRef<Path>>(
    schedule: &Schedule,
    result: &AnalysisResult,
    path: P,
) -> PersistenceResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for node in &result.nodes {
        let title = schedule
            .find_task(node.task_id)
            .map(|task| task.title.as_str())
            .unwrap_or_default();
        writer.serialize(AnalysisCsvRecord {
            task_id: node.task_id,
            title,
            earliest_start: node.earliest_start,
            earliest_finish: node.earliest_finish,
            latest_start: node.latest_start,
            latest_finish: node.latest_finish,
            float: node.float,
            is_critical: node.is_critical,
        })?;
    }
    writer.flush()?;
    Ok(())
}
