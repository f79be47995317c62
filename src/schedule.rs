use chrono::NaiveDate;
use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::{AnalysisError, AnalysisResult, CriticalPathAnalyzer};
use crate::calculations::ScheduleNode;
use crate::calendar::{CalendarError, WorkCalendar};
use crate::config::AnalysisConfig;
use crate::dependency::{DependencyEdge, DependencyType, EdgeRef};
use crate::graph::{DependencyGraph, DependencyStatistics, GraphError};
use crate::metadata::ProjectMetadata;
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScheduleError {
    #[error("task {id} not found")]
    UnknownTask { id: TaskId },
    #[error("invalid task: {0}")]
    InvalidTask(String),
    #[error("dependency {predecessor_id} -> {successor_id} already exists")]
    DuplicateDependency {
        predecessor_id: TaskId,
        successor_id: TaskId,
    },
    #[error("dependency {predecessor_id} -> {successor_id} not found")]
    DependencyNotFound {
        predecessor_id: TaskId,
        successor_id: TaskId,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Calendar(#[from] CalendarError),
}

/// Outcome of [`Schedule::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Analysis bounds of one task projected onto the work calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDates {
    pub task_id: TaskId,
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
}

/// Result of a bulk dependency edit: what was applied and what was
/// skipped, with the reason.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub applied: Vec<EdgeRef>,
    pub rejected: Vec<BulkRejection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRejection {
    pub predecessor_id: TaskId,
    pub successor_id: TaskId,
    pub reason: String,
}

/// Mutable project workspace. Every mutation invalidates the cached
/// analysis; [`Schedule::refresh`] rebuilds the graph and re-runs it.
#[derive(Debug, Clone)]
pub struct Schedule {
    metadata: ProjectMetadata,
    calendar: WorkCalendar,
    analyzer: CriticalPathAnalyzer,
    tasks: Vec<Task>,
    dependencies: Vec<DependencyEdge>,
    last_analysis: Option<AnalysisResult>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule {
    pub fn new() -> Self {
        Self::new_with_metadata(ProjectMetadata::default())
    }

    pub fn new_with_metadata(metadata: ProjectMetadata) -> Self {
        Self {
            metadata,
            calendar: WorkCalendar::default(),
            analyzer: CriticalPathAnalyzer::default(),
            tasks: Vec::new(),
            dependencies: Vec::new(),
            last_analysis: None,
        }
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.analyzer = CriticalPathAnalyzer::new(config);
        self.last_analysis = None;
        self
    }

    /// Rebuilds a workspace from stored parts, validating the graph.
    pub fn from_parts(
        metadata: ProjectMetadata,
        tasks: Vec<Task>,
        dependencies: Vec<DependencyEdge>,
    ) -> Result<Self, ScheduleError> {
        let mut schedule = Self::new_with_metadata(metadata);
        schedule.replace_all(tasks, dependencies)?;
        Ok(schedule)
    }

    pub fn metadata(&self) -> &ProjectMetadata {
        &self.metadata
    }

    pub fn set_metadata(&mut self, metadata: ProjectMetadata) {
        self.metadata = metadata;
        self.last_analysis = None;
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    pub fn set_calendar(&mut self, calendar: WorkCalendar) {
        self.calendar = calendar;
        self.last_analysis = None;
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.analyzer.config()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn dependencies(&self) -> &[DependencyEdge] {
        &self.dependencies
    }

    pub fn find_task(&self, task_id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn find_dependency(&self, predecessor_id: TaskId, successor_id: TaskId) -> Option<&DependencyEdge> {
        self.dependencies
            .iter()
            .find(|edge| edge.connects(predecessor_id, successor_id))
    }

    pub fn last_analysis(&self) -> Option<&AnalysisResult> {
        self.last_analysis.as_ref()
    }

    /// Replaces tasks and dependencies wholesale; nothing changes on error.
    pub fn replace_all(
        &mut self,
        tasks: Vec<Task>,
        dependencies: Vec<DependencyEdge>,
    ) -> Result<(), ScheduleError> {
        for (i, edge) in dependencies.iter().enumerate() {
            if dependencies[..i]
                .iter()
                .any(|other| other.connects(edge.predecessor_id, edge.successor_id))
            {
                return Err(ScheduleError::DuplicateDependency {
                    predecessor_id: edge.predecessor_id,
                    successor_id: edge.successor_id,
                });
            }
        }
        DependencyGraph::build(&tasks, &dependencies)?;
        self.tasks = tasks;
        self.dependencies = dependencies;
        self.last_analysis = None;
        Ok(())
    }

    pub fn upsert_task(&mut self, id: TaskId, title: &str, duration: f64) -> Result<(), ScheduleError> {
        let mut task = self
            .find_task(id)
            .cloned()
            .unwrap_or_else(|| Task::new(id, title, duration));
        task.title = title.to_string();
        task.duration = duration;
        self.upsert_task_record(task)
    }

    pub fn upsert_task_record(&mut self, task: Task) -> Result<(), ScheduleError> {
        if !task.has_valid_duration() {
            return Err(ScheduleError::InvalidTask(format!(
                "task {} has invalid duration {}",
                task.id, task.duration
            )));
        }
        if !task.has_valid_progress() {
            return Err(ScheduleError::InvalidTask(format!(
                "task {} has progress {}% above 100%",
                task.id, task.progress
            )));
        }
        if !task.has_valid_fixed_start() {
            return Err(ScheduleError::InvalidTask(format!(
                "task {} has a negative fixed start offset",
                task.id
            )));
        }

        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
        self.last_analysis = None;
        Ok(())
    }

    /// Removes the task and every dependency touching it.
    pub fn delete_task(&mut self, task_id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != task_id);
        if self.tasks.len() == before {
            return false;
        }
        let removed = self.remove_all_dependencies_for_task(task_id);
        debug!(task_id, removed, "task deleted");
        self.last_analysis = None;
        true
    }

    /// Adds a dependency, rejecting anything that would break the graph.
    pub fn add_dependency(&mut self, edge: DependencyEdge) -> Result<(), ScheduleError> {
        for id in [edge.predecessor_id, edge.successor_id] {
            if self.find_task(id).is_none() {
                return Err(ScheduleError::UnknownTask { id });
            }
        }
        if edge.predecessor_id == edge.successor_id {
            return Err(GraphError::SelfDependency {
                id: edge.predecessor_id,
            }
            .into());
        }
        if self.find_dependency(edge.predecessor_id, edge.successor_id).is_some() {
            return Err(ScheduleError::DuplicateDependency {
                predecessor_id: edge.predecessor_id,
                successor_id: edge.successor_id,
            });
        }
        if edge.active {
            self.check_no_cycle(edge.predecessor_id, edge.successor_id)?;
        }

        debug!(
            predecessor = edge.predecessor_id,
            successor = edge.successor_id,
            kind = %edge.dependency_type,
            "dependency added"
        );
        self.dependencies.push(edge);
        self.last_analysis = None;
        Ok(())
    }

    /// Replaces the dependency with the same endpoints.
    pub fn update_dependency(&mut self, edge: DependencyEdge) -> Result<(), ScheduleError> {
        let position = self.dependency_position(edge.predecessor_id, edge.successor_id)?;
        let mut candidate = self.dependencies.clone();
        candidate[position] = edge;
        DependencyGraph::build(&self.tasks, &candidate)?;
        self.dependencies = candidate;
        self.last_analysis = None;
        Ok(())
    }

    pub fn remove_dependency(
        &mut self,
        predecessor_id: TaskId,
        successor_id: TaskId,
    ) -> Result<DependencyEdge, ScheduleError> {
        let position = self.dependency_position(predecessor_id, successor_id)?;
        self.last_analysis = None;
        Ok(self.dependencies.remove(position))
    }

    pub fn set_dependency_active(
        &mut self,
        predecessor_id: TaskId,
        successor_id: TaskId,
        active: bool,
    ) -> Result<(), ScheduleError> {
        let position = self.dependency_position(predecessor_id, successor_id)?;
        if self.dependencies[position].active == active {
            return Ok(());
        }
        if active {
            self.check_no_cycle(predecessor_id, successor_id)?;
        }
        self.dependencies[position].active = active;
        self.last_analysis = None;
        Ok(())
    }

    /// Deactivates every dependency touching `task_id`; returns how many changed.
    pub fn deactivate_dependencies_for_task(&mut self, task_id: TaskId) -> usize {
        let mut changed = 0;
        for edge in self
            .dependencies
            .iter_mut()
            .filter(|edge| edge.active && touches(edge, task_id))
        {
            edge.active = false;
            changed += 1;
        }
        if changed > 0 {
            self.last_analysis = None;
        }
        changed
    }

    /// Reactivates every dependency touching `task_id`. All or nothing: if
    /// the result would be cyclic the workspace is left unchanged.
    pub fn reactivate_dependencies_for_task(&mut self, task_id: TaskId) -> Result<usize, ScheduleError> {
        let mut candidate = self.dependencies.clone();
        let mut changed = 0;
        for edge in candidate
            .iter_mut()
            .filter(|edge| !edge.active && touches(edge, task_id))
        {
            edge.active = true;
            changed += 1;
        }
        if changed > 0 {
            DependencyGraph::build(&self.tasks, &candidate)?;
            self.dependencies = candidate;
            self.last_analysis = None;
        }
        Ok(changed)
    }

    pub fn remove_all_dependencies_for_task(&mut self, task_id: TaskId) -> usize {
        let before = self.dependencies.len();
        self.dependencies.retain(|edge| !touches(edge, task_id));
        let removed = before - self.dependencies.len();
        if removed > 0 {
            self.last_analysis = None;
        }
        removed
    }

    /// Adds each dependency on its own; a rejected edge does not stop the
    /// rest.
    pub fn add_dependencies(&mut self, edges: Vec<DependencyEdge>) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for edge in edges {
            let edge_ref = EdgeRef::from(&edge);
            match self.add_dependency(edge) {
                Ok(()) => outcome.applied.push(edge_ref),
                Err(err) => {
                    warn!(
                        predecessor = edge_ref.predecessor_id,
                        successor = edge_ref.successor_id,
                        %err,
                        "bulk dependency skipped"
                    );
                    outcome.rejected.push(BulkRejection {
                        predecessor_id: edge_ref.predecessor_id,
                        successor_id: edge_ref.successor_id,
                        reason: err.to_string(),
                    });
                }
            }
        }
        debug!(
            applied = outcome.applied.len(),
            rejected = outcome.rejected.len(),
            "bulk dependencies added"
        );
        outcome
    }

    /// Removes the listed dependencies that exist; returns the removed edges.
    pub fn remove_dependencies(&mut self, pairs: &[(TaskId, TaskId)]) -> Vec<DependencyEdge> {
        pairs
            .iter()
            .filter_map(|&(predecessor_id, successor_id)| self.remove_dependency(predecessor_id, successor_id).ok())
            .collect()
    }

    /// Retypes the listed dependencies that exist; returns how many matched.
    /// Activity is untouched, so the active graph stays acyclic.
    pub fn update_dependency_types(&mut self, pairs: &[(TaskId, TaskId)], dependency_type: DependencyType) -> usize {
        let mut updated = 0;
        for &(predecessor_id, successor_id) in pairs {
            if let Ok(position) = self.dependency_position(predecessor_id, successor_id) {
                self.dependencies[position].dependency_type = dependency_type;
                updated += 1;
            }
        }
        if updated > 0 {
            self.last_analysis = None;
        }
        updated
    }

    fn dependency_position(&self, predecessor_id: TaskId, successor_id: TaskId) -> Result<usize, ScheduleError> {
        self.dependencies
            .iter()
            .position(|edge| edge.connects(predecessor_id, successor_id))
            .ok_or(ScheduleError::DependencyNotFound {
                predecessor_id,
                successor_id,
            })
    }

    fn check_no_cycle(&self, predecessor_id: TaskId, successor_id: TaskId) -> Result<(), ScheduleError> {
        let graph = self.graph()?;
        if graph.would_create_cycle(predecessor_id, successor_id) {
            let cycle = graph.shortest_dependency_path(successor_id, predecessor_id);
            warn!(predecessor_id, successor_id, ?cycle, "dependency would close a cycle");
            return Err(GraphError::CyclicDependency { cycle }.into());
        }
        Ok(())
    }

    /// Incoming dependencies whose predecessor has not progressed far
    /// enough for `task_id` to proceed.
    pub fn blocking_dependencies(&self, task_id: TaskId) -> Result<Vec<&DependencyEdge>, ScheduleError> {
        if self.find_task(task_id).is_none() {
            return Err(ScheduleError::UnknownTask { id: task_id });
        }
        Ok(self.blockers_of(task_id))
    }

    pub fn can_task_start(&self, task_id: TaskId) -> Result<bool, ScheduleError> {
        Ok(self.blocking_dependencies(task_id)?.is_empty())
    }

    /// Tasks not yet started with nothing blocking them, in insertion order.
    pub fn tasks_ready_to_start(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| !task.is_started() && self.blockers_of(task.id).is_empty())
            .collect()
    }

    /// Unfinished tasks and the dependencies holding them up.
    pub fn blocked_tasks(&self) -> BTreeMap<TaskId, Vec<&DependencyEdge>> {
        self.tasks
            .iter()
            .filter(|task| !task.is_completed())
            .map(|task| (task.id, self.blockers_of(task.id)))
            .filter(|(_, blockers)| !blockers.is_empty())
            .collect()
    }

    fn blockers_of(&self, task_id: TaskId) -> Vec<&DependencyEdge> {
        self.dependencies
            .iter()
            .filter(|edge| edge.successor_id == task_id)
            .filter(|edge| {
                self.find_task(edge.predecessor_id)
                    .is_some_and(|predecessor| !edge.is_satisfied_by(predecessor))
            })
            .collect()
    }

    /// Active dependencies with at least `min_lag_days` of lag.
    pub fn external_constraints(&self, min_lag_days: i32) -> Result<Vec<DependencyEdge>, ScheduleError> {
        Ok(self
            .graph()?
            .external_constraints(min_lag_days)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Tasks with calendar fixed starts turned into day offsets.
    pub fn resolved_tasks(&self) -> Vec<Task> {
        self.tasks
            .iter()
            .map(|task| {
                let mut task = task.clone();
                if task.fixed_start_offset_days.is_none() {
                    if let Some(date) = task.fixed_start_date {
                        let offset = self
                            .calendar
                            .date_to_offset(self.metadata.project_start_date, date);
                        task.fixed_start_offset_days = Some(offset as f64);
                    }
                }
                task
            })
            .collect()
    }

    pub fn graph(&self) -> Result<DependencyGraph, GraphError> {
        DependencyGraph::build(&self.resolved_tasks(), &self.dependencies)
    }

    /// Rebuilds the graph, re-runs the analysis and caches the result.
    pub fn refresh(&mut self) -> Result<AnalysisResult, ScheduleError> {
        let graph = self.graph()?;
        let result = self.analyzer.analyze(&graph)?;

        if let Some(goal) = self.metadata.project_goal_date {
            match self.finish_date(&result) {
                Ok(Some(finish)) if finish > goal => {
                    warn!(%finish, %goal, "schedule finishes after the project goal date");
                }
                Ok(_) => {}
                Err(err) => warn!(%err, "analysis cannot be placed on the work calendar"),
            }
        }

        self.last_analysis = Some(result.clone());
        Ok(result)
    }

    /// Cached analysis, refreshed when a mutation invalidated it.
    pub fn analysis(&mut self) -> Result<AnalysisResult, ScheduleError> {
        match &self.last_analysis {
            Some(result) => Ok(result.clone()),
            None => self.refresh(),
        }
    }

    pub fn task_float(&mut self, task_id: TaskId) -> Result<ScheduleNode, ScheduleError> {
        if self.find_task(task_id).is_none() {
            return Err(ScheduleError::UnknownTask { id: task_id });
        }
        let result = self.analysis()?;
        result
            .node(task_id)
            .cloned()
            .ok_or(ScheduleError::UnknownTask { id: task_id })
    }

    pub fn dependency_statistics(&self) -> Result<DependencyStatistics, ScheduleError> {
        Ok(self.graph()?.statistics())
    }

    /// Checks the workspace without mutating it.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        match self.graph() {
            Ok(graph) => match self.analyzer.analyze(&graph) {
                Ok(result) => match (self.metadata.project_goal_date, self.finish_date(&result)) {
                    (Some(goal), Ok(Some(finish))) if finish > goal => {
                        report.warnings.push(format!(
                            "schedule finishes on {finish}, after the goal date {goal}"
                        ));
                    }
                    (_, Err(err)) => report.warnings.push(err.to_string()),
                    _ => {}
                },
                Err(err) => report.errors.push(err.to_string()),
            },
            Err(err) => report.errors.push(err.to_string()),
        }

        let inactive = self.dependencies.iter().filter(|edge| !edge.active).count();
        if inactive > 0 {
            report
                .warnings
                .push(format!("{inactive} inactive dependency(ies) are ignored"));
        }
        let soft = self
            .dependencies
            .iter()
            .filter(|edge| edge.active && edge.dependency_type == DependencyType::Soft)
            .count();
        if soft > 0 {
            report
                .warnings
                .push(format!("{soft} soft dependency(ies) do not constrain the schedule"));
        }
        for task in self.tasks.iter().filter(|task| task.duration == 0.0) {
            report
                .warnings
                .push(format!("task {} has zero duration", task.id));
        }

        report.valid = report.errors.is_empty();
        report
    }

    /// Calendar date of each task's bounds, in analysis order.
    pub fn task_dates(&self, result: &AnalysisResult) -> Result<Vec<TaskDates>, ScheduleError> {
        let config = self.analyzer.config();
        let start = self.metadata.project_start_date;
        let last_day_of = |start_units: f64, finish_units: f64| {
            let finish_days = config.units_to_days(finish_units);
            let start_days = config.units_to_days(start_units);
            // last working day occupied by the task
            let last_day = (finish_days.ceil() - 1.0).max(start_days.floor());
            self.calendar.offset_to_date(start, last_day)
        };

        result
            .nodes
            .iter()
            .map(|node| -> Result<TaskDates, ScheduleError> {
                Ok(TaskDates {
                    task_id: node.task_id,
                    early_start: self
                        .calendar
                        .offset_to_date(start, config.units_to_days(node.earliest_start))?,
                    early_finish: last_day_of(node.earliest_start, node.earliest_finish)?,
                    late_start: self
                        .calendar
                        .offset_to_date(start, config.units_to_days(node.latest_start))?,
                    late_finish: last_day_of(node.latest_start, node.latest_finish)?,
                })
            })
            .collect()
    }

    /// Date of the last working day of the project; `None` when empty.
    pub fn finish_date(&self, result: &AnalysisResult) -> Result<Option<NaiveDate>, ScheduleError> {
        Ok(self
            .task_dates(result)?
            .into_iter()
            .map(|dates| dates.early_finish)
            .max())
    }
}

fn touches(edge: &DependencyEdge, task_id: TaskId) -> bool {
    edge.predecessor_id == task_id || edge.successor_id == task_id
}
