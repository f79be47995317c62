use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::analysis::{AnalysisError, AnalysisResult, CriticalPathAnalyzer, ProjectInput};
use crate::calculations::ScheduleNode;
use crate::dependency::{DependencyEdge, DependencyType};
use crate::graph::{DependencyStatistics, GraphError};
use crate::schedule::{BulkOutcome, ScheduleError, ValidationReport};
use crate::{ProjectMetadata, Schedule, Task, TaskId};

#[derive(Clone)]
pub struct AppState {
    schedule: Arc<RwLock<Schedule>>,
}

impl AppState {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule: Arc::new(RwLock::new(schedule)),
        }
    }

    pub fn with_shared(schedule: Arc<RwLock<Schedule>>) -> Self {
        Self { schedule }
    }

    fn schedule(&self) -> Arc<RwLock<Schedule>> {
        self.schedule.clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }

    fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

impl From<GraphError> for ApiError {
    fn from(value: GraphError) -> Self {
        match value {
            GraphError::CyclicDependency { .. } => ApiError::Conflict(value.to_string()),
            other => ApiError::Invalid(other.to_string()),
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(value: AnalysisError) -> Self {
        match value {
            AnalysisError::Graph(err) => ApiError::from(err),
            AnalysisError::InternalInvariant(message) => {
                error!(%message, "analysis invariant violated");
                ApiError::Internal(message)
            }
        }
    }
}

impl From<ScheduleError> for ApiError {
    fn from(value: ScheduleError) -> Self {
        match value {
            ScheduleError::UnknownTask { .. } | ScheduleError::DependencyNotFound { .. } => {
                ApiError::NotFound(value.to_string())
            }
            ScheduleError::DuplicateDependency { .. } => ApiError::Conflict(value.to_string()),
            ScheduleError::InvalidTask(message) => ApiError::Invalid(message),
            ScheduleError::Graph(err) => ApiError::from(err),
            ScheduleError::Analysis(err) => ApiError::from(err),
            ScheduleError::Calendar(err) => ApiError::Invalid(err.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(value: tokio::task::JoinError) -> Self {
        ApiError::internal(format!("analysis task failed: {value}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatisticsBody {
    dependencies: DependencyStatistics,
    most_connected: Vec<ConnectedTask>,
    independent_tasks: Vec<TaskId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectedTask {
    task_id: TaskId,
    dependency_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartCheck {
    task_id: TaskId,
    can_start: bool,
    blocking_dependencies: Vec<DependencyEdge>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockedTask {
    task_id: TaskId,
    blocking_dependencies: Vec<DependencyEdge>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyKey {
    predecessor_id: TaskId,
    successor_id: TaskId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetypeRequest {
    dependencies: Vec<DependencyKey>,
    #[serde(rename = "type")]
    dependency_type: DependencyType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExternalConstraintQuery {
    #[serde(default = "default_min_lag_days")]
    min_lag_days: i32,
}

fn default_min_lag_days() -> i32 {
    1
}

fn keys_to_pairs(keys: &[DependencyKey]) -> Vec<(TaskId, TaskId)> {
    keys.iter()
        .map(|key| (key.predecessor_id, key.successor_id))
        .collect()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metadata", get(get_metadata).put(update_metadata))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/:id/float", get(task_float))
        .route("/tasks/:id/can-start", get(can_start))
        .route("/ready-tasks", get(ready_tasks))
        .route("/blocked-tasks", get(blocked_tasks))
        .route("/dependencies", get(list_dependencies).post(create_dependency))
        .route(
            "/dependencies/bulk",
            post(create_dependencies).put(retype_dependencies).delete(delete_dependencies),
        )
        .route("/external-constraints", get(external_constraints))
        .route(
            "/dependencies/:predecessor/:successor",
            put(update_dependency).delete(delete_dependency),
        )
        .route("/critical-path", get(critical_path))
        .route("/validate", get(validate))
        .route("/statistics", get(statistics))
        .route("/analyze", post(analyze))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, schedule: Schedule) -> std::io::Result<()> {
    let state = AppState::new(schedule);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_metadata(State(state): State<AppState>) -> Json<ProjectMetadata> {
    let schedule = state.schedule();
    let metadata = {
        let guard = schedule.read();
        guard.metadata().clone()
    };
    Json(metadata)
}

async fn update_metadata(
    State(state): State<AppState>,
    Json(metadata): Json<ProjectMetadata>,
) -> Json<ProjectMetadata> {
    let schedule = state.schedule();
    let current = {
        let mut guard = schedule.write();
        guard.set_metadata(metadata);
        guard.metadata().clone()
    };
    Json(current)
}

async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    let schedule = state.schedule();
    let tasks = {
        let guard = schedule.read();
        guard.tasks().to_vec()
    };
    Json(tasks)
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<Task>, ApiError> {
    let schedule = state.schedule();
    let result = {
        let guard = schedule.read();
        guard.find_task(task_id).cloned()
    };
    match result {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::not_found(format!("task {task_id} not found"))),
    }
}

async fn create_task(
    State(state): State<AppState>,
    Json(task): Json<Task>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let schedule = state.schedule();
    let created = {
        let mut guard = schedule.write();
        if guard.find_task(task.id).is_some() {
            return Err(ApiError::Conflict(format!("task {} already exists", task.id)));
        }
        guard.upsert_task_record(task.clone())?;
        guard
            .find_task(task.id)
            .cloned()
            .ok_or_else(|| ApiError::internal("task not found after creation"))?
    };
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    Json(task): Json<Task>,
) -> Result<Json<Task>, ApiError> {
    if task.id != task_id {
        return Err(ApiError::invalid(
            "task id in payload does not match path parameter",
        ));
    }
    let schedule = state.schedule();
    let updated = {
        let mut guard = schedule.write();
        if guard.find_task(task_id).is_none() {
            return Err(ApiError::not_found(format!("task {task_id} not found")));
        }
        guard.upsert_task_record(task)?;
        guard
            .find_task(task_id)
            .cloned()
            .ok_or_else(|| ApiError::internal("task not found after update"))?
    };
    Ok(Json(updated))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<StatusCode, ApiError> {
    let schedule = state.schedule();
    let removed = {
        let mut guard = schedule.write();
        guard.delete_task(task_id)
    };
    if !removed {
        return Err(ApiError::not_found(format!("task {task_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_dependencies(State(state): State<AppState>) -> Json<Vec<DependencyEdge>> {
    let schedule = state.schedule();
    let dependencies = {
        let guard = schedule.read();
        guard.dependencies().to_vec()
    };
    Json(dependencies)
}

async fn create_dependency(
    State(state): State<AppState>,
    Json(edge): Json<DependencyEdge>,
) -> Result<(StatusCode, Json<DependencyEdge>), ApiError> {
    let schedule = state.schedule();
    {
        let mut guard = schedule.write();
        guard.add_dependency(edge.clone())?;
    }
    Ok((StatusCode::CREATED, Json(edge)))
}

async fn update_dependency(
    State(state): State<AppState>,
    Path((predecessor_id, successor_id)): Path<(TaskId, TaskId)>,
    Json(edge): Json<DependencyEdge>,
) -> Result<Json<DependencyEdge>, ApiError> {
    if !edge.connects(predecessor_id, successor_id) {
        return Err(ApiError::invalid(
            "dependency endpoints in payload do not match path parameters",
        ));
    }
    let schedule = state.schedule();
    {
        let mut guard = schedule.write();
        guard.update_dependency(edge.clone())?;
    }
    Ok(Json(edge))
}

async fn delete_dependency(
    State(state): State<AppState>,
    Path((predecessor_id, successor_id)): Path<(TaskId, TaskId)>,
) -> Result<StatusCode, ApiError> {
    let schedule = state.schedule();
    {
        let mut guard = schedule.write();
        guard.remove_dependency(predecessor_id, successor_id)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn create_dependencies(
    State(state): State<AppState>,
    Json(edges): Json<Vec<DependencyEdge>>,
) -> Json<BulkOutcome> {
    let schedule = state.schedule();
    let outcome = {
        let mut guard = schedule.write();
        guard.add_dependencies(edges)
    };
    Json(outcome)
}

async fn retype_dependencies(
    State(state): State<AppState>,
    Json(request): Json<RetypeRequest>,
) -> impl IntoResponse {
    let schedule = state.schedule();
    let updated = {
        let mut guard = schedule.write();
        guard.update_dependency_types(&keys_to_pairs(&request.dependencies), request.dependency_type)
    };
    Json(json!({ "updated": updated }))
}

async fn delete_dependencies(
    State(state): State<AppState>,
    Json(keys): Json<Vec<DependencyKey>>,
) -> impl IntoResponse {
    let schedule = state.schedule();
    let removed = {
        let mut guard = schedule.write();
        guard.remove_dependencies(&keys_to_pairs(&keys))
    };
    Json(json!({ "removed": removed.len() }))
}

async fn can_start(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<StartCheck>, ApiError> {
    let schedule = state.schedule();
    let blocking: Vec<DependencyEdge> = {
        let guard = schedule.read();
        guard
            .blocking_dependencies(task_id)?
            .into_iter()
            .cloned()
            .collect()
    };
    Ok(Json(StartCheck {
        task_id,
        can_start: blocking.is_empty(),
        blocking_dependencies: blocking,
    }))
}

async fn ready_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    let schedule = state.schedule();
    let tasks: Vec<Task> = {
        let guard = schedule.read();
        guard.tasks_ready_to_start().into_iter().cloned().collect()
    };
    Json(tasks)
}

async fn blocked_tasks(State(state): State<AppState>) -> Json<Vec<BlockedTask>> {
    let schedule = state.schedule();
    let blocked: Vec<BlockedTask> = {
        let guard = schedule.read();
        guard
            .blocked_tasks()
            .into_iter()
            .map(|(task_id, edges)| BlockedTask {
                task_id,
                blocking_dependencies: edges.into_iter().cloned().collect(),
            })
            .collect()
    };
    Json(blocked)
}

async fn external_constraints(
    State(state): State<AppState>,
    Query(query): Query<ExternalConstraintQuery>,
) -> Result<Json<Vec<DependencyEdge>>, ApiError> {
    let schedule = state.schedule();
    let edges = {
        let guard = schedule.read();
        guard.external_constraints(query.min_lag_days)?
    };
    Ok(Json(edges))
}

async fn critical_path(State(state): State<AppState>) -> Result<Json<AnalysisResult>, ApiError> {
    let schedule = state.schedule();
    let result = tokio::task::spawn_blocking(move || schedule.write().analysis()).await??;
    Ok(Json(result))
}

async fn task_float(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<ScheduleNode>, ApiError> {
    let schedule = state.schedule();
    let node = tokio::task::spawn_blocking(move || schedule.write().task_float(task_id)).await??;
    Ok(Json(node))
}

async fn validate(State(state): State<AppState>) -> Result<Json<ValidationReport>, ApiError> {
    let schedule = state.schedule();
    let report = tokio::task::spawn_blocking(move || schedule.read().validate()).await?;
    Ok(Json(report))
}

async fn statistics(State(state): State<AppState>) -> Result<Json<StatisticsBody>, ApiError> {
    let schedule = state.schedule();
    let graph = {
        let guard = schedule.read();
        guard.graph()?
    };
    Ok(Json(StatisticsBody {
        dependencies: graph.statistics(),
        most_connected: graph
            .most_connected(10)
            .into_iter()
            .map(|(task_id, dependency_count)| ConnectedTask {
                task_id,
                dependency_count,
            })
            .collect(),
        independent_tasks: graph.independent_tasks(),
    }))
}

/// Analyzes the posted project without touching the shared workspace.
async fn analyze(
    State(state): State<AppState>,
    Json(input): Json<ProjectInput>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let config = {
        let guard = state.schedule.read();
        guard.config().clone()
    };
    let result = tokio::task::spawn_blocking(move || {
        CriticalPathAnalyzer::new(config).analyze_tasks(&input.tasks, &input.dependencies)
    })
    .await??;
    Ok(Json(result))
}
