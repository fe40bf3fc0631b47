use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use super::models::{
    IssueColumn, IssueUpdate, NewIssue, NewSprint, Priority, Setting, SprintStatus,
};
use super::ordering::DropTarget;
use super::position::PositionAllocator;
use super::reorder::{MoveRequest, ReorderCoordinator};
use super::stats::BoardStats;
use super::store::{self, IssueStore};
use crate::errors::BoardError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: Arc<dyn IssueStore>,
    pub allocator: PositionAllocator,
    pub auto_rebalance: bool,
}

impl AppState {
    pub fn new(
        store: Arc<dyn IssueStore>,
        allocator: PositionAllocator,
        auto_rebalance: bool,
    ) -> Self {
        Self {
            store,
            allocator,
            auto_rebalance,
        }
    }
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateIssueRequest {
    pub title: String,
    pub description: Option<String>,
    pub column: Option<String>,
    pub priority: Option<String>,
    pub labels: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct UpdateIssueRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub labels: Option<Vec<String>>,
}

/// `index` is the drop position among the target column's other cards;
/// omit it to append at the end.
#[derive(Deserialize)]
pub struct MoveIssueRequest {
    pub column: String,
    pub index: Option<usize>,
}

#[derive(Deserialize)]
pub struct AssignSprintRequest {
    pub sprint_id: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateSprintRequest {
    pub name: String,
    pub goal: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct SettingRequest {
    pub value: String,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        let msg = err.to_string();
        match err {
            e if e.is_not_found() => ApiError::NotFound(msg),
            BoardError::InvalidColumn(_)
            | BoardError::InvalidPriority(_)
            | BoardError::InvalidSprintStatus(_)
            | BoardError::BadRequest(_) => ApiError::BadRequest(msg),
            BoardError::PositionExhausted { .. } => ApiError::Conflict(msg),
            _ => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/{id}", get(get_project))
        .route("/api/projects/{id}/board", get(get_board))
        .route("/api/projects/{id}/stats", get(get_stats))
        .route("/api/projects/{id}/issues", post(create_issue))
        .route(
            "/api/projects/{id}/sprints",
            get(list_sprints).post(create_sprint),
        )
        .route(
            "/api/projects/{id}/columns/{column}/rebalance",
            post(rebalance_column),
        )
        .route(
            "/api/issues/{id}",
            get(get_issue).patch(update_issue).delete(delete_issue),
        )
        .route("/api/issues/{id}/move", patch(move_issue))
        .route("/api/issues/{id}/sprint", patch(assign_sprint))
        .route("/api/settings/{key}", get(get_setting).put(put_setting))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

fn parse_priority(value: Option<&str>) -> Result<Option<Priority>, ApiError> {
    value
        .map(Priority::from_str)
        .transpose()
        .map_err(ApiError::from)
}

async fn coordinator_for(
    state: &SharedState,
    project_id: i64,
) -> Result<ReorderCoordinator<dyn IssueStore>, ApiError> {
    Ok(
        ReorderCoordinator::load(Arc::clone(&state.store), project_id, state.allocator)
            .await?
            .with_auto_rebalance(state.auto_rebalance),
    )
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn list_projects(State(state): State<SharedState>) -> Result<impl IntoResponse, ApiError> {
    let projects = state.store.list_projects().await?;
    Ok(Json(projects))
}

async fn create_project(
    State(state): State<SharedState>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Project name must not be empty".into()));
    }
    let project = state
        .store
        .create_project(&req.name, req.description.as_deref().unwrap_or_default())
        .await?;
    info!(project_id = project.id, name = %project.name, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    match state.store.get_project(id).await? {
        Some(project) => Ok(Json(project)),
        None => Err(BoardError::ProjectNotFound { id }.into()),
    }
}

async fn get_board(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let board = store::load_board(state.store.as_ref(), id).await?;
    Ok(Json(board))
}

async fn get_stats(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.get_project(id).await?.is_none() {
        return Err(BoardError::ProjectNotFound { id }.into());
    }
    let issues = state.store.list_issues(id).await?;
    Ok(Json(BoardStats::compute(id, &issues)))
}

async fn create_issue(
    State(state): State<SharedState>,
    Path(project_id): Path<i64>,
    Json(req): Json<CreateIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Issue title must not be empty".into()));
    }
    let column = match &req.column {
        Some(c) => IssueColumn::from_str(c)?,
        None => IssueColumn::Backlog,
    };
    let priority = parse_priority(req.priority.as_deref())?.unwrap_or_default();
    let issue = state
        .store
        .create_issue(NewIssue {
            project_id,
            title: req.title,
            description: req.description.unwrap_or_default(),
            column,
            priority,
            labels: req.labels.unwrap_or_default(),
        })
        .await?;
    info!(
        issue_id = issue.id,
        project_id,
        column = %issue.column,
        position = issue.position,
        "issue created"
    );
    Ok((StatusCode::CREATED, Json(issue)))
}

async fn get_issue(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    match state.store.get_issue(id).await? {
        Some(issue) => Ok(Json(issue)),
        None => Err(BoardError::IssueNotFound { id }.into()),
    }
}

async fn update_issue(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let update = IssueUpdate {
        priority: parse_priority(req.priority.as_deref())?,
        title: req.title,
        description: req.description,
        labels: req.labels,
    };
    if update.is_empty() {
        return Err(ApiError::BadRequest("No fields to update".into()));
    }
    let issue = state.store.update_issue(id, update).await?;
    Ok(Json(issue))
}

async fn move_issue(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<MoveIssueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let column = IssueColumn::from_str(&req.column)?;
    let issue = state
        .store
        .get_issue(id)
        .await?
        .ok_or(BoardError::IssueNotFound { id })?;

    let mut coordinator = coordinator_for(&state, issue.project_id).await?;
    let request = MoveRequest::new(id, column, DropTarget::from_index(req.index));
    let outcome = coordinator.move_issue(&request).await?;

    if !outcome.is_committed() {
        warn!(issue_id = id, tx = %outcome.transaction_id, "move rolled back");
        return Err(ApiError::Internal(
            outcome
                .error
                .unwrap_or_else(|| "Move could not be persisted".to_string()),
        ));
    }
    Ok(Json(outcome))
}

async fn delete_issue(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.delete_issue(id).await? {
        info!(issue_id = id, "issue deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(BoardError::IssueNotFound { id }.into())
    }
}

async fn assign_sprint(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<AssignSprintRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let issue = state.store.assign_sprint(id, req.sprint_id).await?;
    Ok(Json(issue))
}

async fn rebalance_column(
    State(state): State<SharedState>,
    Path((project_id, column)): Path<(i64, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let column = IssueColumn::from_str(&column)?;
    let mut coordinator = coordinator_for(&state, project_id).await?;
    let issues = coordinator.rebalance(column).await?;
    Ok(Json(issues))
}

async fn list_sprints(
    State(state): State<SharedState>,
    Path(project_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    if state.store.get_project(project_id).await?.is_none() {
        return Err(BoardError::ProjectNotFound { id: project_id }.into());
    }
    let sprints = state.store.list_sprints(project_id).await?;
    Ok(Json(sprints))
}

async fn create_sprint(
    State(state): State<SharedState>,
    Path(project_id): Path<i64>,
    Json(req): Json<CreateSprintRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let status = match req.status.as_deref() {
        Some(s) => SprintStatus::from_str(s)?,
        None => SprintStatus::default(),
    };
    let sprint = state
        .store
        .create_sprint(NewSprint {
            project_id,
            name: req.name,
            goal: req.goal.unwrap_or_default(),
            status,
            start_date: req.start_date,
            end_date: req.end_date,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(sprint)))
}

async fn get_setting(
    State(state): State<SharedState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    match state.store.get_setting(&key).await? {
        Some(value) => Ok(Json(Setting { key, value })),
        None => Err(ApiError::NotFound(format!("Setting '{}' not found", key))),
    }
}

async fn put_setting(
    State(state): State<SharedState>,
    Path(key): Path<String>,
    Json(req): Json<SettingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.store.set_setting(&key, &req.value).await?;
    Ok(Json(Setting {
        key,
        value: req.value,
    }))
}
