//! REST handlers, one per operation. Request bodies and query strings
//! arrive with enum fields as raw strings and are parsed here, so an
//! out-of-set value turns into a 400 with the parse message instead of a
//! framework rejection.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};

use tasktrack_core::ids::TaskId;
use tasktrack_core::insights::InsightsReport;
use tasktrack_core::task::{NewTask, Priority, SortOrder, Task, TaskFilter, TaskPatch, TaskStatus};
use tasktrack_store::{StoreError, TaskRepo};

use crate::error::ApiError;
use crate::server::AppState;

/// GET / — liveness message.
pub async fn liveness() -> &'static str {
    "Task Tracker API is running"
}

/// GET /test-db — round-trip through the datastore.
pub async fn test_db(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let time = state.db.with_conn(|conn| {
        conn.query_row("SELECT datetime('now')", [], |row| row.get::<_, String>(0))
            .map_err(StoreError::from)
    })?;
    Ok(Json(json!({ "message": "Database connected", "time": time })))
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreateTaskBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<String>,
}

/// POST /tasks
pub async fn create_task(
    State(state): State<AppState>,
    Json(body): Json<CreateTaskBody>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let input = NewTask {
        title: body.title,
        description: body.description,
        priority: parse_opt::<Priority>(body.priority.as_deref())?,
        due_date: parse_due_date(body.due_date.as_deref())?,
        status: parse_opt::<TaskStatus>(body.status.as_deref())?,
    };
    let task = TaskRepo::new(state.db.clone()).create(&input)?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub sort: Option<String>,
}

/// GET /tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let filter = TaskFilter {
        status: parse_opt::<TaskStatus>(params.status.as_deref())?,
        priority: parse_opt::<Priority>(params.priority.as_deref())?,
        sort: SortOrder::from_param(params.sort.as_deref()),
    };
    let tasks = TaskRepo::new(state.db.clone()).list(&filter)?;
    Ok(Json(tasks))
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateTaskBody {
    pub status: Option<String>,
    pub priority: Option<String>,
}

/// PATCH /tasks/{id}
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateTaskBody>,
) -> Result<Json<Task>, ApiError> {
    let patch = TaskPatch {
        status: parse_opt::<TaskStatus>(body.status.as_deref())?,
        priority: parse_opt::<Priority>(body.priority.as_deref())?,
    };
    let task = TaskRepo::new(state.db.clone()).update(&TaskId::from_raw(id), &patch)?;
    Ok(Json(task))
}

/// DELETE /tasks/{id}
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    TaskRepo::new(state.db.clone()).delete(&TaskId::from_raw(id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /tasks/insights
pub async fn insights(State(state): State<AppState>) -> Result<Json<InsightsReport>, ApiError> {
    let report = TaskRepo::new(state.db.clone()).insights()?;
    Ok(Json(report))
}

fn parse_opt<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr<Err = String>,
{
    raw.map(str::parse)
        .transpose()
        .map_err(ApiError::invalid)
}

fn parse_due_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    raw.map(|s| {
        s.parse::<NaiveDate>()
            .map_err(|e| ApiError::invalid(format!("invalid due_date: {e}")))
    })
    .transpose()
}
