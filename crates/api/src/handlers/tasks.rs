//! Handlers for the task submission and polling endpoints.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use migplan_core::request::MigrationRequest;

use crate::error::AppResult;
use crate::models::{ResultBody, StatusBody, TaskCreated, TaskIdQuery};
use crate::state::AppState;

/// POST /new
///
/// Submit a new migration-analysis job. Returns 201 with the task id; the
/// task is already `RUNNING` and will be picked up by a worker. Never blocks
/// on task completion.
pub async fn start_task(
    State(state): State<AppState>,
    Json(request): Json<MigrationRequest>,
) -> AppResult<impl IntoResponse> {
    let taskid = state.dispatcher.submit(request).await?;
    Ok((StatusCode::CREATED, Json(TaskCreated { taskid })))
}

/// GET /status?task_id={uuid}
///
/// Status projection for polling clients. 404 if the id is unknown.
pub async fn get_status(
    State(state): State<AppState>,
    Query(params): Query<TaskIdQuery>,
) -> AppResult<impl IntoResponse> {
    let status = state.store.get_status(params.task_id).await?;
    Ok(Json(StatusBody { status }))
}

/// GET /getresult?task_id={uuid}
///
/// Full result fetch. `result` is null while the task is still `RUNNING`;
/// once terminal it carries the tagged outcome payload. 404 if the id is
/// unknown.
pub async fn get_result(
    State(state): State<AppState>,
    Query(params): Query<TaskIdQuery>,
) -> AppResult<impl IntoResponse> {
    let task = state.store.get(params.task_id).await?;
    Ok(Json(ResultBody {
        taskid: task.id,
        status: task.status,
        result: task.result,
    }))
}
