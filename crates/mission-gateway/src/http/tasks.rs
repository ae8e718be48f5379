use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use mission_store::{NewTask, Owner, TaskPatch};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{bad_request, parse_body, store_error, ApiResult};
use crate::app::AppState;

/// GET /api/tasks, most recently updated first.
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let tasks = state.tasks.list().map_err(store_error)?;
    Ok(Json(json!({ "ok": true, "tasks": tasks })))
}

/// POST /api/tasks
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(raw) = body.map_err(|e| bad_request(e.body_text()))?;

    let title = raw.get("title").and_then(Value::as_str).unwrap_or_default();
    if title.trim().is_empty() {
        return Err(bad_request("title is required"));
    }
    let owner_ok = raw
        .get("owner")
        .and_then(Value::as_str)
        .is_some_and(|o| o.parse::<Owner>().is_ok());
    if !owner_ok {
        return Err(bad_request("owner must be 'operator' or 'agent'"));
    }

    let input: NewTask = parse_body(Ok(Json(raw)))?;
    let task = state.tasks.create(input).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "task": task }))))
}

/// PATCH /api/tasks/{id}
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let patch: TaskPatch = parse_body(body)?;
    let task = state.tasks.update(&id, patch).map_err(store_error)?;
    Ok(Json(json!({ "ok": true, "task": task })))
}
