//! Calendar read path: manual items merged with generated cron occurrences.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use mission_store::{CalendarItemPatch, NewCalendarItem};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{bad_request, parse_body, store_error, ApiResult};
use crate::app::AppState;

/// GET /api/calendar
///
/// Never fails because of the external scheduler: a cold cache with an
/// unreachable backend still answers with `cache.fallback = true`.
pub async fn list_calendar(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let items = state.calendar.list().map_err(store_error)?;
    let cron = state.cron.read().await;
    Ok(Json(json!({
        "ok": true,
        "items": items,
        "cron": cron.cron,
        "cronEvents": cron.cron_events,
        "cache": cron.cache,
    })))
}

/// POST /api/calendar
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let input: NewCalendarItem =
        parse_body(body).map_err(|_| bad_request("Missing required fields"))?;
    if input.title.trim().is_empty() || input.scheduled_for.trim().is_empty() {
        return Err(bad_request("Missing required fields"));
    }
    let item = state.calendar.add(input).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(json!({ "ok": true, "item": item }))))
}

/// PATCH /api/calendar/{id}
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let patch: CalendarItemPatch = parse_body(body)?;
    let item = state.calendar.update(&id, patch).map_err(store_error)?;
    Ok(Json(json!({ "ok": true, "item": item })))
}

/// DELETE /api/calendar/{id}. Succeeds whether or not the item existed.
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.calendar.delete(&id).map_err(store_error)?;
    Ok(Json(json!({ "ok": true })))
}
