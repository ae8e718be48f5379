use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use mission_store::SettingsPatch;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{parse_body, store_error, ApiResult};
use crate::app::AppState;

/// GET /api/settings
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "ok": true, "settings": state.settings.get() }))
}

/// PATCH /api/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let patch: SettingsPatch = parse_body(body)?;
    let settings = state.settings.save(patch).map_err(store_error)?;
    Ok(Json(json!({ "ok": true, "settings": settings })))
}
