use axum::{extract::State, Json};
use mission_core::MissionError;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{api_error, ApiResult};
use crate::app::AppState;

/// GET /api/openclaw/status: proxy of the backend's `/status` card.
pub async fn openclaw_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<Value>> {
    let data = fetch_status(&state).await.map_err(api_error)?;
    Ok(Json(json!({ "ok": true, "data": data })))
}

async fn fetch_status(state: &AppState) -> Result<Value, MissionError> {
    let cfg = &state.config.openclaw;
    let url = format!("{}/status", cfg.base_url.trim_end_matches('/'));

    let mut req = state.http.get(&url);
    if let Some(token) = cfg.token.as_deref().filter(|t| !t.is_empty()) {
        req = req.bearer_auth(token);
    }

    let resp = req
        .send()
        .await
        .map_err(|e| MissionError::Upstream(e.to_string()))?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(MissionError::Upstream(format!(
            "OpenClaw request failed ({}): {text}",
            status.as_u16()
        )));
    }
    resp.json::<Value>()
        .await
        .map_err(|e| MissionError::Upstream(e.to_string()))
}
