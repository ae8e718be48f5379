use axum::{
    extract::{Query, State},
    Json,
};
use mission_core::MissionError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{api_error, ApiResult};
use crate::app::AppState;
use crate::memory::{list_memory_docs, resolve_workspace_root};

#[derive(Deserialize)]
pub struct MemoryQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// GET /api/memory?q=
pub async fn search_memory(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MemoryQuery>,
) -> ApiResult<Json<Value>> {
    let root = resolve_workspace_root(
        state.config.memory.workspace_dir.as_deref(),
        &state.settings.get().openclaw_workspace_dir,
    );
    let docs = tokio::task::spawn_blocking(move || list_memory_docs(&root, query.q.as_deref()))
        .await
        .map_err(|e| api_error(MissionError::Internal(e.to_string())))?;
    Ok(Json(json!({ "ok": true, "docs": docs })))
}
