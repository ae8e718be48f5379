//! HTTP handlers. Every JSON response carries `ok`; failures add `error`.

pub mod calendar;
pub mod health;
pub mod memory;
pub mod settings;
pub mod status;
pub mod tasks;

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use mission_core::MissionError;
use mission_store::StoreError;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::error;

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult<T> = Result<T, ApiError>;

pub fn api_error(err: MissionError) -> ApiError {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!(code = err.code(), "{err}");
    }
    (status, Json(json!({ "ok": false, "error": err.to_string() })))
}

pub fn store_error(err: StoreError) -> ApiError {
    api_error(match err {
        StoreError::NotFound { kind, id } => MissionError::NotFound { kind, id },
        other => MissionError::Storage(other.to_string()),
    })
}

pub fn bad_request(msg: impl Into<String>) -> ApiError {
    api_error(MissionError::BadRequest(msg.into()))
}

/// Decode a JSON body into `T`, answering 400 on malformed or mistyped input.
pub fn parse_body<T: DeserializeOwned>(body: Result<Json<Value>, JsonRejection>) -> ApiResult<T> {
    let Json(value) = body.map_err(|e| bad_request(e.body_text()))?;
    serde_json::from_value(value).map_err(|e| bad_request(e.to_string()))
}
