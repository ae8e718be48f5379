use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

pub const FORBIDDEN_MESSAGE: &str = "Mission Control is localhost-only.";

/// Reject every request whose `Host` does not name the loopback interface.
pub async fn localhost_only(req: Request, next: Next) -> Response {
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().host())
        .map(str::to_owned);

    match host.as_deref() {
        Some(h) if is_local_host(hostname(h)) => next.run(req).await,
        other => {
            warn!(host = ?other, path = %req.uri().path(), "rejected non-local request");
            (StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE).into_response()
        }
    }
}

/// Strip the port from a `Host` value. Handles `[::1]:3100` and bare `::1`.
fn hostname(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    if host.matches(':').count() > 1 {
        return host;
    }
    host.split(':').next().unwrap_or(host)
}

pub fn is_local_host(hostname: &str) -> bool {
    hostname.eq_ignore_ascii_case("localhost") || hostname == "127.0.0.1" || hostname == "::1"
}
