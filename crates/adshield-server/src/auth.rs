use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error_response;
use crate::logging::TraceId;
use crate::state::AppState;

/// Shared-secret gate for batch-trigger and admin routes.
///
/// A request is authorized when it carries `Authorization: Bearer <secret>`
/// matching the configured cron secret, or (when `allow_header_trigger` is
/// on) the `x-cron: 1` header the hosting scheduler sets on its own
/// invocations.
pub fn is_authorized(state: &AppState, req: &Request) -> bool {
    let bearer = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    if let (Some(secret), Some(presented)) = (state.config.cron.secret.as_deref(), bearer) {
        if !secret.is_empty() && presented == secret {
            return true;
        }
    }

    if state.config.cron.allow_header_trigger {
        let by_header = req
            .headers()
            .get("x-cron")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            == Some("1");
        if by_header {
            return true;
        }
    }

    false
}

pub async fn cron_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if is_authorized(&state, &req) {
        return next.run(req).await;
    }

    let trace_id = req
        .extensions()
        .get::<TraceId>()
        .map(|t| t.0.clone())
        .unwrap_or_default();
    tracing::warn!(trace_id = %trace_id, path = %req.uri().path(), "Unauthorized trigger request");
    error_response(StatusCode::UNAUTHORIZED, &trace_id, "Unauthorized").into_response()
}
