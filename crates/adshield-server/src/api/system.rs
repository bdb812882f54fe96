use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::success_response;
use crate::logging::TraceId;
use crate::state::AppState;

#[derive(Serialize, ToSchema)]
struct HealthInfo {
    status: String,
    version: String,
    uptime_secs: i64,
    meta_configured: bool,
    smtp_configured: bool,
}

/// Service liveness and feature flags.
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "System",
    responses(
        (status = 200, description = "Service health", body = HealthInfo)
    )
)]
pub async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let info = HealthInfo {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: (Utc::now() - state.start_time).num_seconds(),
        meta_configured: state.meta.is_some(),
        smtp_configured: state.mailer.is_some(),
    };
    success_response(StatusCode::OK, &trace_id, info)
}
