pub mod companies;
pub mod cron;
pub mod pagination;
pub mod runs;
pub mod system;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::state::AppState;

/// API error response.
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// Error code (HTTP status mirrored; 0 on success)
    pub err_code: i32,
    /// Error message
    pub err_msg: String,
    /// Trace ID for log correlation
    pub trace_id: String,
}

/// Unified response envelope.
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// 0 on success
    pub err_code: i32,
    /// "success" on success
    pub err_msg: String,
    pub trace_id: String,
    /// Payload, when there is one
    pub data: Option<T>,
}

/// Paginated listing payload.
#[derive(Serialize, ToSchema)]
pub struct PaginatedData<T>
where
    T: Serialize,
{
    pub items: Vec<T>,
    pub total: u64,
    pub limit: usize,
    pub offset: usize,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

pub fn success_empty_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: 0,
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

pub fn success_paginated_response<T>(
    status: StatusCode,
    trace_id: &str,
    items: Vec<T>,
    total: u64,
    limit: usize,
    offset: usize,
) -> Response
where
    T: Serialize,
{
    success_response(
        status,
        trace_id,
        PaginatedData {
            items,
            total,
            limit,
            offset,
        },
    )
}

pub fn error_response(status: StatusCode, trace_id: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiError {
            err_code: status.as_u16() as i32,
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
        }),
    )
        .into_response()
}

/// Routes reachable without the cron secret.
pub fn public_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(system::health))
}

/// Admin CRUD and batch-trigger routes, gated by the cron secret.
pub fn protected_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(companies::list_companies, companies::create_company))
        .routes(routes!(companies::get_company, companies::update_company))
        .routes(routes!(companies::list_brands, companies::create_brand))
        .routes(routes!(companies::attach_ad_account))
        .routes(routes!(companies::list_users, companies::create_user))
        .routes(routes!(runs::list_runs))
        .routes(routes!(runs::list_notification_logs))
        .routes(routes!(cron::trigger_digest))
        .routes(routes!(cron::trigger_alert_scan))
        .routes(routes!(cron::trigger_spend_digest))
        .routes(routes!(cron::trigger_guardrail))
        .routes(routes!(cron::trigger_weekly_receipt))
}
