use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use adshield_storage::{NotificationLogFilter, RunFilter};

use crate::api::pagination::PaginationParams;
use crate::api::{error_response, success_paginated_response};
use crate::logging::TraceId;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct RunListParams {
    /// Filter by company ID
    pub company_id: Option<String>,
    /// Filter by business day ("YYYY-MM-DD")
    pub run_date: Option<String>,
    /// Filter by source (e.g. "digest", "meta-graph")
    pub source: Option<String>,
    /// Filter by posted flag
    pub posted: Option<bool>,
}

#[derive(Serialize, ToSchema)]
struct RunOverview {
    id: String,
    company_id: String,
    run_date: String,
    source: String,
    ok: bool,
    posted: bool,
    spend: Option<f64>,
    cap: Option<f64>,
    error: Option<String>,
    updated_at: String,
}

/// Inspect the run ledger.
#[utoipa::path(
    get,
    path = "/v1/runs",
    tag = "Runs",
    params(PaginationParams, RunListParams),
    responses(
        (status = 200, description = "Ledger entries", body = Vec<RunOverview>),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError)
    )
)]
pub async fn list_runs(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(params): Query<RunListParams>,
) -> impl IntoResponse {
    let filter = RunFilter {
        company_id: params.company_id,
        run_date: params.run_date,
        source: params.source,
        posted_eq: params.posted,
    };
    let total = match state.store.count_runs(&filter).await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count ledger entries");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error");
        }
    };
    match state
        .store
        .list_runs(&filter, pagination.limit(), pagination.offset())
        .await
    {
        Ok(rows) => {
            let items: Vec<RunOverview> = rows
                .into_iter()
                .map(|r| RunOverview {
                    id: r.id,
                    company_id: r.company_id,
                    run_date: r.run_date,
                    source: r.source,
                    ok: r.ok,
                    posted: r.posted,
                    spend: r.spend,
                    cap: r.cap,
                    error: r.error,
                    updated_at: r.updated_at.to_rfc3339(),
                })
                .collect();
            success_paginated_response(
                StatusCode::OK,
                &trace_id,
                items,
                total,
                pagination.limit(),
                pagination.offset(),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list ledger entries");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error")
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct NotificationLogParams {
    /// Filter by company ID
    pub company_id: Option<String>,
    /// Filter by purpose ("summary" / "alert")
    pub purpose: Option<String>,
    /// Filter by status ("sent" / "failed")
    pub status: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct NotificationLogOverview {
    id: String,
    company_id: String,
    purpose: String,
    destination: String,
    status: String,
    http_status: Option<i32>,
    error_message: Option<String>,
    duration_ms: i64,
    created_at: String,
}

/// Inspect the dispatch audit log.
#[utoipa::path(
    get,
    path = "/v1/notifications/logs",
    tag = "Runs",
    params(PaginationParams, NotificationLogParams),
    responses(
        (status = 200, description = "Dispatch log", body = Vec<NotificationLogOverview>),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError)
    )
)]
pub async fn list_notification_logs(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(params): Query<NotificationLogParams>,
) -> impl IntoResponse {
    let filter = NotificationLogFilter {
        company_id: params.company_id,
        purpose: params.purpose,
        status: params.status,
    };
    let total = match state.store.count_notification_logs(&filter).await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count notification logs");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error");
        }
    };
    match state
        .store
        .list_notification_logs(&filter, pagination.limit(), pagination.offset())
        .await
    {
        Ok(rows) => {
            let items: Vec<NotificationLogOverview> = rows
                .into_iter()
                .map(|l| NotificationLogOverview {
                    id: l.id,
                    company_id: l.company_id,
                    purpose: l.purpose,
                    destination: l.destination,
                    status: l.status,
                    http_status: l.http_status,
                    error_message: l.error_message,
                    duration_ms: l.duration_ms,
                    created_at: l.created_at.to_rfc3339(),
                })
                .collect();
            success_paginated_response(
                StatusCode::OK,
                &trace_id,
                items,
                total,
                pagination.limit(),
                pagination.offset(),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list notification logs");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error")
        }
    }
}
