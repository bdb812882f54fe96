use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::api::{error_response, success_response};
use crate::batch::{BatchOptions, BatchSummary};
use crate::digest::{run_alert_scan, run_digest_batch};
use crate::logging::TraceId;
use crate::spend::{run_guardrail, run_spend_digest, run_weekly_receipt, GuardrailOutcome};
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct TriggerParams {
    /// "1"/"true" = preview only: no dispatch, no ledger writes
    pub dry: Option<String>,
    /// "1"/"true" = ignore the per-company digest-hour gate
    pub force: Option<String>,
}

fn flag(v: &Option<String>) -> bool {
    matches!(v.as_deref(), Some("1") | Some("true"))
}

impl TriggerParams {
    fn dry(&self) -> bool {
        flag(&self.dry)
    }
    fn force(&self) -> bool {
        flag(&self.force)
    }
}

/// Run the daily digest batch now.
#[utoipa::path(
    post,
    path = "/v1/cron/digest",
    tag = "Cron",
    params(TriggerParams),
    responses(
        (status = 200, description = "Batch summary", body = BatchSummary),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError),
        (status = 500, description = "Batch-level failure", body = crate::api::ApiError)
    )
)]
pub async fn trigger_digest(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<TriggerParams>,
) -> impl IntoResponse {
    let opts = BatchOptions::live(params.dry(), params.force());
    match run_digest_batch(&state, &opts).await {
        Ok(summary) => success_response(StatusCode::OK, &trace_id, summary),
        Err(e) => {
            tracing::error!(error = %e, "Digest batch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, &e.to_string())
        }
    }
}

/// Run the alert scan batch now.
#[utoipa::path(
    post,
    path = "/v1/cron/alert-scan",
    tag = "Cron",
    params(TriggerParams),
    responses(
        (status = 200, description = "Batch summary", body = BatchSummary),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError),
        (status = 500, description = "Batch-level failure", body = crate::api::ApiError)
    )
)]
pub async fn trigger_alert_scan(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<TriggerParams>,
) -> impl IntoResponse {
    let opts = BatchOptions::live(params.dry(), false);
    match run_alert_scan(&state, &opts).await {
        Ok(summary) => success_response(StatusCode::OK, &trace_id, summary),
        Err(e) => {
            tracing::error!(error = %e, "Alert scan failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, &e.to_string())
        }
    }
}

/// Run the spend digest batch now.
#[utoipa::path(
    post,
    path = "/v1/cron/spend-digest",
    tag = "Cron",
    params(TriggerParams),
    responses(
        (status = 200, description = "Batch summary", body = BatchSummary),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError),
        (status = 500, description = "Batch-level failure", body = crate::api::ApiError)
    )
)]
pub async fn trigger_spend_digest(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<TriggerParams>,
) -> impl IntoResponse {
    let opts = BatchOptions::live(params.dry(), false);
    match run_spend_digest(&state, &opts).await {
        Ok(summary) => success_response(StatusCode::OK, &trace_id, summary),
        Err(e) => {
            tracing::error!(error = %e, "Spend digest batch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, &e.to_string())
        }
    }
}

/// Run the budget guardrail now.
#[utoipa::path(
    post,
    path = "/v1/cron/guardrail",
    tag = "Cron",
    responses(
        (status = 200, description = "Per-company outcomes", body = Vec<GuardrailOutcome>),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError),
        (status = 500, description = "Batch-level failure", body = crate::api::ApiError)
    )
)]
pub async fn trigger_guardrail(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let opts = BatchOptions::live(false, false);
    match run_guardrail(&state, &opts).await {
        Ok(outcomes) => success_response(StatusCode::OK, &trace_id, outcomes),
        Err(e) => {
            tracing::error!(error = %e, "Guardrail batch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, &e.to_string())
        }
    }
}

/// Run the weekly receipt batch now.
#[utoipa::path(
    post,
    path = "/v1/cron/weekly-receipt",
    tag = "Cron",
    params(TriggerParams),
    responses(
        (status = 200, description = "Batch summary", body = BatchSummary),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError),
        (status = 500, description = "Batch-level failure", body = crate::api::ApiError)
    )
)]
pub async fn trigger_weekly_receipt(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<TriggerParams>,
) -> impl IntoResponse {
    let opts = BatchOptions::live(params.dry(), false);
    match run_weekly_receipt(&state, &opts).await {
        Ok(summary) => success_response(StatusCode::OK, &trace_id, summary),
        Err(e) => {
            tracing::error!(error = %e, "Weekly receipt batch failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, &e.to_string())
        }
    }
}
