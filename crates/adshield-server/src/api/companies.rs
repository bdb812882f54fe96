use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use adshield_common::types::Severity;
use adshield_storage::{BrandRow, CompanyFilter, CompanyRow, CompanyUpdate};

use crate::api::pagination::PaginationParams;
use crate::api::{error_response, success_paginated_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;

/// Company settings as returned by the API.
#[derive(Serialize, ToSchema)]
struct CompanyOverview {
    id: String,
    name: String,
    timezone: String,
    currency_code: String,
    min_severity: String,
    quiet_hours_start: Option<String>,
    quiet_hours_end: Option<String>,
    digest_hour_local: i32,
    slack_webhook_url: Option<String>,
    summary_webhook_url: Option<String>,
    brand_webhook_urls: Option<String>,
    daily_meta_cap: Option<f64>,
    alerts_csv_url: Option<String>,
    created_at: String,
    updated_at: String,
}

fn to_overview(c: CompanyRow) -> CompanyOverview {
    CompanyOverview {
        id: c.id,
        name: c.name,
        timezone: c.timezone,
        currency_code: c.currency_code,
        min_severity: c.min_severity,
        quiet_hours_start: c.quiet_hours_start,
        quiet_hours_end: c.quiet_hours_end,
        digest_hour_local: c.digest_hour_local,
        slack_webhook_url: c.slack_webhook_url,
        summary_webhook_url: c.summary_webhook_url,
        brand_webhook_urls: c.brand_webhook_urls,
        daily_meta_cap: c.daily_meta_cap,
        alerts_csv_url: c.alerts_csv_url,
        created_at: c.created_at.to_rfc3339(),
        updated_at: c.updated_at.to_rfc3339(),
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct CompanyListParams {
    /// Substring filter on the company name
    pub name: Option<String>,
}

/// List companies.
#[utoipa::path(
    get,
    path = "/v1/companies",
    tag = "Companies",
    params(PaginationParams, CompanyListParams),
    responses(
        (status = 200, description = "Company list", body = Vec<CompanyOverview>),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError)
    )
)]
pub async fn list_companies(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
    Query(params): Query<CompanyListParams>,
) -> impl IntoResponse {
    let filter = CompanyFilter {
        name_contains: params.name,
    };
    let total = match state.store.count_companies(&filter).await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "Failed to count companies");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error");
        }
    };
    match state
        .store
        .list_companies(&filter, pagination.limit(), pagination.offset())
        .await
    {
        Ok(rows) => success_paginated_response(
            StatusCode::OK,
            &trace_id,
            rows.into_iter().map(to_overview).collect(),
            total,
            pagination.limit(),
            pagination.offset(),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list companies");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error")
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateCompanyRequest {
    name: String,
    #[serde(default = "default_timezone")]
    timezone: String,
    #[serde(default = "default_currency")]
    currency_code: String,
    #[serde(default = "default_min_severity")]
    min_severity: String,
    quiet_hours_start: Option<String>,
    quiet_hours_end: Option<String>,
    #[serde(default = "default_digest_hour")]
    digest_hour_local: i32,
    slack_webhook_url: Option<String>,
    summary_webhook_url: Option<String>,
    brand_webhook_urls: Option<String>,
    daily_meta_cap: Option<f64>,
    alerts_csv_url: Option<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_min_severity() -> String {
    "OK".to_string()
}

fn default_digest_hour() -> i32 {
    9
}

/// Create a company with its notification preferences. A default brand named
/// after the company is bootstrapped alongside it.
#[utoipa::path(
    post,
    path = "/v1/companies",
    tag = "Companies",
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company created", body = CompanyOverview),
        (status = 400, description = "Invalid settings", body = crate::api::ApiError),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError)
    )
)]
pub async fn create_company(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateCompanyRequest>,
) -> impl IntoResponse {
    if req.name.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, &trace_id, "name is required");
    }
    if req.min_severity.parse::<Severity>().is_err() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "min_severity must be one of OK, WARN, CRIT",
        );
    }
    if !(0..24).contains(&req.digest_hour_local) {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "digest_hour_local must be 0-23",
        );
    }

    let row = CompanyRow {
        id: adshield_common::id::next_id(),
        name: req.name.trim().to_string(),
        timezone: req.timezone,
        currency_code: req.currency_code.to_uppercase(),
        min_severity: req.min_severity.to_uppercase(),
        quiet_hours_start: req.quiet_hours_start,
        quiet_hours_end: req.quiet_hours_end,
        digest_hour_local: req.digest_hour_local,
        slack_webhook_url: req.slack_webhook_url,
        summary_webhook_url: req.summary_webhook_url,
        brand_webhook_urls: req.brand_webhook_urls,
        daily_meta_cap: req.daily_meta_cap,
        alerts_csv_url: req.alerts_csv_url,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };

    match state.store.insert_company(&row).await {
        Ok(created) => {
            if let Err(e) = state
                .store
                .ensure_default_brand(&created.id, &created.name, &created.currency_code)
                .await
            {
                tracing::warn!(company = %created.name, error = %e, "Failed to bootstrap default brand");
            }
            success_response(StatusCode::CREATED, &trace_id, to_overview(created))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create company");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error")
        }
    }
}

/// Fetch one company.
#[utoipa::path(
    get,
    path = "/v1/companies/{id}",
    tag = "Companies",
    params(("id" = String, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Company", body = CompanyOverview),
        (status = 404, description = "Not found", body = crate::api::ApiError),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError)
    )
)]
pub async fn get_company(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.get_company_by_id(&id).await {
        Ok(Some(c)) => success_response(StatusCode::OK, &trace_id, to_overview(c)),
        Ok(None) => error_response(StatusCode::NOT_FOUND, &trace_id, "Company not found"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to get company");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error")
        }
    }
}

/// Update company settings. Omitted fields are unchanged; explicit `null`
/// clears a nullable field.
#[utoipa::path(
    put,
    path = "/v1/companies/{id}",
    tag = "Companies",
    params(("id" = String, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Updated company", body = CompanyOverview),
        (status = 400, description = "Invalid settings", body = crate::api::ApiError),
        (status = 404, description = "Not found", body = crate::api::ApiError),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError)
    )
)]
pub async fn update_company(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(upd): Json<CompanyUpdate>,
) -> impl IntoResponse {
    if let Some(ref sev) = upd.min_severity {
        if sev.parse::<Severity>().is_err() {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "min_severity must be one of OK, WARN, CRIT",
            );
        }
    }
    if let Some(hour) = upd.digest_hour_local {
        if !(0..24).contains(&hour) {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "digest_hour_local must be 0-23",
            );
        }
    }

    match state.store.update_company(&id, &upd).await {
        Ok(Some(c)) => success_response(StatusCode::OK, &trace_id, to_overview(c)),
        Ok(None) => error_response(StatusCode::NOT_FOUND, &trace_id, "Company not found"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to update company");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error")
        }
    }
}

#[derive(Serialize, ToSchema)]
struct BrandOverview {
    id: String,
    company_id: String,
    name: String,
    currency_code: String,
    created_at: String,
}

fn brand_to_overview(b: BrandRow) -> BrandOverview {
    BrandOverview {
        id: b.id,
        company_id: b.company_id,
        name: b.name,
        currency_code: b.currency_code,
        created_at: b.created_at.to_rfc3339(),
    }
}

/// List a company's brands.
#[utoipa::path(
    get,
    path = "/v1/companies/{id}/brands",
    tag = "Companies",
    params(("id" = String, Path, description = "Company ID")),
    responses(
        (status = 200, description = "Brand list", body = Vec<BrandOverview>),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError)
    )
)]
pub async fn list_brands(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.list_brands_by_company(&id).await {
        Ok(rows) => success_response(
            StatusCode::OK,
            &trace_id,
            rows.into_iter().map(brand_to_overview).collect::<Vec<_>>(),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list brands");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error")
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateBrandRequest {
    name: String,
    currency_code: Option<String>,
}

/// Create a brand under a company.
#[utoipa::path(
    post,
    path = "/v1/companies/{id}/brands",
    tag = "Companies",
    params(("id" = String, Path, description = "Company ID")),
    request_body = CreateBrandRequest,
    responses(
        (status = 201, description = "Brand created", body = BrandOverview),
        (status = 404, description = "Company not found", body = crate::api::ApiError),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError)
    )
)]
pub async fn create_brand(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateBrandRequest>,
) -> impl IntoResponse {
    let company = match state.store.get_company_by_id(&id).await {
        Ok(Some(c)) => c,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, &trace_id, "Company not found");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to get company");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error");
        }
    };

    let row = BrandRow {
        id: adshield_common::id::next_id(),
        company_id: company.id,
        name: req.name.trim().to_string(),
        currency_code: req
            .currency_code
            .unwrap_or(company.currency_code)
            .to_uppercase(),
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    match state.store.insert_brand(&row).await {
        Ok(created) => success_response(StatusCode::CREATED, &trace_id, brand_to_overview(created)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create brand");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error")
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct AttachAdAccountRequest {
    #[serde(default = "default_provider")]
    provider: String,
    external_id: String,
}

fn default_provider() -> String {
    "meta".to_string()
}

#[derive(Serialize, ToSchema)]
struct AdAccountOverview {
    id: String,
    brand_id: String,
    provider: String,
    external_id: String,
}

/// Attach an external ad account to a brand.
#[utoipa::path(
    post,
    path = "/v1/brands/{id}/adaccounts",
    tag = "Companies",
    params(("id" = String, Path, description = "Brand ID")),
    request_body = AttachAdAccountRequest,
    responses(
        (status = 201, description = "Ad account attached", body = AdAccountOverview),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError)
    )
)]
pub async fn attach_ad_account(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AttachAdAccountRequest>,
) -> impl IntoResponse {
    if req.external_id.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, &trace_id, "external_id is required");
    }
    match state
        .store
        .attach_ad_account(&id, &req.provider, req.external_id.trim())
        .await
    {
        Ok(a) => success_response(
            StatusCode::CREATED,
            &trace_id,
            AdAccountOverview {
                id: a.id,
                brand_id: a.brand_id,
                provider: a.provider,
                external_id: a.external_id,
            },
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to attach ad account");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error")
        }
    }
}

#[derive(Serialize, ToSchema)]
struct UserOverview {
    id: String,
    email: String,
    company_id: Option<String>,
}

/// List a company's digest recipients.
#[utoipa::path(
    get,
    path = "/v1/companies/{id}/users",
    tag = "Companies",
    params(("id" = String, Path, description = "Company ID")),
    responses(
        (status = 200, description = "User list", body = Vec<UserOverview>),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError)
    )
)]
pub async fn list_users(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.store.list_users_by_company(&id).await {
        Ok(rows) => success_response(
            StatusCode::OK,
            &trace_id,
            rows.into_iter()
                .map(|u| UserOverview {
                    id: u.id,
                    email: u.email,
                    company_id: u.company_id,
                })
                .collect::<Vec<_>>(),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to list users");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error")
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    email: String,
}

/// Add a digest recipient to a company.
#[utoipa::path(
    post,
    path = "/v1/companies/{id}/users",
    tag = "Companies",
    params(("id" = String, Path, description = "Company ID")),
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserOverview),
        (status = 401, description = "Unauthorized", body = crate::api::ApiError)
    )
)]
pub async fn create_user(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    if !req.email.contains('@') {
        return error_response(StatusCode::BAD_REQUEST, &trace_id, "email is invalid");
    }
    match state.store.insert_user(req.email.trim(), Some(&id)).await {
        Ok(u) => success_response(
            StatusCode::CREATED,
            &trace_id,
            UserOverview {
                id: u.id,
                email: u.email,
                company_id: u.company_id,
            },
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to create user");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &trace_id, "Database error")
        }
    }
}
