//! Shared pieces of the batch orchestrations: option/summary types, the
//! company-webhook view, and the dispatch-and-audit helper.

use adshield_common::types::Severity;
use adshield_notify::error::NotifyError;
use adshield_notify::routing::CompanyWebhooks;
use adshield_notify::slack::{truncate_body, MAX_BODY_LENGTH};
use adshield_notify::SlackMessage;
use adshield_storage::{CompanyRow, NotificationLogRow};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Instant;
use utoipa::ToSchema;

use crate::state::AppState;

/// How one batch invocation should behave.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Preview only: no dispatch, no ledger or audit-log writes.
    pub dry: bool,
    /// Ignore the per-company digest-hour gate (admin-triggered runs).
    pub force: bool,
    /// The instant the batch evaluates against; handlers pass `Utc::now()`.
    pub now: DateTime<Utc>,
}

impl BatchOptions {
    pub fn live(dry: bool, force: bool) -> Self {
        Self {
            dry,
            force,
            now: Utc::now(),
        }
    }
}

/// Why candidates were not delivered. Item-granular where items exist
/// (`severity`, `quiet_hours`, `not_due`, `no_webhook`); company-granular
/// where no items could be produced (`no_feed`, `fetch_failed`, ...).
#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
pub struct SkipCounts {
    pub no_feed: u32,
    pub fetch_failed: u32,
    pub severity: u32,
    pub quiet_hours: u32,
    pub not_due: u32,
    pub no_webhook: u32,
    pub no_account: u32,
    pub no_cap: u32,
    pub no_data: u32,
    pub already_posted: u32,
    pub send_failed: u32,
}

/// Result of one batch invocation, returned to the HTTP caller. Never an
/// error once the per-company loop begins; everything inside the loop is
/// accounted here instead.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BatchSummary {
    /// Companies examined
    pub companies: u32,
    /// Candidate items scanned across all feeds
    pub scanned: u32,
    /// Messages delivered (or would-be-delivered, under dry run)
    pub sent: u32,
    /// Digest emails delivered
    pub emailed: u32,
    pub dry: bool,
    pub skipped: SkipCounts,
}

/// The router's view of a company's endpoints.
pub fn company_webhooks(c: &CompanyRow) -> CompanyWebhooks {
    CompanyWebhooks {
        global: c.slack_webhook_url.clone(),
        summary: c.summary_webhook_url.clone(),
        by_brand: CompanyWebhooks::brand_map_from_json(c.brand_webhook_urls.as_deref()),
    }
}

/// A company's minimum severity, defensively defaulting to the lowest rank
/// on a bad stored value (the API validates writes, old rows may predate it).
pub fn min_severity(c: &CompanyRow) -> Severity {
    c.min_severity.parse().unwrap_or(Severity::Ok)
}

/// Host part of a webhook URL. Paths embed the webhook secret and must not
/// reach logs or the audit table.
pub fn destination_host(webhook_url: &str) -> String {
    url::Url::parse(webhook_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

/// Single dispatch attempt plus an audit-log row recording how it went.
/// The audit write is best-effort: a failed insert is logged and does not
/// change the dispatch outcome.
pub async fn dispatch_and_log(
    state: &AppState,
    company_id: &str,
    purpose: &str,
    webhook_url: &str,
    message: &SlackMessage,
) -> Result<(), NotifyError> {
    let start = Instant::now();
    let result = state.sender.send(webhook_url, message).await;
    let duration_ms = start.elapsed().as_millis() as i64;

    let (status, http_status, error_message) = match &result {
        Ok(()) => ("sent", None, None),
        Err(NotifyError::Api { status, body }) => (
            "failed",
            Some(*status as i32),
            Some(truncate_body(body, MAX_BODY_LENGTH)),
        ),
        Err(e) => ("failed", None, Some(truncate_body(&e.to_string(), MAX_BODY_LENGTH))),
    };

    let request_body = serde_json::to_string(message)
        .ok()
        .map(|b| truncate_body(&b, MAX_BODY_LENGTH));

    let row = NotificationLogRow {
        id: adshield_common::id::next_id(),
        company_id: company_id.to_string(),
        purpose: purpose.to_string(),
        destination: destination_host(webhook_url),
        status: status.to_string(),
        http_status,
        error_message,
        request_body,
        duration_ms,
        created_at: Utc::now(),
    };
    if let Err(e) = state.store.insert_notification_log(&row).await {
        tracing::warn!(company = %company_id, error = %e, "Failed to write notification log");
    }

    result
}
