//! Digest and alert-scan orchestration.
//!
//! Both batches walk companies strictly sequentially. Every failure after
//! the company loop starts is converted into a skip counter, so one bad
//! tenant never aborts the rest of the batch. Only the initial company
//! listing can fail the invocation as a whole.

#[cfg(test)]
mod tests;

use adshield_common::types::{filter_by_min_severity, only_non_critical, AlertItem, DigestPayload};
use adshield_common::tz;
use adshield_notify::blocks::{alert_blocks, digest_blocks, digest_text};
use adshield_notify::quiet::QuietHours;
use adshield_notify::routing::WebhookPurpose;
use adshield_notify::slack::{truncate_body, MAX_BODY_LENGTH};
use adshield_notify::SlackMessage;
use adshield_storage::CompanyRow;
use anyhow::Result;
use std::collections::BTreeMap;

use crate::batch::{
    company_webhooks, dispatch_and_log, min_severity, BatchOptions, BatchSummary,
};
use crate::state::AppState;

/// Ledger source key for the daily digest.
pub const DIGEST_SOURCE: &str = "digest";

/// Run the daily digest across all companies.
pub async fn run_digest_batch(state: &AppState, opts: &BatchOptions) -> Result<BatchSummary> {
    let companies = state.store.list_all_companies().await?;
    let mut summary = BatchSummary {
        dry: opts.dry,
        ..Default::default()
    };

    for company in companies {
        summary.companies += 1;
        if let Err(e) = digest_company(state, opts, &company, &mut summary).await {
            // Ledger/store failures mid-company; the batch carries on.
            tracing::error!(company = %company.name, error = %e, "Digest failed for company");
            summary.skipped.send_failed += 1;
        }
    }

    tracing::info!(
        companies = summary.companies,
        scanned = summary.scanned,
        sent = summary.sent,
        dry = summary.dry,
        "Digest batch finished"
    );
    Ok(summary)
}

async fn digest_company(
    state: &AppState,
    opts: &BatchOptions,
    company: &CompanyRow,
    summary: &mut BatchSummary,
) -> Result<()> {
    let Some(feed_url) = company.alerts_csv_url.as_deref().filter(|u| !u.is_empty()) else {
        summary.skipped.no_feed += 1;
        return Ok(());
    };

    let items = match state.feed.fetch_alerts(feed_url).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(company = %company.name, error = %e, "Feed fetch failed, skipping company");
            summary.skipped.fetch_failed += 1;
            return Ok(());
        }
    };
    let fetched = items.len() as u32;
    summary.scanned += fetched;

    let items = filter_by_min_severity(items, min_severity(company));
    summary.skipped.severity += fetched - items.len() as u32;
    if items.is_empty() {
        return Ok(());
    }

    // Quiet hours suppress the batch only when nothing critical survived.
    let hhmm = tz::local_hhmm(opts.now, &company.timezone);
    let quiet = QuietHours::new(
        company.quiet_hours_start.as_deref(),
        company.quiet_hours_end.as_deref(),
    );
    if quiet.contains_hhmm(&hhmm) && only_non_critical(&items) {
        summary.skipped.quiet_hours += items.len() as u32;
        return Ok(());
    }

    if !opts.force && tz::local_hour(opts.now, &company.timezone) != company.digest_hour_local as u32
    {
        summary.skipped.not_due += items.len() as u32;
        return Ok(());
    }

    let hooks = company_webhooks(company);
    let Some(webhook) = hooks.pick(WebhookPurpose::Summary, None) else {
        summary.skipped.no_webhook += items.len() as u32;
        return Ok(());
    };

    if opts.dry {
        summary.sent += 1;
        return Ok(());
    }

    // At-most-one digest per local business day.
    let day = tz::business_day_str(opts.now, &company.timezone);
    if let Some(run) = state.store.get_run(&company.id, &day, DIGEST_SOURCE).await? {
        if run.posted {
            summary.skipped.already_posted += 1;
            return Ok(());
        }
    }

    let payload =
        DigestPayload::from_alerts(opts.now, &items, state.config.digest.source_note.clone());
    let message = SlackMessage::new(
        digest_text(&company.name, &payload),
        digest_blocks(&company.name, &payload),
    );

    // Pending before dispatch, so a crash mid-send stays visible.
    state
        .store
        .begin_run(&company.id, &day, DIGEST_SOURCE, None, None)
        .await?;

    match dispatch_and_log(state, &company.id, "summary", webhook, &message).await {
        Ok(()) => {
            state
                .store
                .finish_run(&company.id, &day, DIGEST_SOURCE, true, true, None)
                .await?;
            summary.sent += 1;
            send_digest_email(state, company, &payload, summary).await;
        }
        Err(e) => {
            let detail = truncate_body(&e.to_string(), MAX_BODY_LENGTH);
            state
                .store
                .finish_run(&company.id, &day, DIGEST_SOURCE, false, false, Some(&detail))
                .await?;
            tracing::error!(company = %company.name, error = %e, "Digest dispatch failed");
            summary.skipped.send_failed += 1;
        }
    }
    Ok(())
}

async fn send_digest_email(
    state: &AppState,
    company: &CompanyRow,
    payload: &DigestPayload,
    summary: &mut BatchSummary,
) {
    let Some(mailer) = &state.mailer else { return };
    let users = match state.store.list_users_by_company(&company.id).await {
        Ok(users) => users,
        Err(e) => {
            tracing::warn!(company = %company.name, error = %e, "Failed to list digest recipients");
            return;
        }
    };
    let subject = format!("🛡 Daily Digest — {}", company.name);
    for user in users {
        match mailer
            .send_digest(&user.email, &subject, &company.name, payload)
            .await
        {
            Ok(()) => summary.emailed += 1,
            Err(e) => {
                tracing::warn!(to = %user.email, error = %e, "Digest email failed");
            }
        }
    }
}

/// Run the alert scan across all companies: surviving items are grouped by
/// brand tag and each group is routed to its brand webhook (global when no
/// brand override matches). No hour gate and no ledger: alerts are fresh
/// signals, not once-a-day summaries.
pub async fn run_alert_scan(state: &AppState, opts: &BatchOptions) -> Result<BatchSummary> {
    let companies = state.store.list_all_companies().await?;
    let mut summary = BatchSummary {
        dry: opts.dry,
        ..Default::default()
    };

    for company in companies {
        summary.companies += 1;
        scan_company(state, opts, &company, &mut summary).await;
    }

    tracing::info!(
        companies = summary.companies,
        scanned = summary.scanned,
        sent = summary.sent,
        dry = summary.dry,
        "Alert scan finished"
    );
    Ok(summary)
}

async fn scan_company(
    state: &AppState,
    opts: &BatchOptions,
    company: &CompanyRow,
    summary: &mut BatchSummary,
) {
    let Some(feed_url) = company.alerts_csv_url.as_deref().filter(|u| !u.is_empty()) else {
        summary.skipped.no_feed += 1;
        return;
    };

    let items = match state.feed.fetch_alerts(feed_url).await {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(company = %company.name, error = %e, "Feed fetch failed, skipping company");
            summary.skipped.fetch_failed += 1;
            return;
        }
    };
    let fetched = items.len() as u32;
    summary.scanned += fetched;

    let items = filter_by_min_severity(items, min_severity(company));
    summary.skipped.severity += fetched - items.len() as u32;
    if items.is_empty() {
        return;
    }

    let hhmm = tz::local_hhmm(opts.now, &company.timezone);
    let quiet = QuietHours::new(
        company.quiet_hours_start.as_deref(),
        company.quiet_hours_end.as_deref(),
    );
    if quiet.contains_hhmm(&hhmm) && only_non_critical(&items) {
        summary.skipped.quiet_hours += items.len() as u32;
        return;
    }

    // Group by brand tag; BTreeMap keeps dispatch order stable.
    let mut groups: BTreeMap<Option<String>, Vec<AlertItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.brand.clone()).or_default().push(item);
    }

    let hooks = company_webhooks(company);
    for (brand, group) in groups {
        let Some(webhook) = hooks.pick(WebhookPurpose::Alert, brand.as_deref()) else {
            summary.skipped.no_webhook += group.len() as u32;
            continue;
        };

        if opts.dry {
            summary.sent += 1;
            continue;
        }

        let scope = brand.as_deref().unwrap_or(&company.name);
        let heading = format!("🛡 Alert Scan — {scope}");
        let as_of = group
            .iter()
            .filter_map(|i| i.updated_at)
            .max()
            .unwrap_or(opts.now)
            .format("%Y-%m-%d %H:%M UTC")
            .to_string();
        let message = SlackMessage::new(
            format!("{heading}: {} alert(s)", group.len()),
            alert_blocks(&heading, &group, &as_of),
        );

        match dispatch_and_log(state, &company.id, "alert", webhook, &message).await {
            Ok(()) => summary.sent += 1,
            Err(e) => {
                tracing::error!(company = %company.name, error = %e, "Alert dispatch failed");
                summary.skipped.send_failed += 1;
            }
        }
    }
}
