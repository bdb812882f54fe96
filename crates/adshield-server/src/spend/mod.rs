//! Spend-side orchestration: daily spend digest, budget guardrail, and the
//! weekly receipt. All three read the Graph API through the configured
//! client and share the per-company skip accounting of the digest batch.

#[cfg(test)]
mod tests;

use adshield_common::money::format_money;
use adshield_common::tz;
use adshield_meta::retry::RetryPolicy;
use adshield_meta::MetaClient;
use adshield_notify::blocks::{
    over_budget_blocks, spend_digest_blocks, weekly_receipt_blocks, SpendDigest, WeeklyReceipt,
};
use adshield_notify::routing::WebhookPurpose;
use adshield_notify::slack::{truncate_body, MAX_BODY_LENGTH};
use adshield_notify::SlackMessage;
use adshield_storage::CompanyRow;
use anyhow::Result;
use chrono::Days;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::batch::{company_webhooks, dispatch_and_log, BatchOptions, BatchSummary};
use crate::state::AppState;

/// Ledger source keys.
pub const SPEND_SOURCE: &str = "meta-graph";
pub const RECEIPT_SOURCE: &str = "weekly-receipt";

fn require_meta(state: &AppState) -> Result<Arc<MetaClient>> {
    state
        .meta
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Graph API access token not configured"))
}

/// Which ad account a company's spend fetch targets: the most recently
/// attached account in the store, else the first account on the token.
async fn pick_account(
    state: &AppState,
    meta: &MetaClient,
    company: &CompanyRow,
) -> Option<String> {
    match state
        .store
        .find_provider_account_for_company(&company.id, "meta")
        .await
    {
        Ok(Some(account)) => return Some(account.external_id),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(company = %company.name, error = %e, "Ad-account lookup failed");
        }
    }

    match meta.list_ad_accounts().await {
        Ok(accounts) => accounts.into_iter().next().map(|a| {
            if a.id.is_empty() {
                a.account_id
            } else {
                a.id
            }
        }),
        Err(e) => {
            tracing::warn!(company = %company.name, error = %e, "Ad-account listing failed");
            None
        }
    }
}

/// Daily spend digest with the run-ledger idempotency guard: at most one
/// posted message per (company, local day).
pub async fn run_spend_digest(state: &AppState, opts: &BatchOptions) -> Result<BatchSummary> {
    let meta = require_meta(state)?;
    let companies = state.store.list_all_companies().await?;
    let mut summary = BatchSummary {
        dry: opts.dry,
        ..Default::default()
    };

    for company in companies {
        summary.companies += 1;
        if let Err(e) = spend_company(state, &meta, opts, &company, &mut summary).await {
            tracing::error!(company = %company.name, error = %e, "Spend digest failed for company");
            summary.skipped.send_failed += 1;
        }
    }

    tracing::info!(
        companies = summary.companies,
        sent = summary.sent,
        dry = summary.dry,
        "Spend digest batch finished"
    );
    Ok(summary)
}

async fn spend_company(
    state: &AppState,
    meta: &MetaClient,
    opts: &BatchOptions,
    company: &CompanyRow,
    summary: &mut BatchSummary,
) -> Result<()> {
    let hooks = company_webhooks(company);
    let Some(webhook) = hooks.pick(WebhookPurpose::Summary, None) else {
        summary.skipped.no_webhook += 1;
        return Ok(());
    };

    let Some(account) = pick_account(state, meta, company).await else {
        summary.skipped.no_account += 1;
        return Ok(());
    };

    let ymd = tz::business_day_str(opts.now, &company.timezone);
    let day = match meta
        .fetch_day_spend_with_retries(&account, &ymd, RetryPolicy::default())
        .await
    {
        Ok(day) => day,
        Err(e) => {
            tracing::warn!(company = %company.name, account = %account, error = %e, "Spend fetch failed, skipping company");
            summary.skipped.fetch_failed += 1;
            return Ok(());
        }
    };
    summary.scanned += 1;

    if opts.dry {
        summary.sent += 1;
        return Ok(());
    }

    if let Some(run) = state.store.get_run(&company.id, &ymd, SPEND_SOURCE).await? {
        if run.posted {
            summary.skipped.already_posted += 1;
            return Ok(());
        }
    }

    let cap = company.daily_meta_cap.filter(|c| *c > 0.0);
    let over = cap.is_some_and(|c| day.spend >= c);

    state
        .store
        .begin_run(&company.id, &ymd, SPEND_SOURCE, Some(day.spend), cap)
        .await?;

    let digest = SpendDigest {
        company: company.name.clone(),
        currency: company.currency_code.clone(),
        ymd: ymd.clone(),
        spend: day.spend,
        impressions: day.impressions,
        clicks: day.clicks,
        cap,
        over,
        note: None,
    };
    let message = SlackMessage::new(
        format!(
            "Daily spend — {}: {}",
            company.name,
            format_money(day.spend, &company.currency_code)
        ),
        spend_digest_blocks(&digest),
    );

    match dispatch_and_log(state, &company.id, "summary", webhook, &message).await {
        Ok(()) => {
            state
                .store
                .finish_run(&company.id, &ymd, SPEND_SOURCE, true, true, None)
                .await?;
            summary.sent += 1;
        }
        Err(e) => {
            let detail = truncate_body(&e.to_string(), MAX_BODY_LENGTH);
            state
                .store
                .finish_run(&company.id, &ymd, SPEND_SOURCE, false, false, Some(&detail))
                .await?;
            tracing::error!(company = %company.name, error = %e, "Spend digest dispatch failed");
            summary.skipped.send_failed += 1;
        }
    }
    Ok(())
}

/// Per-company outcome of a guardrail pass.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GuardrailOutcome {
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    pub posted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spend: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cap: Option<f64>,
}

/// Budget guardrail: posts a spend alert for every company whose spend today
/// is at or over its daily cap. Companies without a cap or webhook are
/// reported as skipped, never as errors.
pub async fn run_guardrail(state: &AppState, opts: &BatchOptions) -> Result<Vec<GuardrailOutcome>> {
    let meta = require_meta(state)?;
    let companies = state.store.list_all_companies().await?;
    let mut outcomes = Vec::with_capacity(companies.len());

    for company in companies {
        outcomes.push(guardrail_company(state, &meta, opts, &company).await);
    }
    Ok(outcomes)
}

async fn guardrail_company(
    state: &AppState,
    meta: &MetaClient,
    opts: &BatchOptions,
    company: &CompanyRow,
) -> GuardrailOutcome {
    let mut outcome = GuardrailOutcome {
        company: company.name.clone(),
        skipped: None,
        posted: false,
        account: None,
        spend: None,
        cap: company.daily_meta_cap,
    };

    let Some(cap) = company.daily_meta_cap.filter(|c| *c > 0.0) else {
        outcome.skipped = Some("no cap".to_string());
        return outcome;
    };

    // Over-cap is an alert; the router sends it to the global endpoint.
    let hooks = company_webhooks(company);
    let Some(webhook) = hooks.pick(WebhookPurpose::Alert, None) else {
        outcome.skipped = Some("no webhook".to_string());
        return outcome;
    };

    let Some(account) = pick_account(state, meta, company).await else {
        outcome.skipped = Some("no ad account".to_string());
        return outcome;
    };
    outcome.account = Some(account.clone());

    let ymd = tz::business_day_str(opts.now, &company.timezone);
    let day = match meta
        .fetch_day_spend_with_retries(&account, &ymd, RetryPolicy::default())
        .await
    {
        Ok(day) => day,
        Err(e) => {
            outcome.skipped = Some(format!("fetch failed: {e}"));
            return outcome;
        }
    };
    outcome.spend = Some(day.spend);

    if day.spend < cap {
        return outcome;
    }

    let message = SlackMessage::new(
        format!(
            "Over budget: {} ({} of {})",
            company.name,
            format_money(day.spend, &company.currency_code),
            format_money(cap, &company.currency_code)
        ),
        over_budget_blocks("Meta", day.spend, cap, &company.currency_code),
    );
    match dispatch_and_log(state, &company.id, "alert", webhook, &message).await {
        Ok(()) => outcome.posted = true,
        Err(e) => {
            tracing::error!(company = %company.name, error = %e, "Guardrail dispatch failed");
            outcome.skipped = Some(format!("send failed: {e}"));
        }
    }
    outcome
}

/// Weekly receipt: a 7-day ledger roll-up ending yesterday in company local
/// time. Ledger-guarded so a rerun within the same day short-circuits.
pub async fn run_weekly_receipt(state: &AppState, opts: &BatchOptions) -> Result<BatchSummary> {
    let companies = state.store.list_all_companies().await?;
    let mut summary = BatchSummary {
        dry: opts.dry,
        ..Default::default()
    };

    for company in companies {
        summary.companies += 1;
        if let Err(e) = receipt_company(state, opts, &company, &mut summary).await {
            tracing::error!(company = %company.name, error = %e, "Weekly receipt failed for company");
            summary.skipped.send_failed += 1;
        }
    }
    Ok(summary)
}

async fn receipt_company(
    state: &AppState,
    opts: &BatchOptions,
    company: &CompanyRow,
    summary: &mut BatchSummary,
) -> Result<()> {
    let hooks = company_webhooks(company);
    let Some(webhook) = hooks.pick(WebhookPurpose::Summary, None) else {
        summary.skipped.no_webhook += 1;
        return Ok(());
    };

    // 7-day window ending yesterday, all in company local days.
    let today = tz::business_day(opts.now, &company.timezone);
    let end = today.checked_sub_days(Days::new(1)).unwrap_or(today);
    let start = end.checked_sub_days(Days::new(6)).unwrap_or(end);
    let from = start.format("%Y-%m-%d").to_string();
    let to = end.format("%Y-%m-%d").to_string();

    let rows = state.store.list_runs_in_range(&company.id, &from, &to).await?;
    if rows.is_empty() {
        summary.skipped.no_data += 1;
        return Ok(());
    }
    summary.scanned += rows.len() as u32;

    let total_spend: f64 = rows.iter().filter_map(|r| r.spend).sum();
    let mut incident_days: BTreeSet<&str> = BTreeSet::new();
    let mut cap_hits = 0u32;
    let mut failures = 0u32;
    for row in &rows {
        let cap_hit = matches!((row.spend, row.cap), (Some(s), Some(c)) if c > 0.0 && s >= c);
        if cap_hit {
            cap_hits += 1;
        }
        if !row.ok {
            failures += 1;
        }
        if cap_hit || !row.ok {
            incident_days.insert(row.run_date.as_str());
        }
    }
    let days_total = 7u32;
    let days_safe = days_total - incident_days.len() as u32;

    if opts.dry {
        summary.sent += 1;
        return Ok(());
    }

    let ymd = tz::business_day_str(opts.now, &company.timezone);
    if let Some(run) = state.store.get_run(&company.id, &ymd, RECEIPT_SOURCE).await? {
        if run.posted {
            summary.skipped.already_posted += 1;
            return Ok(());
        }
    }

    let range_label = format!("{} → {}", start.format("%b %d"), end.format("%b %d"));
    let receipt = WeeklyReceipt {
        company: company.name.clone(),
        currency: company.currency_code.clone(),
        range_label: range_label.clone(),
        total_spend,
        days_total,
        days_safe,
        cap_hits,
        failures,
    };
    let message = SlackMessage::new(
        format!("Weekly receipt — {} ({range_label})", company.name),
        weekly_receipt_blocks(&receipt),
    );

    state
        .store
        .begin_run(&company.id, &ymd, RECEIPT_SOURCE, Some(total_spend), None)
        .await?;
    match dispatch_and_log(state, &company.id, "summary", webhook, &message).await {
        Ok(()) => {
            state
                .store
                .finish_run(&company.id, &ymd, RECEIPT_SOURCE, true, true, None)
                .await?;
            summary.sent += 1;
        }
        Err(e) => {
            let detail = truncate_body(&e.to_string(), MAX_BODY_LENGTH);
            state
                .store
                .finish_run(&company.id, &ymd, RECEIPT_SOURCE, false, false, Some(&detail))
                .await?;
            summary.skipped.send_failed += 1;
        }
    }
    Ok(())
}
