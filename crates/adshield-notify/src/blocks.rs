//! Slack Block Kit payload builders.
//!
//! Numbers in these messages always come from code, never from free text:
//! builders take already-computed values and only do layout.

use adshield_common::money::format_money;
use adshield_common::types::{AlertItem, DigestPayload, Severity};
use serde_json::{json, Value};

fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::Crit => "🔴",
        Severity::Warn => "⚠️",
        Severity::Ok => "✅",
    }
}

/// Fallback `text` field for a digest message (shown in notifications and
/// clients without block support).
pub fn digest_text(company: &str, payload: &DigestPayload) -> String {
    format!(
        "Daily digest — {company}: {} stable, {} risks, {} critical",
        payload.summary.ok, payload.summary.warn, payload.summary.crit
    )
}

/// Daily digest blocks: header, severity tally, one line per item.
pub fn digest_blocks(company: &str, payload: &DigestPayload) -> Vec<Value> {
    let date = payload.date.format("%b %e").to_string();
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": format!("🛡 Daily Digest — {company}"), "emoji": true }
        }),
        json!({
            "type": "context",
            "elements": [{ "type": "mrkdwn", "text": format!(
                "*{}* stable • *{}* risks • *{}* critical — {date}",
                payload.summary.ok, payload.summary.warn, payload.summary.crit
            )}]
        }),
    ];

    let lines: Vec<String> = payload
        .items
        .iter()
        .map(|i| {
            let lead = i
                .brand
                .as_deref()
                .map(|b| format!("*{b}* — "))
                .unwrap_or_default();
            let tail = i
                .detail
                .as_deref()
                .map(|d| format!(" — {d}"))
                .unwrap_or_default();
            format!("{} {lead}{}{tail}", severity_icon(i.severity), i.title)
        })
        .collect();

    blocks.push(json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": if lines.is_empty() {
            "_No items today._".to_string()
        } else {
            lines.join("\n")
        }}
    }));

    if let Some(note) = &payload.source_note {
        blocks.push(json!({
            "type": "context",
            "elements": [{ "type": "mrkdwn", "text": format!("_{note}_") }]
        }));
    }

    blocks
}

/// Alert-scan blocks: a numbered shortlist of the highest-priority items.
pub fn alert_blocks(heading: &str, items: &[AlertItem], as_of: &str) -> Vec<Value> {
    let top: Vec<String> = items
        .iter()
        .take(5)
        .enumerate()
        .map(|(i, a)| format!("*{}.* {} {}", i + 1, severity_icon(a.severity), a.text))
        .collect();

    vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": heading, "emoji": true }
        }),
        json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": if top.is_empty() {
                "_No alerts today._".to_string()
            } else {
                top.join("\n")
            }}
        }),
        json!({
            "type": "context",
            "elements": [{ "type": "mrkdwn", "text": format!("as of {as_of}") }]
        }),
    ]
}

/// Over-budget alert: today's spend vs the daily cap.
pub fn over_budget_blocks(provider: &str, spend: f64, cap: f64, currency: &str) -> Vec<Value> {
    let pct = if cap > 0.0 {
        ((spend / cap) * 100.0).round() as i64
    } else {
        0
    };
    vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": format!("🚨 Spend Alert: {provider}"), "emoji": true }
        }),
        json!({
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": format!("*Today's Spend*\n{}", format_money(spend, currency)) },
                { "type": "mrkdwn", "text": format!("*Daily Cap*\n{}", format_money(cap, currency)) },
                { "type": "mrkdwn", "text": format!("*At*\n{pct}% of cap") },
            ]
        }),
    ]
}

/// Inputs for the daily spend digest message.
#[derive(Debug, Clone)]
pub struct SpendDigest {
    pub company: String,
    pub currency: String,
    pub ymd: String,
    pub spend: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub cap: Option<f64>,
    pub over: bool,
    pub note: Option<String>,
}

pub fn spend_digest_blocks(d: &SpendDigest) -> Vec<Value> {
    let mut blocks = vec![json!({
        "type": "header",
        "text": { "type": "plain_text", "text": format!("Daily Spend — {} ({})", d.company, d.ymd), "emoji": true }
    })];

    if let Some(note) = &d.note {
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!(":warning: _{note}_") }
        }));
    }

    let cap_text = d
        .cap
        .map(|c| format_money(c, &d.currency))
        .unwrap_or_else(|| "—".to_string());

    blocks.push(json!({
        "type": "section",
        "fields": [
            { "type": "mrkdwn", "text": format!("*Spend*\n{}", format_money(d.spend, &d.currency)) },
            { "type": "mrkdwn", "text": format!("*Impressions*\n{}", d.impressions) },
            { "type": "mrkdwn", "text": format!("*Clicks*\n{}", d.clicks) },
            { "type": "mrkdwn", "text": format!("*Cap*\n{cap_text}") },
        ]
    }));

    blocks.push(json!({
        "type": "context",
        "elements": [{ "type": "mrkdwn", "text": if d.over {
            ":rotating_light: *Over budget today!*"
        } else {
            ":white_check_mark: On track"
        }}]
    }));

    blocks
}

/// Inputs for the weekly receipt summary.
#[derive(Debug, Clone)]
pub struct WeeklyReceipt {
    pub company: String,
    pub currency: String,
    pub range_label: String,
    pub total_spend: f64,
    pub days_total: u32,
    pub days_safe: u32,
    pub cap_hits: u32,
    pub failures: u32,
}

pub fn weekly_receipt_blocks(r: &WeeklyReceipt) -> Vec<Value> {
    let status = if r.failures == 0 && r.cap_hits == 0 {
        "✅ *All calm:* no failures or cap hits this week".to_string()
    } else {
        "⚠️ *Attention:* see the week's incidents below".to_string()
    };

    let mut bullets = vec![
        format!("• *Days all-safe:* {}/{}", r.days_safe, r.days_total),
        format!(
            "• *Total ad spend monitored:* {}",
            format_money(r.total_spend, &r.currency)
        ),
    ];
    if r.cap_hits > 0 {
        bullets.push(format!("• *Cap hits:* {} day(s) reached the daily cap", r.cap_hits));
    }
    if r.failures > 0 {
        bullets.push(format!("• *Failures:* {} run(s) with errors", r.failures));
    }

    vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": format!("🛡 Weekly Receipt — {}", r.range_label), "emoji": true }
        }),
        json!({
            "type": "context",
            "elements": [{ "type": "mrkdwn", "text": format!("*{}*", r.company) }]
        }),
        json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": status }
        }),
        json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": bullets.join("\n") }
        }),
    ]
}
