use super::*;
use crate::batch::BatchOptions;
use crate::testutil::*;
use adshield_common::types::Severity;
use chrono::{TimeZone, Utc};
use std::sync::Arc;

fn at(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap()
}

fn opts(dry: bool, force: bool, now: chrono::DateTime<Utc>) -> BatchOptions {
    BatchOptions { dry, force, now }
}

// Company prefs: minSeverity=WARN, quiet hours 21:00-07:00, local time 22:00.
// The OK item falls to the severity filter; the WARN item survives it but is
// suppressed by quiet hours. Nothing goes out.
#[tokio::test]
async fn quiet_hours_suppress_non_critical_batch() {
    let sender = RecordingSender::new();
    let feed = Arc::new(StaticFeed {
        items: vec![
            item("a", Severity::Ok, None),
            item("b", Severity::Warn, None),
        ],
    });
    let state = test_state(feed, sender.clone()).await;
    state
        .store
        .insert_company(&test_company("Acme"))
        .await
        .unwrap();

    let summary = run_digest_batch(&state, &opts(false, true, at(22, 0)))
        .await
        .unwrap();

    assert_eq!(summary.sent, 0);
    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.skipped.severity, 1);
    assert_eq!(summary.skipped.quiet_hours, 1);
    assert_eq!(sender.count().await, 0);
}

// Same company, but a CRIT item is present during quiet hours: the batch
// must go out anyway, to the global webhook.
#[tokio::test]
async fn crit_bypasses_quiet_hours() {
    let sender = RecordingSender::new();
    let feed = Arc::new(StaticFeed {
        items: vec![item("c", Severity::Crit, None)],
    });
    let state = test_state(feed, sender.clone()).await;
    state
        .store
        .insert_company(&test_company("Acme"))
        .await
        .unwrap();

    let summary = run_digest_batch(&state, &opts(false, true, at(22, 0)))
        .await
        .unwrap();

    assert_eq!(summary.sent, 1);
    assert_eq!(summary.skipped.quiet_hours, 0);
    let sent = sender.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, HOOK_GLOBAL);
}

// No webhook configured at all: severity and quiet-hours pass but the router
// resolves nothing; skip, don't error.
#[tokio::test]
async fn missing_webhook_is_a_skip() {
    let sender = RecordingSender::new();
    let feed = Arc::new(StaticFeed {
        items: vec![item("c", Severity::Crit, None)],
    });
    let state = test_state(feed, sender.clone()).await;
    let mut company = test_company("Acme");
    company.slack_webhook_url = None;
    state.store.insert_company(&company).await.unwrap();

    let summary = run_digest_batch(&state, &opts(false, true, at(12, 0)))
        .await
        .unwrap();

    assert_eq!(summary.sent, 0);
    assert_eq!(summary.skipped.no_webhook, 1);
    assert_eq!(sender.count().await, 0);
}

#[tokio::test]
async fn digest_hour_gate_defers_until_due() {
    let sender = RecordingSender::new();
    let feed = Arc::new(StaticFeed {
        items: vec![item("b", Severity::Warn, None)],
    });
    let state = test_state(feed, sender.clone()).await;
    let mut company = test_company("Acme");
    company.quiet_hours_start = None;
    company.quiet_hours_end = None;
    company.digest_hour_local = 9;
    state.store.insert_company(&company).await.unwrap();

    // 12:00 local, digest hour is 9: deferred.
    let summary = run_digest_batch(&state, &opts(false, false, at(12, 0)))
        .await
        .unwrap();
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.skipped.not_due, 1);

    // 09:30 local: due.
    let summary = run_digest_batch(&state, &opts(false, false, at(9, 30)))
        .await
        .unwrap();
    assert_eq!(summary.sent, 1);
    assert_eq!(sender.count().await, 1);
}

#[tokio::test]
async fn posted_ledger_entry_short_circuits_reruns() {
    let sender = RecordingSender::new();
    let feed = Arc::new(StaticFeed {
        items: vec![item("c", Severity::Crit, None)],
    });
    let state = test_state(feed, sender.clone()).await;
    let company = state
        .store
        .insert_company(&test_company("Acme"))
        .await
        .unwrap();

    let first = run_digest_batch(&state, &opts(false, true, at(12, 0)))
        .await
        .unwrap();
    assert_eq!(first.sent, 1);

    let run = state
        .store
        .get_run(&company.id, "2025-06-02", DIGEST_SOURCE)
        .await
        .unwrap()
        .expect("ledger entry written");
    assert!(run.posted);
    assert!(run.ok);

    // Second non-dry invocation for the same bucket: zero additional sends.
    let second = run_digest_batch(&state, &opts(false, true, at(12, 5)))
        .await
        .unwrap();
    assert_eq!(second.sent, 0);
    assert_eq!(second.skipped.already_posted, 1);
    assert_eq!(sender.count().await, 1);
}

#[tokio::test]
async fn dry_run_never_dispatches_or_touches_the_ledger() {
    let sender = RecordingSender::new();
    let feed = Arc::new(StaticFeed {
        items: vec![item("c", Severity::Crit, None)],
    });
    let state = test_state(feed, sender.clone()).await;
    let company = state
        .store
        .insert_company(&test_company("Acme"))
        .await
        .unwrap();

    let summary = run_digest_batch(&state, &opts(true, true, at(12, 0)))
        .await
        .unwrap();

    assert!(summary.dry);
    assert_eq!(summary.sent, 1); // would-send
    assert_eq!(sender.count().await, 0);
    assert!(state
        .store
        .get_run(&company.id, "2025-06-02", DIGEST_SOURCE)
        .await
        .unwrap()
        .is_none());

    // A dry run must not block the later real run.
    let live = run_digest_batch(&state, &opts(false, true, at(12, 5)))
        .await
        .unwrap();
    assert_eq!(live.sent, 1);
    assert_eq!(sender.count().await, 1);
}

#[tokio::test]
async fn dispatch_failure_is_recorded_and_does_not_abort_the_batch() {
    let sender = RecordingSender::rejecting(500);
    let feed = Arc::new(StaticFeed {
        items: vec![item("c", Severity::Crit, None)],
    });
    let state = test_state(feed, sender.clone()).await;
    let first = state
        .store
        .insert_company(&test_company("Acme"))
        .await
        .unwrap();
    state
        .store
        .insert_company(&test_company("Beta"))
        .await
        .unwrap();

    let summary = run_digest_batch(&state, &opts(false, true, at(12, 0)))
        .await
        .unwrap();

    // Both companies were attempted; both failed; the batch itself succeeded.
    assert_eq!(summary.companies, 2);
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.skipped.send_failed, 2);

    let run = state
        .store
        .get_run(&first.id, "2025-06-02", DIGEST_SOURCE)
        .await
        .unwrap()
        .expect("failed attempt still recorded");
    assert!(!run.posted);
    assert!(!run.ok);
    assert!(run.error.as_deref().unwrap_or_default().contains("500"));

    // Audit log carries the failure too.
    let logs = state
        .store
        .list_notification_logs(&Default::default(), 20, 0)
        .await
        .unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|l| l.status == "failed"));
    assert!(logs.iter().all(|l| l.destination == "hooks.slack.com"));
}

#[tokio::test]
async fn feed_failure_skips_company_and_batch_continues() {
    let sender = RecordingSender::new();
    let state = test_state(Arc::new(FailingFeed), sender.clone()).await;
    state
        .store
        .insert_company(&test_company("Acme"))
        .await
        .unwrap();

    let summary = run_digest_batch(&state, &opts(false, true, at(12, 0)))
        .await
        .unwrap();
    assert_eq!(summary.skipped.fetch_failed, 1);
    assert_eq!(summary.sent, 0);
}

#[tokio::test]
async fn company_without_feed_is_a_skip() {
    let sender = RecordingSender::new();
    let feed = Arc::new(StaticFeed { items: vec![] });
    let state = test_state(feed, sender.clone()).await;
    let mut company = test_company("Acme");
    company.alerts_csv_url = None;
    state.store.insert_company(&company).await.unwrap();

    let summary = run_digest_batch(&state, &opts(false, true, at(12, 0)))
        .await
        .unwrap();
    assert_eq!(summary.skipped.no_feed, 1);
}

#[tokio::test]
async fn digest_prefers_summary_webhook() {
    let sender = RecordingSender::new();
    let feed = Arc::new(StaticFeed {
        items: vec![item("c", Severity::Crit, None)],
    });
    let state = test_state(feed, sender.clone()).await;
    let mut company = test_company("Acme");
    company.summary_webhook_url = Some(HOOK_SUMMARY.to_string());
    state.store.insert_company(&company).await.unwrap();

    run_digest_batch(&state, &opts(false, true, at(12, 0)))
        .await
        .unwrap();

    let sent = sender.sent.lock().await;
    assert_eq!(sent[0].0, HOOK_SUMMARY);
}

#[tokio::test]
async fn alert_scan_routes_brand_groups_separately() {
    let sender = RecordingSender::new();
    let feed = Arc::new(StaticFeed {
        items: vec![
            item("a", Severity::Crit, Some("Acme Shoes")),
            item("b", Severity::Warn, None),
        ],
    });
    let state = test_state(feed, sender.clone()).await;
    let mut company = test_company("Acme");
    company.quiet_hours_start = None;
    company.quiet_hours_end = None;
    company.brand_webhook_urls = Some(format!(r#"{{"Acme Shoes": "{HOOK_BRAND}"}}"#));
    state.store.insert_company(&company).await.unwrap();

    let summary = run_alert_scan(&state, &opts(false, false, at(12, 0)))
        .await
        .unwrap();
    assert_eq!(summary.sent, 2);

    let sent = sender.sent.lock().await;
    let destinations: Vec<&str> = sent.iter().map(|(url, _)| url.as_str()).collect();
    assert!(destinations.contains(&HOOK_BRAND));
    assert!(destinations.contains(&HOOK_GLOBAL));
}

#[tokio::test]
async fn alert_scan_without_brand_match_falls_back_to_global() {
    let sender = RecordingSender::new();
    let feed = Arc::new(StaticFeed {
        items: vec![item("a", Severity::Crit, Some("Unknown Brand"))],
    });
    let state = test_state(feed, sender.clone()).await;
    let mut company = test_company("Acme");
    company.quiet_hours_start = None;
    company.quiet_hours_end = None;
    state.store.insert_company(&company).await.unwrap();

    let summary = run_alert_scan(&state, &opts(false, false, at(12, 0)))
        .await
        .unwrap();
    assert_eq!(summary.sent, 1);
    assert_eq!(sender.sent.lock().await[0].0, HOOK_GLOBAL);
}

#[tokio::test]
async fn alert_scan_respects_quiet_hours_for_non_critical() {
    let sender = RecordingSender::new();
    let feed = Arc::new(StaticFeed {
        items: vec![item("a", Severity::Warn, None)],
    });
    let state = test_state(feed, sender.clone()).await;
    state
        .store
        .insert_company(&test_company("Acme"))
        .await
        .unwrap();

    let summary = run_alert_scan(&state, &opts(false, false, at(23, 0)))
        .await
        .unwrap();
    assert_eq!(summary.sent, 0);
    assert_eq!(summary.skipped.quiet_hours, 1);
}
