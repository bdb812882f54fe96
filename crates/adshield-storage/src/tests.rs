use crate::store::company::{CompanyFilter, CompanyRow, CompanyUpdate};
use crate::store::notification::{NotificationLogFilter, NotificationLogRow};
use crate::store::run::RunFilter;
use crate::store::Store;
use chrono::Utc;

async fn mem_store() -> Store {
    Store::new("sqlite::memory:").await.expect("in-memory store")
}

fn company(name: &str) -> CompanyRow {
    CompanyRow {
        id: adshield_common::id::next_id(),
        name: name.to_string(),
        timezone: "Asia/Kolkata".to_string(),
        currency_code: "INR".to_string(),
        min_severity: "OK".to_string(),
        quiet_hours_start: None,
        quiet_hours_end: None,
        digest_hour_local: 9,
        slack_webhook_url: None,
        summary_webhook_url: None,
        brand_webhook_urls: None,
        daily_meta_cap: None,
        alerts_csv_url: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn company_roundtrip_and_update() {
    let store = mem_store().await;
    let created = store.insert_company(&company("Acme")).await.unwrap();

    let fetched = store
        .get_company_by_id(&created.id)
        .await
        .unwrap()
        .expect("company exists");
    assert_eq!(fetched.name, "Acme");
    assert_eq!(fetched.timezone, "Asia/Kolkata");

    let upd = CompanyUpdate {
        min_severity: Some("WARN".to_string()),
        quiet_hours_start: Some(Some("21:00".to_string())),
        quiet_hours_end: Some(Some("07:00".to_string())),
        daily_meta_cap: Some(Some(500.0)),
        ..Default::default()
    };
    let updated = store
        .update_company(&created.id, &upd)
        .await
        .unwrap()
        .expect("company exists");
    assert_eq!(updated.min_severity, "WARN");
    assert_eq!(updated.quiet_hours_start.as_deref(), Some("21:00"));
    assert_eq!(updated.daily_meta_cap, Some(500.0));
    // Untouched fields survive
    assert_eq!(updated.name, "Acme");
}

#[tokio::test]
async fn update_missing_company_returns_none() {
    let store = mem_store().await;
    let result = store
        .update_company("does-not-exist", &CompanyUpdate::default())
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn company_listing_filters_by_name() {
    let store = mem_store().await;
    store.insert_company(&company("Acme")).await.unwrap();
    store.insert_company(&company("Beta Corp")).await.unwrap();

    let all = store
        .list_companies(&CompanyFilter::default(), 20, 0)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let filter = CompanyFilter {
        name_contains: Some("Beta".to_string()),
    };
    let hits = store.list_companies(&filter, 20, 0).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(store.count_companies(&filter).await.unwrap(), 1);
}

#[tokio::test]
async fn default_brand_is_created_once() {
    let store = mem_store().await;
    let c = store.insert_company(&company("Acme")).await.unwrap();

    let first = store
        .ensure_default_brand(&c.id, &c.name, &c.currency_code)
        .await
        .unwrap();
    assert_eq!(first.name, "Acme");
    assert_eq!(first.currency_code, "INR");

    let second = store
        .ensure_default_brand(&c.id, &c.name, &c.currency_code)
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert_eq!(store.list_brands_by_company(&c.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn provider_account_lookup_spans_brands() {
    let store = mem_store().await;
    let c = store.insert_company(&company("Acme")).await.unwrap();
    let brand = store
        .ensure_default_brand(&c.id, &c.name, &c.currency_code)
        .await
        .unwrap();

    assert!(store
        .find_provider_account_for_company(&c.id, "meta")
        .await
        .unwrap()
        .is_none());

    store
        .attach_ad_account(&brand.id, "meta", "act_123")
        .await
        .unwrap();
    let found = store
        .find_provider_account_for_company(&c.id, "meta")
        .await
        .unwrap()
        .expect("account attached");
    assert_eq!(found.external_id, "act_123");

    // Other providers do not match
    assert!(store
        .find_provider_account_for_company(&c.id, "google")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn ledger_begin_then_finish_posted() {
    let store = mem_store().await;
    let c = store.insert_company(&company("Acme")).await.unwrap();

    assert!(store
        .get_run(&c.id, "2025-06-01", "meta-graph")
        .await
        .unwrap()
        .is_none());

    let pending = store
        .begin_run(&c.id, "2025-06-01", "meta-graph", Some(42.0), Some(100.0))
        .await
        .unwrap();
    assert!(pending.ok);
    assert!(!pending.posted);
    assert_eq!(pending.spend, Some(42.0));

    let finished = store
        .finish_run(&c.id, "2025-06-01", "meta-graph", true, true, None)
        .await
        .unwrap()
        .expect("pending row exists");
    assert!(finished.posted);
    assert!(finished.ok);
    assert!(finished.error.is_none());
}

#[tokio::test]
async fn ledger_rerun_preserves_posted_flag() {
    let store = mem_store().await;
    let c = store.insert_company(&company("Acme")).await.unwrap();

    store
        .begin_run(&c.id, "2025-06-01", "meta-graph", Some(42.0), None)
        .await
        .unwrap();
    store
        .finish_run(&c.id, "2025-06-01", "meta-graph", true, true, None)
        .await
        .unwrap();

    // A later invocation refreshing the snapshot must not regress posted.
    let again = store
        .begin_run(&c.id, "2025-06-01", "meta-graph", Some(55.0), None)
        .await
        .unwrap();
    assert!(again.posted);
    assert_eq!(again.spend, Some(55.0));

    // Still exactly one row for the bucket.
    let filter = RunFilter {
        company_id: Some(c.id.clone()),
        ..Default::default()
    };
    assert_eq!(store.count_runs(&filter).await.unwrap(), 1);
}

#[tokio::test]
async fn ledger_records_failures() {
    let store = mem_store().await;
    let c = store.insert_company(&company("Acme")).await.unwrap();

    store
        .begin_run(&c.id, "2025-06-01", "meta-graph", None, None)
        .await
        .unwrap();
    let failed = store
        .finish_run(
            &c.id,
            "2025-06-01",
            "meta-graph",
            false,
            false,
            Some("Slack 404: no_service"),
        )
        .await
        .unwrap()
        .expect("pending row exists");
    assert!(!failed.posted);
    assert!(!failed.ok);
    assert_eq!(failed.error.as_deref(), Some("Slack 404: no_service"));
}

#[tokio::test]
async fn finish_without_begin_is_a_noop() {
    let store = mem_store().await;
    let result = store
        .finish_run("nobody", "2025-06-01", "meta-graph", true, true, None)
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn runs_in_range_are_ordered_and_bounded() {
    let store = mem_store().await;
    let c = store.insert_company(&company("Acme")).await.unwrap();

    for (date, spend) in [
        ("2025-05-30", 10.0),
        ("2025-06-01", 20.0),
        ("2025-06-03", 30.0),
        ("2025-06-10", 40.0),
    ] {
        store
            .begin_run(&c.id, date, "meta-graph", Some(spend), None)
            .await
            .unwrap();
    }

    let window = store
        .list_runs_in_range(&c.id, "2025-06-01", "2025-06-07")
        .await
        .unwrap();
    assert_eq!(window.len(), 2);
    assert_eq!(window[0].run_date, "2025-06-01");
    assert_eq!(window[1].run_date, "2025-06-03");
}

#[tokio::test]
async fn notification_log_roundtrip_and_cleanup() {
    let store = mem_store().await;
    let row = NotificationLogRow {
        id: adshield_common::id::next_id(),
        company_id: "c1".to_string(),
        purpose: "summary".to_string(),
        destination: "hooks.slack.com".to_string(),
        status: "sent".to_string(),
        http_status: Some(200),
        error_message: None,
        request_body: None,
        duration_ms: 12,
        created_at: Utc::now(),
    };
    store.insert_notification_log(&row).await.unwrap();

    let filter = NotificationLogFilter {
        company_id: Some("c1".to_string()),
        ..Default::default()
    };
    let logs = store.list_notification_logs(&filter, 20, 0).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, "sent");

    // Nothing is older than 30 days yet
    assert_eq!(store.cleanup_notification_logs(30).await.unwrap(), 0);
    // Zero retention wipes everything
    assert_eq!(store.cleanup_notification_logs(0).await.unwrap(), 1);
    assert_eq!(store.count_notification_logs(&filter).await.unwrap(), 0);
}
