use super::*;
use crate::batch::BatchOptions;
use crate::testutil::*;
use adshield_meta::MetaClient;
use chrono::{TimeZone, Utc};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn at_noon() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 12, 0, 0).unwrap()
}

fn opts(dry: bool) -> BatchOptions {
    BatchOptions {
        dry,
        force: false,
        now: at_noon(),
    }
}

async fn mock_insights(server: &MockServer, account: &str, spend: f64) {
    Mock::given(method("GET"))
        .and(path(format!("/{account}/insights")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "spend": spend.to_string(), "impressions": "1000", "clicks": "50" }]
        })))
        .mount(server)
        .await;
}

async fn state_with_meta(server: &MockServer) -> crate::state::AppState {
    let sender = RecordingSender::new();
    let feed = Arc::new(StaticFeed { items: vec![] });
    let mut state = test_state(feed, sender).await;
    state.meta = Some(Arc::new(MetaClient::with_base_url("token", &server.uri())));
    state
}

async fn seed_company_with_account(
    state: &crate::state::AppState,
    cap: Option<f64>,
) -> adshield_storage::CompanyRow {
    let mut company = test_company("Acme");
    company.quiet_hours_start = None;
    company.quiet_hours_end = None;
    company.daily_meta_cap = cap;
    let company = state.store.insert_company(&company).await.unwrap();
    let brand = state
        .store
        .ensure_default_brand(&company.id, &company.name, &company.currency_code)
        .await
        .unwrap();
    state
        .store
        .attach_ad_account(&brand.id, "meta", "act_42")
        .await
        .unwrap();
    company
}

#[tokio::test]
async fn spend_digest_requires_a_configured_token() {
    let sender = RecordingSender::new();
    let state = test_state(Arc::new(StaticFeed { items: vec![] }), sender).await;
    let err = run_spend_digest(&state, &opts(false)).await.unwrap_err();
    assert!(err.to_string().contains("not configured"));
}

#[tokio::test]
async fn spend_digest_posts_and_records_the_ledger() {
    let server = MockServer::start().await;
    mock_insights(&server, "act_42", 123.45).await;
    let state = state_with_meta(&server).await;
    let company = seed_company_with_account(&state, Some(500.0)).await;

    let summary = run_spend_digest(&state, &opts(false)).await.unwrap();
    assert_eq!(summary.sent, 1);

    let run = state
        .store
        .get_run(&company.id, "2025-06-02", SPEND_SOURCE)
        .await
        .unwrap()
        .expect("ledger entry written");
    assert!(run.posted);
    assert_eq!(run.spend, Some(123.45));
    assert_eq!(run.cap, Some(500.0));

    // Second invocation for the same bucket short-circuits.
    let second = run_spend_digest(&state, &opts(false)).await.unwrap();
    assert_eq!(second.sent, 0);
    assert_eq!(second.skipped.already_posted, 1);
}

#[tokio::test]
async fn spend_digest_dry_run_fetches_but_does_not_post() {
    let server = MockServer::start().await;
    mock_insights(&server, "act_42", 10.0).await;
    let state = state_with_meta(&server).await;
    let company = seed_company_with_account(&state, None).await;

    let summary = run_spend_digest(&state, &opts(true)).await.unwrap();
    assert_eq!(summary.sent, 1);
    assert!(state
        .store
        .get_run(&company.id, "2025-06-02", SPEND_SOURCE)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn spend_digest_skips_companies_without_webhooks() {
    let server = MockServer::start().await;
    let state = state_with_meta(&server).await;
    let mut company = test_company("Hookless");
    company.slack_webhook_url = None;
    state.store.insert_company(&company).await.unwrap();

    let summary = run_spend_digest(&state, &opts(false)).await.unwrap();
    assert_eq!(summary.skipped.no_webhook, 1);
    assert_eq!(summary.sent, 0);
}

#[tokio::test]
async fn guardrail_posts_only_over_cap() {
    let server = MockServer::start().await;
    mock_insights(&server, "act_42", 150.0).await;
    let state = state_with_meta(&server).await;
    seed_company_with_account(&state, Some(100.0)).await;

    let outcomes = run_guardrail(&state, &opts(false)).await.unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].posted);
    assert_eq!(outcomes[0].spend, Some(150.0));
    assert!(outcomes[0].skipped.is_none());
}

#[tokio::test]
async fn guardrail_stays_silent_under_cap() {
    let server = MockServer::start().await;
    mock_insights(&server, "act_42", 50.0).await;
    let state = state_with_meta(&server).await;
    seed_company_with_account(&state, Some(100.0)).await;

    let outcomes = run_guardrail(&state, &opts(false)).await.unwrap();
    assert!(!outcomes[0].posted);
    assert!(outcomes[0].skipped.is_none());
    assert_eq!(outcomes[0].spend, Some(50.0));
}

#[tokio::test]
async fn guardrail_reports_missing_cap_as_skip() {
    let server = MockServer::start().await;
    let state = state_with_meta(&server).await;
    seed_company_with_account(&state, None).await;

    let outcomes = run_guardrail(&state, &opts(false)).await.unwrap();
    assert!(!outcomes[0].posted);
    assert_eq!(outcomes[0].skipped.as_deref(), Some("no cap"));
}

#[tokio::test]
async fn weekly_receipt_aggregates_the_ledger_window() {
    let server = MockServer::start().await;
    let state = state_with_meta(&server).await;
    let mut company = test_company("Acme");
    company.quiet_hours_start = None;
    company.quiet_hours_end = None;
    let company = state.store.insert_company(&company).await.unwrap();

    // Window for 2025-06-02 is 2025-05-26 .. 2025-06-01.
    state
        .store
        .begin_run(&company.id, "2025-05-28", SPEND_SOURCE, Some(120.0), Some(100.0))
        .await
        .unwrap();
    state
        .store
        .finish_run(&company.id, "2025-05-28", SPEND_SOURCE, true, true, None)
        .await
        .unwrap();
    state
        .store
        .begin_run(&company.id, "2025-05-30", SPEND_SOURCE, Some(40.0), Some(100.0))
        .await
        .unwrap();
    state
        .store
        .finish_run(&company.id, "2025-05-30", SPEND_SOURCE, true, true, None)
        .await
        .unwrap();
    // Outside the window; must be ignored.
    state
        .store
        .begin_run(&company.id, "2025-06-02", SPEND_SOURCE, Some(999.0), None)
        .await
        .unwrap();

    let summary = run_weekly_receipt(&state, &opts(false)).await.unwrap();
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.scanned, 2);

    let run = state
        .store
        .get_run(&company.id, "2025-06-02", RECEIPT_SOURCE)
        .await
        .unwrap()
        .expect("receipt recorded");
    assert!(run.posted);
    assert_eq!(run.spend, Some(160.0)); // 120 + 40

    // Rerun within the day short-circuits.
    let second = run_weekly_receipt(&state, &opts(false)).await.unwrap();
    assert_eq!(second.sent, 0);
    assert_eq!(second.skipped.already_posted, 1);
}

#[tokio::test]
async fn weekly_receipt_skips_companies_without_history() {
    let server = MockServer::start().await;
    let state = state_with_meta(&server).await;
    let mut company = test_company("Fresh");
    company.quiet_hours_start = None;
    company.quiet_hours_end = None;
    state.store.insert_company(&company).await.unwrap();

    let summary = run_weekly_receipt(&state, &opts(false)).await.unwrap();
    assert_eq!(summary.skipped.no_data, 1);
    assert_eq!(summary.sent, 0);
}
