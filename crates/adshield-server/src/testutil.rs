//! Fakes shared by the orchestration tests.

use adshield_common::types::{AlertItem, Severity};
use adshield_feed::error::FeedError;
use adshield_feed::FeedSource;
use adshield_notify::error::{NotifyError, Result as NotifyResult};
use adshield_notify::{MessageSender, SlackMessage};
use adshield_storage::{CompanyRow, Store};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::state::AppState;

/// Records every send instead of touching the network. Optionally rejects
/// each attempt with a fixed status.
pub struct RecordingSender {
    pub sent: Mutex<Vec<(String, SlackMessage)>>,
    pub reject_with: Option<u16>,
}

impl RecordingSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            reject_with: None,
        })
    }

    pub fn rejecting(status: u16) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            reject_with: Some(status),
        })
    }

    pub async fn count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, webhook_url: &str, message: &SlackMessage) -> NotifyResult<()> {
        self.sent
            .lock()
            .await
            .push((webhook_url.to_string(), message.clone()));
        match self.reject_with {
            Some(status) => Err(NotifyError::Api {
                status,
                body: "rejected by fake".to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Serves a fixed item list for every company.
pub struct StaticFeed {
    pub items: Vec<AlertItem>,
}

#[async_trait]
impl FeedSource for StaticFeed {
    async fn fetch_alerts(&self, _url: &str) -> Result<Vec<AlertItem>, FeedError> {
        Ok(self.items.clone())
    }
}

/// Always fails, for the fetch-failure path.
pub struct FailingFeed;

#[async_trait]
impl FeedSource for FailingFeed {
    async fn fetch_alerts(&self, _url: &str) -> Result<Vec<AlertItem>, FeedError> {
        Err(FeedError::Http { status: 500 })
    }
}

pub fn item(id: &str, severity: Severity, brand: Option<&str>) -> AlertItem {
    AlertItem {
        id: id.to_string(),
        text: format!("alert {id}"),
        severity,
        brand: brand.map(str::to_string),
        updated_at: None,
    }
}

pub const HOOK_GLOBAL: &str = "https://hooks.slack.com/services/T000/B000/GLOBAL00";
pub const HOOK_SUMMARY: &str = "https://hooks.slack.com/services/T000/B000/SUMMARY0";
pub const HOOK_BRAND: &str = "https://hooks.slack.com/services/T000/B000/BRAND000";

/// A company with UTC timezone, WARN threshold, quiet hours 21:00-07:00 and
/// a valid global webhook; tests adjust fields as needed.
pub fn test_company(name: &str) -> CompanyRow {
    CompanyRow {
        id: adshield_common::id::next_id(),
        name: name.to_string(),
        timezone: "UTC".to_string(),
        currency_code: "USD".to_string(),
        min_severity: "WARN".to_string(),
        quiet_hours_start: Some("21:00".to_string()),
        quiet_hours_end: Some("07:00".to_string()),
        digest_hour_local: 9,
        slack_webhook_url: Some(HOOK_GLOBAL.to_string()),
        summary_webhook_url: None,
        brand_webhook_urls: None,
        daily_meta_cap: None,
        alerts_csv_url: Some("https://feeds.example.com/alerts.csv".to_string()),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub async fn test_state(
    feed: Arc<dyn FeedSource>,
    sender: Arc<dyn MessageSender>,
) -> AppState {
    let store = Store::new("sqlite::memory:").await.expect("in-memory store");
    AppState {
        store: Arc::new(store),
        sender,
        feed,
        meta: None,
        mailer: None,
        config: Arc::new(ServerConfig::default()),
        start_time: Utc::now(),
    }
}
