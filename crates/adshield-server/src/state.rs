use crate::config::ServerConfig;
use adshield_feed::FeedSource;
use adshield_meta::MetaClient;
use adshield_notify::email::DigestMailer;
use adshield_notify::MessageSender;
use adshield_storage::Store;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared application state: the store plus explicitly constructed outbound
/// clients. Everything is injected here by the entry point (or by tests, as
/// fakes); no module-level singletons.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub sender: Arc<dyn MessageSender>,
    pub feed: Arc<dyn FeedSource>,
    /// Absent when no Graph API token is configured; spend features skip.
    pub meta: Option<Arc<MetaClient>>,
    /// Absent when SMTP is not configured; digest email is skipped.
    pub mailer: Option<Arc<DigestMailer>>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}
