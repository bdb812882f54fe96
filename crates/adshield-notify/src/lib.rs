//! Notification delivery for adshield.
//!
//! Webhook destinations are resolved per company by [`routing`], gated by
//! [`quiet`] hours, rendered with [`blocks`], and delivered through a
//! [`MessageSender`] implementation ([`slack::WebhookSender`] in
//! production). Digest email goes out through [`email::DigestMailer`].

pub mod blocks;
pub mod email;
pub mod error;
pub mod quiet;
pub mod routing;
pub mod slack;


use async_trait::async_trait;
use serde::Serialize;

use error::Result;

/// JSON body accepted by Slack-compatible incoming webhooks:
/// `{ "text": ..., "blocks": [...] }`.
#[derive(Debug, Clone, Serialize)]
pub struct SlackMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<serde_json::Value>,
}

impl SlackMessage {
    pub fn new(text: impl Into<String>, blocks: Vec<serde_json::Value>) -> Self {
        Self {
            text: text.into(),
            blocks,
        }
    }

    /// Plain-text message with no block payload.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            blocks: Vec::new(),
        }
    }
}

/// Outbound message transport.
///
/// The production implementation posts to a webhook URL; orchestration and
/// tests depend on this trait so batches can run against a recording fake.
///
/// Implementations make exactly one delivery attempt per call. Retry and
/// deduplication are the caller's concern (the run ledger, not the
/// transport, prevents duplicate sends).
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Delivers the message to the destination webhook.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the HTTP status and truncated response body
    /// when the endpoint does not accept the message.
    async fn send(&self, webhook_url: &str, message: &SlackMessage) -> Result<()>;
}
