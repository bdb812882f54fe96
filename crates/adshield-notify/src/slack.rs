use async_trait::async_trait;

use crate::error::{NotifyError, Result};
use crate::{MessageSender, SlackMessage};

/// Maximum length of an error/response body kept for logs and the ledger.
pub const MAX_BODY_LENGTH: usize = 4000;

/// Truncate a string to at most `max_len` bytes of content.
pub fn truncate_body(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &s[..end])
    }
}

/// Production [`MessageSender`]: one POST per call, no retry.
///
/// Duplicate suppression belongs to the run ledger and retry policy to the
/// data-source clients; this transport only reports what the endpoint said.
pub struct WebhookSender {
    client: reqwest::Client,
}

impl WebhookSender {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WebhookSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageSender for WebhookSender {
    async fn send(&self, webhook_url: &str, message: &SlackMessage) -> Result<()> {
        let resp = self.client.post(webhook_url).json(message).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = match resp.text().await {
            Ok(text) => truncate_body(&text, MAX_BODY_LENGTH),
            Err(e) => format!("[failed to read response body: {e}]"),
        };
        tracing::warn!(status = status.as_u16(), body = %body, "Webhook rejected message");
        Err(NotifyError::Api {
            status: status.as_u16(),
            body,
        })
    }
}
