use std::collections::HashMap;
use url::Url;

/// Host every accepted webhook must resolve to.
pub const SLACK_WEBHOOK_HOST: &str = "hooks.slack.com";

/// Strict validity predicate for a Slack incoming-webhook URL.
///
/// The URL must parse, the host must be [`SLACK_WEBHOOK_HOST`], and the path
/// must be exactly `/services/<team>/<bot>/<token>`. Anything else is
/// treated as "not configured": a mistyped endpoint degrades to a skip, it
/// never raises.
///
/// # Examples
///
/// ```
/// use adshield_notify::routing::is_valid_slack_webhook;
///
/// assert!(is_valid_slack_webhook(Some(
///     "https://hooks.slack.com/services/T000/B000/XXXX"
/// )));
/// assert!(!is_valid_slack_webhook(Some("https://example.com/services/T/B/X")));
/// assert!(!is_valid_slack_webhook(None));
/// ```
pub fn is_valid_slack_webhook(url: Option<&str>) -> bool {
    let Some(url) = url else { return false };
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if parsed.host_str() != Some(SLACK_WEBHOOK_HOST) {
        return false;
    }
    let Some(segments) = parsed.path_segments() else {
        return false;
    };
    let parts: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
    parts.len() == 4 && parts[0] == "services"
}

/// What a message is for; drives endpoint precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookPurpose {
    /// Digest-style summaries: summary endpoint wins over global.
    Summary,
    /// Alerts: the brand-specific endpoint (if the item carries a brand tag)
    /// wins over global.
    Alert,
}

/// A company's configured webhook endpoints.
#[derive(Debug, Clone, Default)]
pub struct CompanyWebhooks {
    pub global: Option<String>,
    pub summary: Option<String>,
    /// Exact brand name -> endpoint URL.
    pub by_brand: HashMap<String, String>,
}

impl CompanyWebhooks {
    /// Parse the stored JSON form of the brand map (`{"Brand": "url", ...}`).
    /// Non-object input or non-string values yield an empty map.
    pub fn brand_map_from_json(json: Option<&str>) -> HashMap<String, String> {
        let Some(json) = json else {
            return HashMap::new();
        };
        match serde_json::from_str::<serde_json::Value>(json) {
            Ok(serde_json::Value::Object(map)) => map
                .into_iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
                .collect(),
            _ => HashMap::new(),
        }
    }

    /// Select the single destination endpoint for a purpose, or none.
    ///
    /// Precedence, first valid match wins:
    /// - Summary: summary endpoint, then global.
    /// - Alert: the brand endpoint for `brand` (exact key), then global.
    ///
    /// Pure: no side effects, callers count the `None` as a skip.
    pub fn pick(&self, purpose: WebhookPurpose, brand: Option<&str>) -> Option<&str> {
        match purpose {
            WebhookPurpose::Summary => {
                if is_valid_slack_webhook(self.summary.as_deref()) {
                    return self.summary.as_deref();
                }
                self.global
                    .as_deref()
                    .filter(|u| is_valid_slack_webhook(Some(u)))
            }
            WebhookPurpose::Alert => {
                if let Some(url) = brand.and_then(|b| self.by_brand.get(b)) {
                    if is_valid_slack_webhook(Some(url)) {
                        return Some(url.as_str());
                    }
                }
                self.global
                    .as_deref()
                    .filter(|u| is_valid_slack_webhook(Some(u)))
            }
        }
    }
}
