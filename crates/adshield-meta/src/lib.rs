//! Meta Graph API read client.
//!
//! adshield only reads: one day of account-level insights (spend,
//! impressions, clicks) and the list of ad accounts attached to the token.
//! The base URL is injectable so tests run against a local mock.

pub mod error;
pub mod retry;

use serde::Deserialize;
use serde_json::Value;

use error::{MetaError, Result};
use retry::{with_retries, RetryPolicy};

pub const DEFAULT_GRAPH_BASE: &str = "https://graph.facebook.com/v19.0";

/// One day of account-level delivery numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DailySpend {
    pub spend: f64,
    pub impressions: u64,
    pub clicks: u64,
}

/// An ad account visible to the access token.
#[derive(Debug, Clone, Deserialize)]
pub struct AdAccountInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub currency: String,
}

/// Prefix a bare numeric account id with `act_`, the form insights expects.
pub fn normalize_account_id(id: &str) -> String {
    if id.starts_with("act_") {
        id.to_string()
    } else {
        format!("act_{id}")
    }
}

pub struct MetaClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl MetaClient {
    pub fn new(token: &str) -> Self {
        Self::with_base_url(token, DEFAULT_GRAPH_BASE)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(MetaError::Http {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| MetaError::UnexpectedResponse(e.to_string()))
    }

    /// Fetch spend/impressions/clicks for one account and one local day
    /// (`ymd` = "YYYY-MM-DD"). An account with no delivery that day returns
    /// all zeroes, matching the API's empty `data` array.
    pub async fn fetch_day_spend(&self, account_id: &str, ymd: &str) -> Result<DailySpend> {
        let account = normalize_account_id(account_id);
        let time_range = format!(r#"{{"since":"{ymd}","until":"{ymd}"}}"#);
        let url = format!("{}/{account}/insights", self.base_url);
        let json = self
            .get_json(
                &url,
                &[
                    ("level", "account"),
                    ("fields", "spend,impressions,clicks"),
                    ("time_range", time_range.as_str()),
                    ("time_increment", "1"),
                ],
            )
            .await?;

        let row = json
            .get("data")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first());
        Ok(match row {
            Some(row) => DailySpend {
                spend: lenient_f64(row.get("spend")),
                impressions: lenient_u64(row.get("impressions")),
                clicks: lenient_u64(row.get("clicks")),
            },
            None => DailySpend::default(),
        })
    }

    /// Same as [`fetch_day_spend`] with the bounded retry policy applied.
    ///
    /// [`fetch_day_spend`]: MetaClient::fetch_day_spend
    pub async fn fetch_day_spend_with_retries(
        &self,
        account_id: &str,
        ymd: &str,
        policy: RetryPolicy,
    ) -> Result<DailySpend> {
        with_retries(policy, || self.fetch_day_spend(account_id, ymd)).await
    }

    /// List ad accounts attached to the token (first page is enough for the
    /// fallback account pick).
    pub async fn list_ad_accounts(&self) -> Result<Vec<AdAccountInfo>> {
        let url = format!("{}/me/adaccounts", self.base_url);
        let json = self
            .get_json(
                &url,
                &[
                    ("fields", "id,account_id,name,currency"),
                    ("limit", "50"),
                ],
            )
            .await?;
        let rows = json
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(rows
            .into_iter()
            .filter_map(|row| serde_json::from_value(row).ok())
            .collect())
    }
}

// Graph API returns numeric fields as strings ("123.45"); accept both.
fn lenient_f64(v: Option<&Value>) -> f64 {
    match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn lenient_u64(v: Option<&Value>) -> u64 {
    lenient_f64(v).max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn account_id_gets_act_prefix_once() {
        assert_eq!(normalize_account_id("12345"), "act_12345");
        assert_eq!(normalize_account_id("act_12345"), "act_12345");
    }

    #[tokio::test]
    async fn parses_stringly_typed_insights() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/act_42/insights"))
            .and(query_param("level", "account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "spend": "123.45", "impressions": "1000", "clicks": "57" }]
            })))
            .mount(&server)
            .await;

        let client = MetaClient::with_base_url("token", &server.uri());
        let day = client.fetch_day_spend("42", "2025-06-01").await.unwrap();
        assert_eq!(day.spend, 123.45);
        assert_eq!(day.impressions, 1000);
        assert_eq!(day.clicks, 57);
    }

    #[tokio::test]
    async fn empty_data_means_zero_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/act_42/insights"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": [] })),
            )
            .mount(&server)
            .await;

        let client = MetaClient::with_base_url("token", &server.uri());
        let day = client.fetch_day_spend("42", "2025-06-01").await.unwrap();
        assert_eq!(day, DailySpend::default());
    }

    #[tokio::test]
    async fn non_success_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/act_42/insights"))
            .respond_with(ResponseTemplate::new(400).set_body_string("(#100) bad field"))
            .mount(&server)
            .await;

        let client = MetaClient::with_base_url("token", &server.uri());
        let err = client
            .fetch_day_spend("42", "2025-06-01")
            .await
            .expect_err("4xx must error");
        match err {
            MetaError::Http { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("#100"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn lists_ad_accounts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/adaccounts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": "act_1", "account_id": "1", "name": "Acme", "currency": "USD" },
                    { "id": "act_2", "account_id": "2", "name": "Beta", "currency": "EUR" }
                ]
            })))
            .mount(&server)
            .await;

        let client = MetaClient::with_base_url("token", &server.uri());
        let accounts = client.list_ad_accounts().await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].id, "act_1");
    }
}
