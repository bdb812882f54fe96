//! CSV alert-feed client.
//!
//! Companies point adshield at an HTTP-hosted CSV with the header
//! `id,text,severity,updatedAt[,brand]`. Severity strings are normalized to
//! the canonical scale at this boundary; nothing downstream ever sees the
//! feed's raw vocabulary.

pub mod error;

use adshield_common::types::{AlertItem, Severity};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use error::{FeedError, Result};

/// A source of alert items for one company.
///
/// Production uses [`CsvFeed`]; orchestration depends on this trait so
/// batches can run against a static fake in tests.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_alerts(&self, url: &str) -> Result<Vec<AlertItem>>;
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    severity: String,
    #[serde(rename = "updatedAt", default)]
    updated_at: String,
    #[serde(default)]
    brand: String,
}

/// HTTP + CSV implementation of [`FeedSource`].
pub struct CsvFeed {
    client: reqwest::Client,
}

impl CsvFeed {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    /// Parse CSV text into alert items. Rows missing an id or text, and rows
    /// that fail to deserialize, are skipped with a warning.
    pub fn parse(text: &str) -> Result<Vec<AlertItem>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        if reader.headers().map_err(|e| FeedError::Malformed(e.to_string()))?.is_empty() {
            return Err(FeedError::Malformed("missing header row".to_string()));
        }

        let mut items = Vec::new();
        for (line, record) in reader.deserialize::<RawRow>().enumerate() {
            let row = match record {
                Ok(row) => row,
                Err(e) => {
                    tracing::warn!(line = line + 2, error = %e, "Skipping unreadable feed row");
                    continue;
                }
            };
            if row.id.is_empty() || row.text.is_empty() {
                tracing::warn!(line = line + 2, "Skipping feed row without id/text");
                continue;
            }
            let updated_at = DateTime::parse_from_rfc3339(&row.updated_at)
                .ok()
                .map(|t| t.with_timezone(&Utc));
            items.push(AlertItem {
                id: row.id,
                text: row.text,
                severity: Severity::normalize(&row.severity),
                brand: if row.brand.is_empty() {
                    None
                } else {
                    Some(row.brand)
                },
                updated_at,
            });
        }
        Ok(items)
    }
}

impl Default for CsvFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedSource for CsvFeed {
    async fn fetch_alerts(&self, url: &str) -> Result<Vec<AlertItem>> {
        let resp = self
            .client
            .get(url)
            .header("cache-control", "no-cache")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FeedError::Http {
                status: status.as_u16(),
            });
        }
        let text = resp.text().await?;
        Self::parse(&text)
    }
}
