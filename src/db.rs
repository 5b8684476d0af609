//! Durable-store collaborator.
//!
//! An optional PostgREST-style endpoint receives one row per persisted
//! snapshot: the headline block, the generated brief, the collection date,
//! and the recommended tickers. Insert failure is logged by the caller and
//! never fails the run; the on-disk snapshot is the source of truth.

use serde::Serialize;
use std::time::Duration;
use tracing::{info, instrument};

use crate::error::{CollectError, CollectResult};

/// Row shape for the news summary table.
#[derive(Debug, Clone, Serialize)]
pub struct NewsRecordRow {
    /// Newline-joined headline block the brief was generated from.
    pub content: String,
    /// Generated market brief.
    pub summary: String,
    /// Collection date, `YYYY-MM-DD`.
    pub cont_date: String,
    /// Recommended tickers, comma-separated.
    pub topstock: String,
}

/// Endpoint configuration. Absent configuration disables the feature.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub api_url: String,
    pub api_key: String,
    pub table: String,
}

impl StoreConfig {
    pub fn from_parts(
        api_url: Option<String>,
        api_key: Option<String>,
        table: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            api_url: api_url?,
            api_key: api_key?,
            table: table.unwrap_or_else(|| "news_summary".to_string()),
        })
    }
}

pub struct DurableStore {
    client: reqwest::Client,
    config: StoreConfig,
}

impl DurableStore {
    pub fn new(config: StoreConfig) -> CollectResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self { client, config })
    }

    fn insert_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.table
        )
    }

    /// Insert one row. Non-2xx responses become [`CollectError::Store`].
    #[instrument(level = "info", skip_all, fields(cont_date = %row.cont_date))]
    pub async fn insert_record(&self, row: &NewsRecordRow) -> CollectResult<()> {
        let url = self.insert_url();

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(%url, "Inserted news record");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(CollectError::Store(format!(
                "insert to {url} failed with status {status}: {body}"
            )))
        }
    }
}
