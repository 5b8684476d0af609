//! HTTP fetch layer for the listing pages.
//!
//! One [`PageFetcher`] is built per run from the [`CrawlConfig`]; there is
//! no shared client singleton. Each request picks a User-Agent and
//! Accept-Language from the configured pools and carries the fixed Referer
//! and `Cache-Control: no-cache` headers. Non-2xx responses are errors;
//! bodies are decoded honoring the page charset with an EUC-KR default,
//! which is what the listing serves.

use rand::{Rng, rng};
use reqwest::header::{ACCEPT_LANGUAGE, CACHE_CONTROL, REFERER, USER_AGENT};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::CrawlConfig;
use crate::error::{CollectError, CollectResult};

const FALLBACK_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36";
const FALLBACK_ACCEPT_LANGUAGE: &str = "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7";

/// HTTP client wrapper with per-request header rotation.
pub struct PageFetcher {
    client: reqwest::Client,
    config: CrawlConfig,
}

impl PageFetcher {
    pub fn new(config: &CrawlConfig) -> CollectResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// The listing URL for a date and 1-based page index.
    pub fn listing_url(&self, date: &str, page: u32) -> String {
        format!(
            "{}?date={}&page={}",
            self.config.listing_url,
            urlencoding::encode(date),
            page
        )
    }

    /// Base URL relative listing links are resolved against.
    pub fn base_url(&self) -> &str {
        &self.config.listing_url
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.config.page_delay_ms)
    }

    fn pick<'a>(pool: &'a [String], fallback: &'a str) -> &'a str {
        if pool.is_empty() {
            fallback
        } else {
            &pool[rng().random_range(0..pool.len())]
        }
    }

    /// Fetch a URL and return the decoded body.
    ///
    /// Any non-2xx status is an error; callers decide whether that is fatal
    /// (it never is inside the page loop).
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, url: &str) -> CollectResult<String> {
        let user_agent = Self::pick(&self.config.user_agents, FALLBACK_USER_AGENT);
        let accept_language = Self::pick(&self.config.accept_languages, FALLBACK_ACCEPT_LANGUAGE);

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .header(ACCEPT_LANGUAGE, accept_language)
            .header(REFERER, &self.config.referer)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text_with_charset("euc-kr").await?;
        debug!(bytes = body.len(), "Fetched page body");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_url_carries_date_and_page() {
        let fetcher = PageFetcher::new(&CrawlConfig::default()).unwrap();
        let url = fetcher.listing_url("2025-05-06", 3);
        assert!(url.contains("date=2025-05-06"));
        assert!(url.ends_with("page=3"));
    }

    #[test]
    fn test_pick_falls_back_on_empty_pool() {
        assert_eq!(PageFetcher::pick(&[], "fallback"), "fallback");
        let pool = vec!["only".to_string()];
        assert_eq!(PageFetcher::pick(&pool, "fallback"), "only");
    }
}
