//! Crawl configuration.
//!
//! Everything the fetch layer used to keep in process-wide globals (listing
//! URL, header pools, timeouts, pacing) lives in an explicit [`CrawlConfig`]
//! constructed per run. Defaults match the production listing endpoint; a
//! YAML file passed via `--config` overrides any subset of fields.

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::error::CollectResult;

/// Configuration for one crawl run.
///
/// All fields have serde defaults so a partial YAML file only needs to name
/// the fields it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// The paginated listing endpoint. `date` and `page` query parameters
    /// are appended per request.
    pub listing_url: String,
    /// Referer header sent with every listing request.
    pub referer: String,
    /// User-Agent pool; one entry is chosen per request.
    pub user_agents: Vec<String>,
    /// Accept-Language pool; one entry is chosen per request.
    pub accept_languages: Vec<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Pause between listing page fetches, in milliseconds. Bounds request
    /// rate; not a correctness requirement.
    pub page_delay_ms: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://finance.naver.com/news/mainnews.naver".to_string(),
            referer: "https://finance.naver.com/".to_string(),
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0 Safari/605.1.15".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/117.0".to_string(),
            ],
            accept_languages: vec![
                "ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7".to_string(),
                "ko,en-US;q=0.9,en;q=0.8".to_string(),
                "en-US,en;q=0.9,ko-KR;q=0.8,ko;q=0.7".to_string(),
            ],
            request_timeout_secs: 10,
            page_delay_ms: 500,
        }
    }
}

impl CrawlConfig {
    /// Load configuration, overriding defaults from a YAML file when given.
    pub async fn load(path: Option<&str>) -> CollectResult<Self> {
        match path {
            Some(path) if Path::new(path).exists() => {
                let raw = tokio::fs::read_to_string(path).await?;
                let config: CrawlConfig = serde_yaml::from_str(&raw)
                    .map_err(|e| crate::error::CollectError::Parse(e.to_string()))?;
                info!(%path, "Loaded crawl configuration");
                Ok(config)
            }
            Some(path) => {
                info!(%path, "Config file not found; using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_header_pools() {
        let config = CrawlConfig::default();
        assert!(!config.user_agents.is_empty());
        assert!(!config.accept_languages.is_empty());
        assert!(config.listing_url.starts_with("https://"));
    }

    #[test]
    fn test_partial_yaml_overrides_only_named_fields() {
        let yaml = "listing_url: https://example.com/news\npage_delay_ms: 100\n";
        let config: CrawlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.listing_url, "https://example.com/news");
        assert_eq!(config.page_delay_ms, 100);
        // untouched fields keep their defaults
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.user_agents.len(), 4);
    }
}
