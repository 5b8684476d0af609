//! Headline summarization with exponential backoff retry logic.
//!
//! When an OpenAI-compatible endpoint is configured, the day's headlines are
//! sent there for a short market brief plus recommended ticker names. The
//! feature degrades: without configuration the brief is a naive
//! concatenation of the first headlines, and a failed call falls back the
//! same way. Results are memoized in an explicit [`SummaryCache`] owned by
//! the caller, keyed by a hash of the title set, so identical inputs within
//! one run never pay for a second call.
//!
//! # Retry Strategy
//!
//! - Maximum 3 retry attempts
//! - Exponential backoff starting at 1 second, capped at 10 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use rand::{Rng, rng};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{instrument, warn};

use crate::error::{CollectError, CollectResult};
use crate::utils::truncate_chars;

/// At most this many headlines are sent to the endpoint.
pub const MAX_TITLES: usize = 50;
/// The naive fallback uses at most this many headlines.
const FALLBACK_TITLES: usize = 10;
pub const MAX_SUMMARY_CHARS: usize = 500;
pub const MAX_TICKER_CHARS: usize = 255;

const SYSTEM_PROMPT: &str = "You are given one Korean financial news headline per line. \
Reply with a JSON object only: {\"summary\": \"...\", \"tickers\": \"...\"}. \
summary: the day's market picture in Korean, at most 500 characters. \
tickers: comma-separated names of stocks the headlines make worth watching, \
at most 255 characters, empty string if none stand out.";

/// A produced market brief.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketBrief {
    pub summary: String,
    pub tickers: String,
}

/// Memoized briefs, keyed by the hash of the input title set.
///
/// Owned by the caller; dropping it at end of run bounds its lifetime.
pub type SummaryCache = HashMap<String, MarketBrief>;

/// Endpoint configuration. Absent configuration disables the feature.
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
}

impl SummaryConfig {
    /// Assemble from optional CLI/env parts; both the URL and key are
    /// required for the feature to switch on.
    pub fn from_parts(
        api_url: Option<String>,
        api_key: Option<String>,
        model: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            api_url: api_url?,
            api_key: api_key?,
            model: model.unwrap_or_else(|| "gpt-4o-mini".to_string()),
        })
    }
}

/// Trait for async LLM interaction.
pub trait AskAsync {
    type Response;

    async fn ask(&self, text: &str) -> CollectResult<Self::Response>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`]
/// implementation.
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(10),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    type Response = T::Response;

    async fn ask(&self, text: &str) -> CollectResult<Self::Response> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.ask(text).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u128,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// One-shot chat-completion call against the configured endpoint.
struct ChatClient<'a> {
    client: &'a reqwest::Client,
    config: &'a SummaryConfig,
}

impl AskAsync for ChatClient<'_> {
    type Response = String;

    async fn ask(&self, text: &str) -> CollectResult<String> {
        let body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": text},
            ],
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::Summarize(format!(
                "endpoint returned status {status}"
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| CollectError::Summarize("response carried no choices".to_string()))
    }
}

/// Cache key: hex SHA-256 over the sorted title set.
fn cache_key(titles: &[&String]) -> String {
    let mut sorted: Vec<&str> = titles.iter().map(|t| t.as_str()).collect();
    sorted.sort_unstable();

    let mut hasher = Sha256::new();
    for title in sorted {
        hasher.update(title.as_bytes());
        hasher.update([0x1f]);
    }

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(digest.len() * 2);
    use std::fmt::Write;
    for byte in digest {
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}

/// The no-endpoint brief: first headlines joined and truncated, no tickers.
fn fallback_brief(titles: &[&String]) -> MarketBrief {
    let summary = titles
        .iter()
        .take(FALLBACK_TITLES)
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join("; ");

    MarketBrief {
        summary: truncate_chars(&summary, MAX_SUMMARY_CHARS),
        tickers: String::new(),
    }
}

/// Pull a [`MarketBrief`] out of the model's reply, tolerating fenced or
/// prefixed output around the JSON object.
fn parse_brief(content: &str) -> Option<MarketBrief> {
    #[derive(Deserialize)]
    struct RawBrief {
        #[serde(default)]
        summary: String,
        #[serde(default)]
        tickers: String,
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    let raw: RawBrief = serde_json::from_str(&content[start..=end]).ok()?;

    Some(MarketBrief {
        summary: raw.summary,
        tickers: raw.tickers,
    })
}

/// The summarization collaborator.
pub struct Summarizer {
    client: reqwest::Client,
    config: Option<SummaryConfig>,
}

impl Summarizer {
    pub fn new(config: Option<SummaryConfig>) -> CollectResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(60))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// Produce a brief for the given headlines, memoizing through `cache`.
    ///
    /// Never fails: endpoint errors and malformed replies degrade to the
    /// naive fallback, which is cached like any other result.
    #[instrument(level = "info", skip_all, fields(titles = titles.len()))]
    pub async fn summarize(&self, titles: &[String], cache: &mut SummaryCache) -> MarketBrief {
        let capped: Vec<&String> = titles.iter().take(MAX_TITLES).collect();
        let key = cache_key(&capped);

        if let Some(hit) = cache.get(&key) {
            tracing::debug!("Serving memoized brief");
            return hit.clone();
        }

        let brief = match &self.config {
            None => fallback_brief(&capped),
            Some(config) => match self.ask_chat(config, &capped).await {
                Ok(brief) => brief,
                Err(e) => {
                    warn!(error = %e, "Summarizer unavailable; using naive fallback");
                    fallback_brief(&capped)
                }
            },
        };

        let brief = MarketBrief {
            summary: truncate_chars(&brief.summary, MAX_SUMMARY_CHARS),
            tickers: truncate_chars(&brief.tickers, MAX_TICKER_CHARS),
        };
        cache.insert(key, brief.clone());
        brief
    }

    async fn ask_chat(&self, config: &SummaryConfig, titles: &[&String]) -> CollectResult<MarketBrief> {
        let prompt = titles
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let client = ChatClient {
            client: &self.client,
            config,
        };
        let api = RetryAsk::new(client, 3, StdDuration::from_secs(1));
        let content = api.ask(&prompt).await?;

        parse_brief(&content)
            .ok_or_else(|| CollectError::Summarize("reply was not the expected JSON".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_cache_key_is_order_insensitive() {
        let a = titles(&["alpha", "beta"]);
        let b = titles(&["beta", "alpha"]);
        let a_refs: Vec<&String> = a.iter().collect();
        let b_refs: Vec<&String> = b.iter().collect();
        assert_eq!(cache_key(&a_refs), cache_key(&b_refs));
    }

    #[test]
    fn test_fallback_brief_caps_titles_and_length() {
        let many = titles(&["headline"; 20]);
        let refs: Vec<&String> = many.iter().collect();
        let brief = fallback_brief(&refs);
        // 10 titles at most, joined
        assert_eq!(brief.summary.matches("headline").count(), 10);
        assert!(brief.tickers.is_empty());

        let long = vec!["가".repeat(600)];
        let refs: Vec<&String> = long.iter().collect();
        let brief = fallback_brief(&refs);
        assert_eq!(brief.summary.chars().count(), MAX_SUMMARY_CHARS);
    }

    #[test]
    fn test_parse_brief_tolerates_fencing() {
        let content = "```json\n{\"summary\": \"calm day\", \"tickers\": \"ACME\"}\n```";
        let brief = parse_brief(content).unwrap();
        assert_eq!(brief.summary, "calm day");
        assert_eq!(brief.tickers, "ACME");

        assert!(parse_brief("no json here").is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_summarizer_memoizes_fallback() {
        let summarizer = Summarizer::new(None).unwrap();
        let mut cache = SummaryCache::new();
        let headlines = titles(&["Exports up", "Rates steady"]);

        let first = summarizer.summarize(&headlines, &mut cache).await;
        assert_eq!(cache.len(), 1);
        assert!(first.summary.contains("Exports up"));

        // same set, different order: memoized, no second entry
        let reordered = titles(&["Rates steady", "Exports up"]);
        let second = summarizer.summarize(&reordered, &mut cache).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_summary_config_requires_url_and_key() {
        assert!(SummaryConfig::from_parts(None, Some("k".into()), None).is_none());
        assert!(SummaryConfig::from_parts(Some("u".into()), None, None).is_none());
        let config = SummaryConfig::from_parts(Some("u".into()), Some("k".into()), None).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
    }
}
