//! Global market index collection.
//!
//! Quotes for ten major indices (US, Asia, Europe) are pulled from the
//! public chart endpoint, either live (`interval=1d&range=1d`) or for a
//! historical day window (`period1`/`period2`). Weekend and holiday dates
//! simply have no trading data; those come back as absent rather than
//! errors, and a per-symbol failure never sinks the whole summary.

use chrono::{Days, Local, NaiveDate};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

use crate::error::{CollectError, CollectResult};
use crate::models::{MarketIndex, MarketSummary};

const DEFAULT_CHART_BASE: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const CONCURRENT_FETCHES: usize = 3;

struct IndexSpec {
    key: &'static str,
    symbol: &'static str,
    name: &'static str,
    region: &'static str,
}

static INDEXES: [IndexSpec; 10] = [
    IndexSpec { key: "dow", symbol: "^DJI", name: "다우존스", region: "us" },
    IndexSpec { key: "sp500", symbol: "^GSPC", name: "S&P 500", region: "us" },
    IndexSpec { key: "nasdaq", symbol: "^IXIC", name: "나스닥", region: "us" },
    IndexSpec { key: "nikkei", symbol: "^N225", name: "닛케이225", region: "asia" },
    IndexSpec { key: "hangseng", symbol: "^HSI", name: "항셍", region: "asia" },
    IndexSpec { key: "shanghai", symbol: "000001.SS", name: "상해종합", region: "asia" },
    IndexSpec { key: "shenzhen", symbol: "399001.SZ", name: "심천성분", region: "asia" },
    IndexSpec { key: "stoxx50", symbol: "^STOXX50E", name: "STOXX 50", region: "europe" },
    IndexSpec { key: "ftse", symbol: "^FTSE", name: "FTSE 100", region: "europe" },
    IndexSpec { key: "dax", symbol: "^GDAXI", name: "DAX", region: "europe" },
];

pub const REGIONS: [&str; 3] = ["us", "asia", "europe"];

fn spec_for(key: &str) -> Option<&'static IndexSpec> {
    INDEXES.iter().find(|spec| spec.key == key)
}

fn specs_for_region(region: Option<&str>) -> Vec<&'static IndexSpec> {
    INDEXES
        .iter()
        .filter(|spec| region.is_none_or(|r| spec.region == r))
        .collect()
}

// Chart endpoint response, reduced to the fields we read.

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice", default)]
    regular_market_price: Option<f64>,
    #[serde(rename = "previousClose", default)]
    previous_close: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(rename = "marketState", default)]
    market_state: Option<String>,
    #[serde(rename = "regularMarketTime", default)]
    regular_market_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    open: Vec<Option<f64>>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn change_fields(current: f64, previous: f64) -> (f64, f64) {
    let change = current - previous;
    let percent = if previous != 0.0 {
        change / previous * 100.0
    } else {
        0.0
    };
    (round2(change), round2(percent))
}

/// Build a live quote from a chart result.
fn live_quote(spec: &IndexSpec, result: &ChartResult) -> MarketIndex {
    let meta = &result.meta;
    let current = meta.regular_market_price.unwrap_or(0.0);
    let previous = meta.previous_close.unwrap_or(0.0);
    let (change, change_percent) = change_fields(current, previous);

    let timestamp = meta
        .regular_market_time
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default();

    MarketIndex {
        symbol: spec.key.to_string(),
        name: spec.name.to_string(),
        current_price: round2(current),
        previous_close: round2(previous),
        change,
        change_percent,
        currency: meta.currency.clone().unwrap_or_else(|| "USD".to_string()),
        market_state: meta
            .market_state
            .clone()
            .unwrap_or_else(|| "UNKNOWN".to_string()),
        timestamp,
        date: None,
    }
}

/// Build a historical quote, or `None` when the day had no trading data.
fn historical_quote(spec: &IndexSpec, date: NaiveDate, result: &ChartResult) -> Option<MarketIndex> {
    let has_timestamps = result
        .timestamp
        .as_ref()
        .is_some_and(|ts| !ts.is_empty());
    let series = result
        .indicators
        .as_ref()
        .and_then(|ind| ind.quote.first())?;

    let close = match series.close.first().copied().flatten() {
        Some(close) if has_timestamps => close,
        _ => return None,
    };
    let open = series.open.first().copied().flatten().unwrap_or(close);
    let previous = result.meta.previous_close.unwrap_or(open);
    let (change, change_percent) = change_fields(close, previous);

    Some(MarketIndex {
        symbol: spec.key.to_string(),
        name: spec.name.to_string(),
        current_price: round2(close),
        previous_close: round2(previous),
        change,
        change_percent,
        currency: result
            .meta
            .currency
            .clone()
            .unwrap_or_else(|| "USD".to_string()),
        market_state: "CLOSED".to_string(),
        timestamp: date.to_string(),
        date: Some(date.to_string()),
    })
}

/// Client for the chart endpoint.
pub struct MarketIndexClient {
    client: reqwest::Client,
    base_url: String,
}

impl MarketIndexClient {
    pub fn new() -> CollectResult<Self> {
        Self::with_base_url(DEFAULT_CHART_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> CollectResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_chart(&self, symbol: &str, query: &[(&str, String)]) -> CollectResult<ChartResult> {
        let url = format!("{}/{}", self.base_url, symbol);
        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let parsed: ChartResponse = response.json().await?;
        parsed
            .chart
            .result
            .and_then(|mut results| if results.is_empty() { None } else { Some(results.remove(0)) })
            .ok_or_else(|| CollectError::Parse(format!("chart response for {symbol} had no result")))
    }

    /// Live quote for one index key.
    pub async fn index_data(&self, key: &str) -> CollectResult<MarketIndex> {
        let spec = spec_for(key)
            .ok_or_else(|| CollectError::Parse(format!("unknown index key: {key}")))?;

        let query = [
            ("interval", "1d".to_string()),
            ("range", "1d".to_string()),
        ];
        let result = self.fetch_chart(spec.symbol, &query).await?;
        Ok(live_quote(spec, &result))
    }

    /// Quote for one index key on a past date; `None` on non-trading days.
    pub async fn historical_data(
        &self,
        key: &str,
        date: NaiveDate,
    ) -> CollectResult<Option<MarketIndex>> {
        let spec = spec_for(key)
            .ok_or_else(|| CollectError::Parse(format!("unknown index key: {key}")))?;

        let day_start = date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let next_day = date
            .checked_add_days(Days::new(1))
            .unwrap_or(date)
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp();

        let query = [
            ("period1", day_start.to_string()),
            ("period2", next_day.to_string()),
            ("interval", "1d".to_string()),
        ];
        let result = self.fetch_chart(spec.symbol, &query).await?;
        Ok(historical_quote(spec, date, &result))
    }

    /// All indices for a region (`us` / `asia` / `europe`), or all of them.
    ///
    /// Symbols are fetched with bounded concurrency; failures are logged and
    /// dropped from the result.
    pub async fn all_indices(&self, region: Option<&str>) -> Vec<MarketIndex> {
        stream::iter(specs_for_region(region))
            .map(|spec| async move {
                match self.index_data(spec.key).await {
                    Ok(quote) => Some(quote),
                    Err(e) => {
                        warn!(key = spec.key, error = %e, "Index fetch failed; skipping");
                        None
                    }
                }
            })
            .buffered(CONCURRENT_FETCHES)
            .filter_map(std::future::ready)
            .collect()
            .await
    }

    /// Live regional summary across all ten indices.
    #[instrument(level = "info", skip(self))]
    pub async fn market_summary(&self) -> MarketSummary {
        let us_market = self.all_indices(Some("us")).await;
        let asia_market = self.all_indices(Some("asia")).await;
        let europe_market = self.all_indices(Some("europe")).await;

        let total_count = us_market.len() + asia_market.len() + europe_market.len();
        info!(total_count, "Collected live market summary");

        MarketSummary {
            update_time: Local::now().to_rfc3339(),
            target_date: None,
            us_market,
            asia_market,
            europe_market,
            total_count,
        }
    }

    /// Regional summary for a past date. Empty on non-trading days.
    #[instrument(level = "info", skip(self))]
    pub async fn historical_summary(&self, date: NaiveDate) -> MarketSummary {
        let mut regions: Vec<Vec<MarketIndex>> = Vec::with_capacity(REGIONS.len());

        for region in REGIONS {
            let quotes = stream::iter(specs_for_region(Some(region)))
                .map(|spec| async move {
                    match self.historical_data(spec.key, date).await {
                        Ok(quote) => quote,
                        Err(e) => {
                            warn!(key = spec.key, %date, error = %e, "Historical fetch failed; skipping");
                            None
                        }
                    }
                })
                .buffered(CONCURRENT_FETCHES)
                .filter_map(std::future::ready)
                .collect()
                .await;
            regions.push(quotes);
        }

        let europe_market = regions.pop().unwrap_or_default();
        let asia_market = regions.pop().unwrap_or_default();
        let us_market = regions.pop().unwrap_or_default();

        let total_count = us_market.len() + asia_market.len() + europe_market.len();
        info!(total_count, %date, "Collected historical market summary");

        MarketSummary {
            update_time: Local::now().to_rfc3339(),
            target_date: Some(date.to_string()),
            us_market,
            asia_market,
            europe_market,
            total_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_result(json: &str) -> ChartResult {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_live_quote_from_chart_meta() {
        let result = chart_result(
            r#"{
                "meta": {
                    "regularMarketPrice": 5321.41,
                    "previousClose": 5300.00,
                    "currency": "USD",
                    "marketState": "REGULAR",
                    "regularMarketTime": 1715000000
                }
            }"#,
        );

        let quote = live_quote(spec_for("sp500").unwrap(), &result);
        assert_eq!(quote.symbol, "sp500");
        assert_eq!(quote.current_price, 5321.41);
        assert_eq!(quote.change, 21.41);
        assert_eq!(quote.change_percent, 0.4);
        assert_eq!(quote.market_state, "REGULAR");
        assert!(quote.date.is_none());
    }

    #[test]
    fn test_live_quote_defaults_for_sparse_meta() {
        let result = chart_result(r#"{"meta": {}}"#);
        let quote = live_quote(spec_for("dax").unwrap(), &result);
        assert_eq!(quote.current_price, 0.0);
        assert_eq!(quote.currency, "USD");
        assert_eq!(quote.market_state, "UNKNOWN");
    }

    #[test]
    fn test_historical_quote_present_trading_day() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        let result = chart_result(
            r#"{
                "meta": {"previousClose": 100.0, "currency": "USD"},
                "timestamp": [1714600000],
                "indicators": {"quote": [{"close": [102.5], "open": [101.0]}]}
            }"#,
        );

        let quote = historical_quote(spec_for("dow").unwrap(), date, &result).unwrap();
        assert_eq!(quote.current_price, 102.5);
        assert_eq!(quote.previous_close, 100.0);
        assert_eq!(quote.change, 2.5);
        assert_eq!(quote.market_state, "CLOSED");
        assert_eq!(quote.date.as_deref(), Some("2025-05-02"));
    }

    #[test]
    fn test_historical_quote_absent_on_non_trading_day() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 4).unwrap();
        let result = chart_result(r#"{"meta": {}, "indicators": {"quote": []}}"#);
        assert!(historical_quote(spec_for("dow").unwrap(), date, &result).is_none());

        let no_close = chart_result(
            r#"{"meta": {}, "timestamp": [1714600000], "indicators": {"quote": [{"close": [], "open": []}]}}"#,
        );
        assert!(historical_quote(spec_for("dow").unwrap(), date, &no_close).is_none());
    }

    #[test]
    fn test_region_filtering() {
        assert_eq!(specs_for_region(Some("us")).len(), 3);
        assert_eq!(specs_for_region(Some("asia")).len(), 4);
        assert_eq!(specs_for_region(Some("europe")).len(), 3);
        assert_eq!(specs_for_region(None).len(), 10);
        assert!(specs_for_region(Some("antarctica")).is_empty());
    }
}
