//! Data models for news records, persisted snapshots, and market indices.
//!
//! This module defines the core data structures used throughout the application:
//! - [`NewsItem`]: A single headline extracted from the listing
//! - [`SnapshotPayload`]: The on-disk JSON document for one collection run
//! - [`MarketIndex`] / [`MarketSummary`]: Global market index quotes
//!
//! Snapshot files are named `<YYYY-MM-DD>_<NN>.json`; market summaries are
//! named `global_point_<YYYY-MM-DD>.json`. The two naming schemes never mix,
//! which is what lets the retention sweeper prune one without touching the
//! other.

use serde::{Deserialize, Serialize};

/// A single news record extracted from the listing.
///
/// The `title` string is the record's identity: deduplication inside a run
/// and across runs compares titles exactly, never fuzzily.
///
/// # Fields
///
/// * `title` - The headline text (non-empty by construction)
/// * `link` - Absolute article URL, when one was found
/// * `source` - `Some("nav")` for records recovered from the navigation
///   region, `None` for records from the main listing
/// * `page` - The 1-based listing page the record was first seen on
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub page: u32,
}

impl NewsItem {
    /// Build a record from the main listing (no source tag).
    pub fn new(title: impl Into<String>, link: Option<String>, page: u32) -> Self {
        Self {
            title: title.into(),
            link,
            source: None,
            page,
        }
    }

    /// Build a record recovered from the navigation region.
    pub fn from_nav(title: impl Into<String>, link: Option<String>, page: u32) -> Self {
        Self {
            title: title.into(),
            link,
            source: Some("nav".to_string()),
            page,
        }
    }
}

/// The persisted JSON document for one successful collection run.
///
/// One payload is written per run that is judged non-duplicate, under the
/// next free `<date>_<NN>.json` identity for its date. The `data_hash` field
/// carries the content fingerprint used for duplicate suppression on later
/// runs; files written by hand or by older versions may leave it empty, in
/// which case comparison falls back to count and title-set checks.
#[derive(Debug, Deserialize, Serialize)]
pub struct SnapshotPayload {
    /// Collection date in `YYYY-MM-DD` format.
    pub date: String,
    /// RFC 3339 timestamp of the moment the snapshot was written.
    pub timestamp: String,
    /// Number of records in `news`.
    pub total_count: usize,
    /// Lowercase hex SHA-256 over the canonicalized record set.
    #[serde(default)]
    pub data_hash: String,
    /// The deduplicated records in discovery order.
    pub news: Vec<NewsItem>,
}

/// A quote for one global market index.
///
/// `date` is filled for historical quotes only.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketIndex {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: f64,
    pub currency: String,
    pub market_state: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub date: Option<String>,
}

/// Regional grouping of index quotes for one point in time.
///
/// `target_date` is set for historical collection and absent for live
/// collection, mirroring the two shapes the chart API is queried in.
#[derive(Debug, Deserialize, Serialize)]
pub struct MarketSummary {
    pub update_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<String>,
    pub us_market: Vec<MarketIndex>,
    pub asia_market: Vec<MarketIndex>,
    pub europe_market: Vec<MarketIndex>,
    pub total_count: usize,
}

impl MarketSummary {
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }
}
