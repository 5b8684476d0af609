//! # Finance News Collector
//!
//! A collection pipeline that crawls the paginated finance-news listing for
//! a calendar date, deduplicates the records against the day's history, and
//! keeps a pruned archive of daily JSON snapshots. A second collector pulls
//! global market index quotes, live or backfilled.
//!
//! ## Usage
//!
//! ```sh
//! finance_news_collector collect
//! finance_news_collector indices
//! finance_news_collector backfill --days 30
//! ```
//!
//! ## Architecture
//!
//! The `collect` run is a fixed sequence of steps, each degrading rather
//! than aborting the ones after it:
//! 1. **Sweep**: remove snapshots older than the retention horizon
//! 2. **Crawl**: walk every listing page for the date, dedup within the run
//! 3. **Fingerprint**: compare against the latest persisted snapshot
//! 4. **Persist**: allocate the next `<date>_<NN>.json` identity and write
//! 5. **Summarize/store**: optional market brief and durable-store insert
//!
//! The process exits non-zero only when no data was obtained at all.

use chrono::{Days, NaiveDate};
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod db;
mod error;
mod fetch;
mod fingerprint;
mod models;
mod outputs;
mod scrapers;
mod utils;

use api::{MAX_TITLES, SummaryCache, SummaryConfig, Summarizer};
use cli::{Cli, Command};
use config::CrawlConfig;
use db::{DurableStore, NewsRecordRow, StoreConfig};
use error::CollectError;
use fetch::PageFetcher;
use models::SnapshotPayload;
use outputs::{identity, json, retention};
use scrapers::crawl;
use scrapers::market::{self, MarketIndexClient};
use utils::{ensure_writable_dir, today};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("finance_news_collector starting up");

    let args = Cli::parse();

    // Early check: everything below writes into the data directory
    if let Err(e) = ensure_writable_dir(&args.data_dir).await {
        error!(
            path = %args.data_dir,
            error = %e,
            "Data directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    match args.command {
        Command::Collect {
            date,
            retention_days,
            summary_api_url,
            summary_api_key,
            summary_model,
            db_api_url,
            db_api_key,
            db_table,
        } => {
            let crawl_config = CrawlConfig::load(args.config.as_deref()).await?;
            let summary_config =
                SummaryConfig::from_parts(summary_api_url, summary_api_key, summary_model);
            let store_config = StoreConfig::from_parts(db_api_url, db_api_key, db_table);
            run_collect(
                &args.data_dir,
                &crawl_config,
                date,
                retention_days,
                summary_config,
                store_config,
            )
            .await?;
        }
        Command::Indices { region } => run_indices(&args.data_dir, region.as_deref()).await?,
        Command::Backfill { days } => run_backfill(&args.data_dir, days).await?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// The scheduled daily run: sweep, crawl, dedup-check, persist, brief.
async fn run_collect(
    data_dir: &str,
    crawl_config: &CrawlConfig,
    date: Option<NaiveDate>,
    retention_days: u32,
    summary_config: Option<SummaryConfig>,
    store_config: Option<StoreConfig>,
) -> Result<(), Box<dyn Error>> {
    let data_dir = Path::new(data_dir);
    let today = today();
    let target_date = date.unwrap_or(today);
    info!(%target_date, retention_days, "Starting collection run");

    // Housekeeping first; a failed sweep never blocks collection.
    retention::sweep(data_dir, retention_days, today).await;

    let fetcher = PageFetcher::new(crawl_config)?;
    let news = crawl::crawl_date(&fetcher, target_date).await;

    if news.is_empty() {
        error!(%target_date, "No news data obtained");
        return Err(Box::new(CollectError::NoData(target_date.to_string())));
    }

    if fingerprint::is_duplicate_of_latest(data_dir, target_date, &news).await {
        info!(
            count = news.len(),
            "Latest snapshot already carries this record set; nothing to persist"
        );
        return Ok(());
    }

    let sequence = identity::next_sequence(data_dir, target_date).await?;
    let payload = SnapshotPayload {
        date: target_date.to_string(),
        timestamp: chrono::Local::now().to_rfc3339(),
        total_count: news.len(),
        data_hash: fingerprint::content_hash(&news),
        news,
    };
    json::write_snapshot(data_dir, target_date, sequence, &payload).await?;

    let summarizer = Summarizer::new(summary_config)?;
    if !summarizer.is_configured() && store_config.is_none() {
        info!("No summarizer or durable store configured; run complete");
        return Ok(());
    }

    let titles: Vec<String> = payload.news.iter().map(|item| item.title.clone()).collect();
    let mut cache = SummaryCache::new();
    let brief = summarizer.summarize(&titles, &mut cache).await;
    info!(
        summary_chars = brief.summary.chars().count(),
        tickers = %brief.tickers,
        "Market brief ready"
    );

    if let Some(store_config) = store_config {
        let store = DurableStore::new(store_config)?;
        let row = NewsRecordRow {
            content: titles
                .iter()
                .take(MAX_TITLES)
                .cloned()
                .collect::<Vec<_>>()
                .join("\n"),
            summary: brief.summary.clone(),
            cont_date: target_date.to_string(),
            topstock: brief.tickers.clone(),
        };
        if let Err(e) = store.insert_record(&row).await {
            // The snapshot is already on disk; the row can be replayed later.
            error!(error = %e, "Durable store insert failed");
        }
    }

    Ok(())
}

/// Live market summary: persist the full regional set, or print one region.
async fn run_indices(data_dir: &str, region: Option<&str>) -> Result<(), Box<dyn Error>> {
    let client = MarketIndexClient::new()?;

    if let Some(region) = region {
        if !market::REGIONS.contains(&region) {
            return Err(Box::new(CollectError::Parse(format!(
                "unknown region '{region}' (expected us, asia, or europe)"
            ))));
        }
        let quotes = client.all_indices(Some(region)).await;
        if quotes.is_empty() {
            return Err(Box::new(CollectError::NoData(format!("{region} indices"))));
        }
        println!("{}", serde_json::to_string_pretty(&quotes)?);
        return Ok(());
    }

    let summary = client.market_summary().await;
    if summary.is_empty() {
        error!("No market data obtained");
        return Err(Box::new(CollectError::NoData("market summary".to_string())));
    }

    json::write_market_summary(Path::new(data_dir), today(), &summary).await?;
    Ok(())
}

/// Collect historical market summaries for the last `days` days.
///
/// Already-present files are kept as-is; non-trading days are recorded as
/// absent, not errors.
async fn run_backfill(data_dir: &str, days: u32) -> Result<(), Box<dyn Error>> {
    let client = MarketIndexClient::new()?;
    let data_dir = Path::new(data_dir);
    let today = today();
    info!(days, "Starting market backfill");

    let mut collected = 0usize;
    let mut skipped = 0usize;
    let mut no_data = 0usize;

    for offset in (0..=u64::from(days)).rev() {
        let Some(date) = today.checked_sub_days(Days::new(offset)) else {
            continue;
        };

        let path = json::market_summary_path(data_dir, date);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            skipped += 1;
            continue;
        }

        let summary = client.historical_summary(date).await;
        if summary.is_empty() {
            info!(%date, "No trading data (weekend or holiday)");
            no_data += 1;
            continue;
        }

        json::write_market_summary(data_dir, date, &summary).await?;
        collected += 1;
    }

    info!(collected, skipped, no_data, "Backfill finished");
    if collected == 0 && skipped == 0 {
        warn!("Backfill produced nothing");
        return Err(Box::new(CollectError::NoData("market backfill".to_string())));
    }
    Ok(())
}
