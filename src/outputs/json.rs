//! JSON artifact persistence.
//!
//! Two artifact families share the data directory:
//!
//! ```text
//! data/
//! ├── 2025-05-06_01.json          # news snapshot, sequence 1
//! ├── 2025-05-06_02.json          # second non-duplicate run that day
//! └── global_point_2025-05-06.json # market summary
//! ```
//!
//! Snapshots carry the payload schema `{date, timestamp, total_count,
//! data_hash, news}`. Reads are forgiving: a snapshot that fails to load is
//! reported as absent to the caller (and logged), because an unreadable
//! history must never block collecting today's data.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::error::CollectResult;
use crate::models::{MarketSummary, SnapshotPayload};
use crate::outputs::identity;

/// Write a snapshot under `<date>_<NN>.json`, creating the directory.
#[instrument(level = "info", skip_all, fields(data_dir = %data_dir.display(), sequence))]
pub async fn write_snapshot(
    data_dir: &Path,
    date: NaiveDate,
    sequence: u32,
    payload: &SnapshotPayload,
) -> CollectResult<PathBuf> {
    fs::create_dir_all(data_dir).await?;

    let path = data_dir.join(identity::artifact_name(date, sequence));
    let json = serde_json::to_string_pretty(payload)?;
    fs::write(&path, json).await?;

    info!(path = %path.display(), count = payload.total_count, "Wrote news snapshot");
    Ok(path)
}

/// Read one snapshot file.
pub async fn read_snapshot(path: &Path) -> CollectResult<SnapshotPayload> {
    let raw = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&raw)?)
}

/// The highest-sequence snapshot for `date`, or `None` when the date has no
/// readable snapshot.
pub async fn latest_snapshot(data_dir: &Path, date: NaiveDate) -> Option<SnapshotPayload> {
    let path = match identity::latest_artifact(data_dir, date).await {
        Ok(Some(path)) => path,
        Ok(None) => return None,
        Err(e) => {
            warn!(error = %e, "Snapshot scan failed; treating history as absent");
            return None;
        }
    };

    match read_snapshot(&path).await {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Snapshot unreadable; treating history as absent");
            None
        }
    }
}

/// Path of the market summary artifact for a date.
pub fn market_summary_path(data_dir: &Path, date: NaiveDate) -> PathBuf {
    data_dir.join(format!("global_point_{}.json", date))
}

/// Write a market summary under `global_point_<date>.json`.
#[instrument(level = "info", skip_all, fields(data_dir = %data_dir.display(), %date))]
pub async fn write_market_summary(
    data_dir: &Path,
    date: NaiveDate,
    summary: &MarketSummary,
) -> CollectResult<PathBuf> {
    fs::create_dir_all(data_dir).await?;

    let path = market_summary_path(data_dir, date);
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(&path, json).await?;

    info!(path = %path.display(), count = summary.total_count, "Wrote market summary");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsItem;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 6).unwrap()
    }

    fn payload(titles: &[&str], hash: &str) -> SnapshotPayload {
        SnapshotPayload {
            date: date().to_string(),
            timestamp: "2025-05-06T09:30:00+09:00".to_string(),
            total_count: titles.len(),
            data_hash: hash.to_string(),
            news: titles
                .iter()
                .map(|t| NewsItem::new(*t, None, 1))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let written = payload(&["A", "B"], "feed");

        let path = write_snapshot(dir.path(), date(), 1, &written).await.unwrap();
        assert!(path.ends_with("2025-05-06_01.json"));

        let back = read_snapshot(&path).await.unwrap();
        assert_eq!(back.total_count, 2);
        assert_eq!(back.data_hash, "feed");
        assert_eq!(back.news[1].title, "B");
    }

    #[tokio::test]
    async fn test_latest_snapshot_prefers_highest_sequence() {
        let dir = tempfile::tempdir().unwrap();
        write_snapshot(dir.path(), date(), 1, &payload(&["old"], "h1"))
            .await
            .unwrap();
        write_snapshot(dir.path(), date(), 2, &payload(&["new"], "h2"))
            .await
            .unwrap();

        let latest = latest_snapshot(dir.path(), date()).await.unwrap();
        assert_eq!(latest.data_hash, "h2");
    }

    #[tokio::test]
    async fn test_unreadable_snapshot_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2025-05-06_01.json"), "not json").unwrap();
        assert!(latest_snapshot(dir.path(), date()).await.is_none());
    }

    #[tokio::test]
    async fn test_market_summary_write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data");
        let summary = MarketSummary {
            update_time: "2025-05-06T09:30:00+09:00".to_string(),
            target_date: Some(date().to_string()),
            us_market: vec![],
            asia_market: vec![],
            europe_market: vec![],
            total_count: 0,
        };

        let path = write_market_summary(&nested, date(), &summary).await.unwrap();
        assert!(path.ends_with("global_point_2025-05-06.json"));
        assert!(path.exists());
    }
}
