//! Content fingerprinting for cross-run duplicate suppression.
//!
//! A run's record set is hashed over a canonical form (records sorted by
//! title, serialized with fixed field order) so the digest does not depend
//! on the order pages happened to be crawled in. The digest is stored in the
//! snapshot payload and compared against the latest snapshot for the date on
//! the next run. Snapshots that predate the digest field (or were edited by
//! hand) fall back to a count plus title-set comparison.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::models::NewsItem;
use crate::outputs::json;

/// Deterministic digest of a record set, as lowercase hex SHA-256.
pub fn content_hash(items: &[NewsItem]) -> String {
    let mut sorted: Vec<&NewsItem> = items.iter().collect();
    sorted.sort_by(|a, b| a.title.cmp(&b.title));

    let canonical = serde_json::to_string(&sorted).unwrap_or_default();
    let digest = Sha256::digest(canonical.as_bytes());

    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}

/// Whether `items` repeats the most recent snapshot persisted for `date`.
///
/// No snapshot for the date means not a duplicate. Hash equality decides
/// when both sides carry a digest; otherwise the fallback comparison is
/// record count plus exact title-set equality.
pub async fn is_duplicate_of_latest(data_dir: &Path, date: NaiveDate, items: &[NewsItem]) -> bool {
    let Some(existing) = json::latest_snapshot(data_dir, date).await else {
        return false;
    };

    let new_hash = content_hash(items);
    if !existing.data_hash.is_empty() && existing.data_hash == new_hash {
        info!(%date, "Record set matches latest snapshot by hash");
        return true;
    }

    if items.len() != existing.news.len() {
        return false;
    }

    let new_titles: HashSet<&str> = items.iter().map(|item| item.title.as_str()).collect();
    let old_titles: HashSet<&str> = existing.news.iter().map(|item| item.title.as_str()).collect();
    let duplicate = new_titles == old_titles;

    debug!(%date, duplicate, "Hash mismatch resolved by title-set comparison");
    duplicate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnapshotPayload;
    use crate::outputs::json::write_snapshot;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 6).unwrap()
    }

    fn items(titles: &[(&str, u32)]) -> Vec<NewsItem> {
        titles
            .iter()
            .map(|(t, page)| NewsItem::new(*t, None, *page))
            .collect()
    }

    fn payload(news: Vec<NewsItem>, hash: &str) -> SnapshotPayload {
        SnapshotPayload {
            date: date().to_string(),
            timestamp: "2025-05-06T09:30:00+09:00".to_string(),
            total_count: news.len(),
            data_hash: hash.to_string(),
            news,
        }
    }

    #[test]
    fn test_hash_is_insertion_order_independent() {
        let forward = items(&[("A", 1), ("B", 1), ("C", 2)]);
        let shuffled = items(&[("C", 2), ("A", 1), ("B", 1)]);
        assert_eq!(content_hash(&forward), content_hash(&shuffled));
    }

    #[test]
    fn test_hash_changes_with_content() {
        let set = items(&[("A", 1)]);
        let other = items(&[("A", 1), ("B", 1)]);
        assert_ne!(content_hash(&set), content_hash(&other));
        assert_eq!(content_hash(&set).len(), 64);
    }

    #[tokio::test]
    async fn test_no_history_is_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let set = items(&[("A", 1)]);
        assert!(!is_duplicate_of_latest(dir.path(), date(), &set).await);
    }

    #[tokio::test]
    async fn test_roundtrip_duplicate_detection() {
        let dir = tempfile::tempdir().unwrap();
        let set = items(&[("A", 1), ("B", 2)]);

        let stored = payload(set.clone(), &content_hash(&set));
        write_snapshot(dir.path(), date(), 1, &stored).await.unwrap();

        // same set, shuffled discovery order: still a duplicate
        let shuffled = items(&[("B", 2), ("A", 1)]);
        assert!(is_duplicate_of_latest(dir.path(), date(), &shuffled).await);

        // a new headline breaks the match
        let grown = items(&[("A", 1), ("B", 2), ("C", 2)]);
        assert!(!is_duplicate_of_latest(dir.path(), date(), &grown).await);
    }

    #[tokio::test]
    async fn test_missing_stored_digest_falls_back_to_title_set() {
        let dir = tempfile::tempdir().unwrap();
        let set = items(&[("A", 1), ("B", 1)]);

        let stored = payload(set.clone(), "");
        write_snapshot(dir.path(), date(), 1, &stored).await.unwrap();

        assert!(is_duplicate_of_latest(dir.path(), date(), &set).await);

        let different = items(&[("A", 1), ("D", 1)]);
        assert!(!is_duplicate_of_latest(dir.path(), date(), &different).await);
    }
}
