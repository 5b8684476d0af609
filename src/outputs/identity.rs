//! Snapshot identity allocation.
//!
//! Snapshots are addressed as `<YYYY-MM-DD>_<NN>.json`, NN zero-padded to
//! two digits and unique per date. Allocation scans the data directory for
//! the date's existing names and returns `max + 1`. Gaps left by external
//! deletion are never re-filled, so an identity is never reused.
//!
//! The scan-then-allocate window is not atomic: two concurrent runs for the
//! same date can allocate the same sequence. The collector runs once per
//! scheduled date, which is the operating assumption here.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::CollectResult;

/// File name for a snapshot identity.
pub fn artifact_name(date: NaiveDate, sequence: u32) -> String {
    format!("{}_{:02}.json", date, sequence)
}

/// Parse the sequence number out of `<date>_<NN>.json` for the given date.
///
/// Returns `None` for any other name, including malformed ones.
pub(crate) fn sequence_of(name: &str, date: NaiveDate) -> Option<u32> {
    let rest = name.strip_prefix(&format!("{date}_"))?;
    let digits = rest.strip_suffix(".json")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// The next free sequence number for `date`.
///
/// An empty or missing data directory yields 1. Malformed names are skipped,
/// never fatal.
pub async fn next_sequence(data_dir: &Path, date: NaiveDate) -> CollectResult<u32> {
    Ok(max_sequence(data_dir, date).await?.map_or(1, |max| max + 1))
}

/// Highest allocated sequence for `date`, if any snapshot exists.
pub async fn max_sequence(data_dir: &Path, date: NaiveDate) -> CollectResult<Option<u32>> {
    let mut entries = match fs::read_dir(data_dir).await {
        Ok(entries) => entries,
        Err(_) => return Ok(None),
    };

    let mut max_seen: Option<u32> = None;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if let Some(sequence) = sequence_of(&name.to_string_lossy(), date) {
            max_seen = Some(max_seen.map_or(sequence, |m| m.max(sequence)));
        }
    }

    Ok(max_seen)
}

/// Path of the highest-sequence snapshot for `date`, if any.
pub async fn latest_artifact(data_dir: &Path, date: NaiveDate) -> CollectResult<Option<PathBuf>> {
    Ok(max_sequence(data_dir, date)
        .await?
        .map(|sequence| data_dir.join(artifact_name(date, sequence))))
}
