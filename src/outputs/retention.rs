//! Retention sweep over aged snapshots.
//!
//! Only names matching the snapshot identity scheme are candidates; market
//! summaries (`global_point_*.json`) and anything else in the directory are
//! never touched. A snapshot dated the invocation date is never deleted,
//! whatever the horizon says. Per-file failures are logged and the sweep
//! continues.

use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument, warn};

static SNAPSHOT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4}-\d{2}-\d{2})_\d+\.json$").unwrap());

/// The embedded date of a snapshot file name, if the name matches the
/// identity scheme and the date parses.
fn snapshot_date(name: &str) -> Option<NaiveDate> {
    let captures = SNAPSHOT_NAME.captures(name)?;
    NaiveDate::parse_from_str(&captures[1], "%Y-%m-%d").ok()
}

/// Delete snapshots older than `horizon_days` and return how many went.
#[instrument(level = "info", skip(data_dir), fields(data_dir = %data_dir.as_ref().display()))]
pub async fn sweep(data_dir: impl AsRef<Path>, horizon_days: u32, today: NaiveDate) -> usize {
    let data_dir = data_dir.as_ref();
    let cutoff = today
        .checked_sub_days(Days::new(horizon_days as u64))
        .unwrap_or(NaiveDate::MIN);

    let mut entries = match fs::read_dir(data_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "Data directory not readable; nothing to sweep");
            return 0;
        }
    };

    let mut removed = 0usize;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Directory walk failed mid-sweep");
                break;
            }
        };

        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(date) = snapshot_date(&name) else {
            continue;
        };
        // Same-day snapshots are always protected.
        if date == today || date >= cutoff {
            continue;
        }

        match fs::remove_file(entry.path()).await {
            Ok(()) => {
                info!(file = %name, "Removed aged snapshot");
                removed += 1;
            }
            Err(e) => {
                warn!(file = %name, error = %e, "Failed to remove snapshot; continuing");
            }
        }
    }

    if removed > 0 {
        info!(removed, "Retention sweep finished");
    } else {
        info!("Retention sweep found nothing to remove");
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "{}").unwrap();
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_sweep_removes_only_beyond_horizon() {
        let dir = tempfile::tempdir().unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();

        for age in [10u64, 6, 4, 0] {
            let date = today.checked_sub_days(Days::new(age)).unwrap();
            touch(dir.path(), &format!("{}_01.json", date));
        }

        let removed = sweep(dir.path(), 5, today).await;
        assert_eq!(removed, 2);
        assert_eq!(
            names(dir.path()),
            ["2025-05-16_01.json", "2025-05-20_01.json"]
        );
    }

    #[tokio::test]
    async fn test_sweep_ignores_foreign_names() {
        let dir = tempfile::tempdir().unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();

        touch(dir.path(), "global_point_2024-01-01.json");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "2024-01-01_01.json");

        let removed = sweep(dir.path(), 5, today).await;
        assert_eq!(removed, 1);
        assert_eq!(
            names(dir.path()),
            ["global_point_2024-01-01.json", "notes.txt"]
        );
    }

    #[tokio::test]
    async fn test_sweep_never_touches_today_even_with_zero_horizon() {
        let dir = tempfile::tempdir().unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();

        touch(dir.path(), "2025-05-20_01.json");
        touch(dir.path(), "2025-05-19_01.json");

        let removed = sweep(dir.path(), 0, today).await;
        assert_eq!(removed, 1);
        assert_eq!(names(dir.path()), ["2025-05-20_01.json"]);
    }

    #[tokio::test]
    async fn test_sweep_skips_unparseable_dates() {
        let dir = tempfile::tempdir().unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();

        // matches the shape but is not a real calendar date
        touch(dir.path(), "2024-13-99_01.json");

        let removed = sweep(dir.path(), 5, today).await;
        assert_eq!(removed, 0);
        assert_eq!(names(dir.path()), ["2024-13-99_01.json"]);
    }

    #[tokio::test]
    async fn test_sweep_on_missing_directory_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        let today = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        assert_eq!(sweep(&missing, 5, today).await, 0);
    }
}
