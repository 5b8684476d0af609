//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Collaborator credentials can be provided via command-line flags or
//! environment variables; leaving them unset disables the corresponding
//! feature rather than failing.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Command-line arguments for the collector.
///
/// # Examples
///
/// ```sh
/// # The scheduled daily run
/// finance_news_collector collect
///
/// # Re-collect a specific listing date into another directory
/// finance_news_collector -d ./archive collect --date 2025-05-06
///
/// # One-shot market summary / 30-day historical backfill
/// finance_news_collector indices
/// finance_news_collector backfill --days 30
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding snapshot and market-summary artifacts
    #[arg(short, long, default_value = "data")]
    pub data_dir: String,

    /// Optional path to a crawl-config YAML file
    #[arg(short, long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sweep aged snapshots, crawl the listing, persist if novel
    Collect {
        /// Listing date to collect (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Snapshots older than this many days are swept
        #[arg(long, default_value_t = 5)]
        retention_days: u32,

        /// OpenAI-compatible chat endpoint for the market brief
        #[arg(long, env = "SUMMARY_API_URL")]
        summary_api_url: Option<String>,

        #[arg(long, env = "SUMMARY_API_KEY", hide_env_values = true)]
        summary_api_key: Option<String>,

        #[arg(long, env = "SUMMARY_MODEL")]
        summary_model: Option<String>,

        /// Durable-store endpoint receiving one row per snapshot
        #[arg(long, env = "DB_API_URL")]
        db_api_url: Option<String>,

        #[arg(long, env = "DB_API_KEY", hide_env_values = true)]
        db_api_key: Option<String>,

        #[arg(long, env = "DB_TABLE")]
        db_table: Option<String>,
    },

    /// Collect the live global market summary
    Indices {
        /// Restrict to one region: us, asia, europe
        #[arg(long)]
        region: Option<String>,
    },

    /// Backfill historical market summaries for the last N days
    Backfill {
        /// How many days back from today
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_defaults() {
        let cli = Cli::parse_from(["finance_news_collector", "collect"]);
        assert_eq!(cli.data_dir, "data");
        match cli.command {
            Command::Collect {
                date,
                retention_days,
                ..
            } => {
                assert!(date.is_none());
                assert_eq!(retention_days, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_collect_with_explicit_date() {
        let cli = Cli::parse_from([
            "finance_news_collector",
            "-d",
            "/tmp/archive",
            "collect",
            "--date",
            "2025-05-06",
            "--retention-days",
            "7",
        ]);
        assert_eq!(cli.data_dir, "/tmp/archive");
        match cli.command {
            Command::Collect {
                date,
                retention_days,
                ..
            } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2025, 5, 6));
                assert_eq!(retention_days, 7);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_indices_region_filter() {
        let cli = Cli::parse_from(["finance_news_collector", "indices", "--region", "asia"]);
        match cli.command {
            Command::Indices { region } => assert_eq!(region.as_deref(), Some("asia")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_backfill_days() {
        let cli = Cli::parse_from(["finance_news_collector", "backfill", "--days", "7"]);
        match cli.command {
            Command::Backfill { days } => assert_eq!(days, 7),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
