//! Whole-run accumulation across listing pages.
//!
//! The accumulator probes the page count, clamps it to at least one page,
//! then walks the pages sequentially with a pacing delay between fetches.
//! The first occurrence of a title wins; later pages repeating a headline
//! (the listing shuffles items between pages while we crawl) are suppressed.
//! A failed page is logged and skipped; partial results are still returned,
//! and a run that never reaches the listing yields an empty set.

use chrono::NaiveDate;
use scraper::Html;
use std::collections::HashSet;
use tokio::time::sleep;
use tracing::{info, instrument, warn};
use url::Url;

use crate::fetch::PageFetcher;
use crate::models::NewsItem;
use crate::scrapers::{listing, pagination};

/// Fold one page's records into the run, first-seen title wins.
pub fn merge_page(
    accumulated: &mut Vec<NewsItem>,
    seen: &mut HashSet<String>,
    page_items: Vec<NewsItem>,
) {
    for item in page_items {
        if seen.insert(item.title.clone()) {
            accumulated.push(item);
        }
    }
}

/// Crawl every listing page for `date` and return the deduplicated records
/// in first-seen order.
#[instrument(level = "info", skip(fetcher))]
pub async fn crawl_date(fetcher: &PageFetcher, date: NaiveDate) -> Vec<NewsItem> {
    let date_str = date.to_string();

    let base = match Url::parse(fetcher.base_url()) {
        Ok(base) => base,
        Err(e) => {
            warn!(error = %e, "Listing URL is not parseable; nothing to crawl");
            return Vec::new();
        }
    };

    let count = pagination::count_pages_for_date(fetcher, &date_str).await;
    if !count.exact && count.pages > 0 {
        warn!(
            pages = count.pages,
            "Page count is a heuristic fallback; crawling it anyway"
        );
    }
    let pages = count.pages.max(1);
    info!(pages, date = %date_str, "Starting listing crawl");

    let mut accumulated: Vec<NewsItem> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for page in 1..=pages {
        let url = fetcher.listing_url(&date_str, page);
        match fetcher.fetch(&url).await {
            Ok(body) => {
                let page_items = {
                    let document = Html::parse_document(&body);
                    listing::extract(&document, &base, page)
                };
                info!(page, pages, count = page_items.len(), "Collected listing page");
                merge_page(&mut accumulated, &mut seen, page_items);
            }
            Err(e) => {
                warn!(page, pages, error = %e, "Listing page failed; continuing");
            }
        }

        if page < pages {
            sleep(fetcher.page_delay()).await;
        }
    }

    info!(total = accumulated.len(), date = %date_str, "Listing crawl finished");
    accumulated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, page: u32) -> NewsItem {
        NewsItem::new(title, None, page)
    }

    #[test]
    fn test_merge_page_keeps_first_seen_order() {
        let mut accumulated = Vec::new();
        let mut seen = HashSet::new();

        merge_page(
            &mut accumulated,
            &mut seen,
            vec![item("A", 1), item("B", 1), item("C", 1)],
        );
        merge_page(&mut accumulated, &mut seen, vec![item("C", 2), item("D", 2)]);

        let titles: Vec<&str> = accumulated.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["A", "B", "C", "D"]);
        // C kept the page it was first seen on
        assert_eq!(accumulated[2].page, 1);
        assert_eq!(accumulated[3].page, 2);
    }

    #[test]
    fn test_merge_page_never_emits_duplicate_titles() {
        let mut accumulated = Vec::new();
        let mut seen = HashSet::new();

        for page in 1..=3 {
            merge_page(
                &mut accumulated,
                &mut seen,
                vec![item("Repeated headline", page)],
            );
        }

        assert_eq!(accumulated.len(), 1);
        assert_eq!(accumulated[0].page, 1);
    }
}
