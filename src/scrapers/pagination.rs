//! Pagination depth inference.
//!
//! The listing does not publish its page count anywhere structured, so it is
//! inferred from the `.Nnavi` navigation block of page 1. Three kinds of
//! candidates are collected:
//!
//! 1. Anchor texts that are pure integers (the numbered page links)
//! 2. Jump links ("다음", "마지막", "Last", "»", ...) whose target URL encodes
//!    a page number in a query parameter or path segment
//! 3. Integer tokens in the block's plain text, for markup that renders page
//!    numbers outside anchors
//!
//! The answer is the maximum candidate when one exists. When the block yields
//! numbers but no usable maximum, the count of distinct candidates is
//! returned with `exact` cleared, a permissive heuristic that can overcount
//! unrelated numeric text, so callers must not trust it beyond logging.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use tracing::{debug, warn};
use url::Url;

use crate::fetch::PageFetcher;

static NAV_BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse(".Nnavi").unwrap());
static NAV_ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static INT_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+)\b").unwrap());

/// Query parameter names that carry a page number.
const PAGE_PARAMS: [&str; 5] = ["page", "p", "pageno", "pagenum", "pageNum"];

/// Anchor texts that jump forward or to the end of the listing.
const JUMP_KEYWORDS: [&str; 7] = ["다음", "마지막", "끝", "next", "last", ">", "»"];

/// Page numbers outside this range are years, article ids, or other noise.
const PAGE_RANGE: std::ops::RangeInclusive<u32> = 1..=1000;

/// An inferred page count.
///
/// `exact` is set when the count came from an observed maximum page number;
/// it is cleared for the distinct-candidate fallback and for the zero result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCount {
    pub pages: u32,
    pub exact: bool,
}

impl PageCount {
    pub const NONE: PageCount = PageCount {
        pages: 0,
        exact: false,
    };
}

fn is_jump_text(text: &str) -> bool {
    let lowered = text.to_lowercase();
    JUMP_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

/// Page-number candidates encoded in a URL: known query parameters plus
/// all-digit path segments within [`PAGE_RANGE`].
fn page_numbers_in_url(url: &Url) -> Vec<u32> {
    let mut numbers = Vec::new();

    for (key, value) in url.query_pairs() {
        if PAGE_PARAMS.contains(&key.as_ref()) {
            if let Ok(n) = value.parse::<u32>() {
                numbers.push(n);
            }
        }
    }

    if let Some(segments) = url.path_segments() {
        for segment in segments {
            if !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(n) = segment.parse::<u32>() {
                    if PAGE_RANGE.contains(&n) {
                        numbers.push(n);
                    }
                }
            }
        }
    }

    numbers
}

/// Infer the page count from a listing document.
///
/// Returns [`PageCount::NONE`] when no navigation block is present or it
/// yields no candidates at all.
pub fn count_pages(document: &Html, base: &Url) -> PageCount {
    let mut candidates: BTreeSet<u32> = BTreeSet::new();

    for nav in document.select(&NAV_BLOCK) {
        for anchor in nav.select(&NAV_ANCHOR) {
            let text = anchor.text().collect::<String>().trim().to_string();

            if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
                if let Ok(n) = text.parse::<u32>() {
                    candidates.insert(n);
                }
                continue;
            }

            if is_jump_text(&text) {
                if let Some(href) = anchor.value().attr("href") {
                    if let Ok(target) = base.join(href) {
                        candidates.extend(page_numbers_in_url(&target));
                    }
                }
            }
        }

        let text = nav.text().collect::<String>();
        for capture in INT_TOKEN.captures_iter(&text) {
            if let Ok(n) = capture[1].parse::<u32>() {
                if PAGE_RANGE.contains(&n) {
                    candidates.insert(n);
                }
            }
        }
    }

    let max = candidates.iter().max().copied().unwrap_or(0);
    let count = if max >= 1 {
        PageCount {
            pages: max,
            exact: true,
        }
    } else if !candidates.is_empty() {
        PageCount {
            pages: candidates.len() as u32,
            exact: false,
        }
    } else {
        PageCount::NONE
    };

    debug!(pages = count.pages, exact = count.exact, "Inferred page count");
    count
}

/// Fetch page 1 for a date and infer the listing's page count.
///
/// Fetch or parse failure yields [`PageCount::NONE`] rather than an error;
/// the accumulator treats that as a single page to crawl.
pub async fn count_pages_for_date(fetcher: &PageFetcher, date: &str) -> PageCount {
    let base = match Url::parse(fetcher.base_url()) {
        Ok(base) => base,
        Err(e) => {
            warn!(error = %e, "Listing URL is not parseable; assuming one page");
            return PageCount::NONE;
        }
    };

    let url = fetcher.listing_url(date, 1);
    match fetcher.fetch(&url).await {
        Ok(body) => {
            let document = Html::parse_document(&body);
            count_pages(&document, &base)
        }
        Err(e) => {
            warn!(%url, error = %e, "Page count probe failed; assuming one page");
            PageCount::NONE
        }
    }
}
