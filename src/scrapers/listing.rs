//! Listing page extraction.
//!
//! One listing page is turned into records by an ordered chain of extraction
//! strategies, tried until one yields anything. The primary strategy walks
//! `.newsList` containers, classifying children into title and link nodes;
//! the secondary strategy covers markup variants where the list nests
//! differently. The `.Nnavi` navigation block is then scanned as an auxiliary
//! source (it occasionally carries headline links the main list dropped)
//! with stricter filters and exact-title deduplication against what the main
//! list already produced.
//!
//! Per-item anomalies (no text, unresolvable href) skip the item; the
//! function itself never fails.

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::models::NewsItem;

/// Ordered extraction strategies: name and container selector.
static STRATEGIES: [(&str, &Lazy<Selector>); 2] = [
    ("primary", &PRIMARY_CONTAINER),
    ("secondary", &SECONDARY_CONTAINER),
];

static PRIMARY_CONTAINER: Lazy<Selector> = Lazy::new(|| Selector::parse(".newsList").unwrap());
static SECONDARY_CONTAINER: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("ul.newsList, div.newsList, .newsList ul, .newsList li").unwrap()
});
static NAV_BLOCK: Lazy<Selector> = Lazy::new(|| Selector::parse(".Nnavi").unwrap());

static ITEM_NODES: Lazy<Selector> = Lazy::new(|| Selector::parse("li, article, div").unwrap());
static NAV_ITEM_NODES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("li, article, div, a").unwrap());
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static TITLE_NODES: Lazy<Selector> = Lazy::new(|| Selector::parse("a, strong, span, h3, h4").unwrap());
static NAV_TITLE_NODES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a, strong, span, h3, h4, dt, dd").unwrap());

/// Placeholder the upstream markup uses for articles without a headline.
const PLACEHOLDER_TITLE: &str = "제목 없음";

/// Navigation-sourced titles shorter than this are link labels, not headlines.
const MIN_NAV_TITLE_CHARS: usize = 6;

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// The element's own href, or the first descendant anchor's, resolved
/// against `base`.
fn resolve_link(element: ElementRef, base: &Url) -> Option<String> {
    let href = if element.value().name() == "a" {
        element.value().attr("href")
    } else {
        element
            .select(&ANCHOR)
            .next()
            .and_then(|a| a.value().attr("href"))
    }?;
    base.join(href).ok().map(|u| u.to_string())
}

fn title_of(element: ElementRef, title_selector: &Selector) -> String {
    element
        .select(title_selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| element_text(element))
}

fn usable_title(title: &str) -> bool {
    !title.is_empty() && title != PLACEHOLDER_TITLE
}

/// Walk the containers matched by one strategy selector.
fn extract_with(container_selector: &Selector, document: &Html, base: &Url, page: u32) -> Vec<NewsItem> {
    let mut items = Vec::new();

    for container in document.select(container_selector) {
        // Prefer children that look like news rows; fall back to raw anchors.
        let classified: Vec<ElementRef> = container
            .select(&ITEM_NODES)
            .filter(|el| {
                el.value()
                    .attr("class")
                    .map(|c| {
                        let c = c.to_lowercase();
                        c.contains("news") || c.contains("item")
                    })
                    .unwrap_or(false)
            })
            .collect();

        let rows: Vec<ElementRef> = if classified.is_empty() {
            container.select(&ANCHOR).collect()
        } else {
            classified
        };

        for row in rows {
            let title = title_of(row, &TITLE_NODES);
            if !usable_title(&title) {
                continue;
            }
            let link = resolve_link(row, base);
            items.push(NewsItem::new(title, link, page));
        }
    }

    items
}

/// Scan the `.Nnavi` block for headline links the main list missed.
fn extract_from_nav(document: &Html, base: &Url, page: u32, seen: &mut HashSet<String>) -> Vec<NewsItem> {
    let mut items = Vec::new();

    for nav in document.select(&NAV_BLOCK) {
        for row in nav.select(&NAV_ITEM_NODES) {
            let title = title_of(row, &NAV_TITLE_NODES);
            if !usable_title(&title) || title.chars().count() < MIN_NAV_TITLE_CHARS {
                continue;
            }
            if seen.contains(&title) {
                continue;
            }
            let link = resolve_link(row, base);
            seen.insert(title.clone());
            items.push(NewsItem::from_nav(title, link, page));
        }
    }

    items
}

/// Extract all records from one listing page.
///
/// Records keep discovery order. Titles are unique within the result: the
/// first occurrence wins, across the strategy output and the navigation
/// supplement alike.
pub fn extract(document: &Html, base: &Url, page: u32) -> Vec<NewsItem> {
    let mut items = Vec::new();

    for (name, selector) in STRATEGIES {
        items = extract_with(selector, document, base, page);
        if !items.is_empty() {
            debug!(strategy = name, count = items.len(), "Listing strategy matched");
            break;
        }
    }

    let mut items: Vec<NewsItem> = items
        .into_iter()
        .unique_by(|item| item.title.clone())
        .collect();

    let mut seen: HashSet<String> = items.iter().map(|item| item.title.clone()).collect();
    let nav_items = extract_from_nav(document, base, page, &mut seen);
    if !nav_items.is_empty() {
        debug!(count = nav_items.len(), "Recovered records from navigation block");
        items.extend(nav_items);
    }

    items
}
