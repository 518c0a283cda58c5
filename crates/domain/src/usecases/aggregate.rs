//! Feed aggregation use case - fetch, normalize and window feed entries

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::{
    image::resolve_entry_image,
    model::{FeedEntry, FeedSource, NewsItem},
    ports::{Clock, DecodeError, DocumentExtractor, FeedDecoder, FetchError, Fetcher},
    text::{collapse_whitespace, strip_html},
};

/// Window used by the rumor digest
pub const RUMOR_WINDOW: Duration = Duration::days(7);

/// Title keywords that mark an item as transfer gossip
pub const DEFAULT_RUMOR_KEYWORDS: [&str; 9] = [
    "transfer", "rumour", "rumor", "bid", "signing", "linked", "deal", "talks", "target",
];

/// Configuration for one aggregation pass
#[derive(Debug, Clone)]
pub struct AggregateConfig {
    /// Entries older than `now - window` are dropped
    pub window: Duration,
    /// If non-empty, titles must contain at least one of these (case-insensitive)
    pub keywords: Vec<String>,
}

impl AggregateConfig {
    /// Plain recency window, no content filter
    pub fn recent(window: Duration) -> Self {
        Self {
            window,
            keywords: vec![],
        }
    }

    /// Seven-day window restricted to transfer-gossip titles
    pub fn rumors(keywords: Vec<String>) -> Self {
        Self {
            window: RUMOR_WINDOW,
            keywords: keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self::recent(Duration::hours(4))
    }
}

#[derive(Debug, Error)]
enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Fetches sources one after another and normalizes their entries
#[derive(Clone)]
pub struct Aggregator {
    fetcher: Arc<dyn Fetcher>,
    decoder: Arc<dyn FeedDecoder>,
    clock: Arc<dyn Clock>,
}

impl Aggregator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        decoder: Arc<dyn FeedDecoder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            decoder,
            clock,
        }
    }

    /// Current time as seen by this aggregator's clock
    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    /// Aggregate feed sources into recent items, newest first
    ///
    /// A failing source is logged and contributes nothing.
    pub async fn aggregate(&self, sources: &[FeedSource], config: &AggregateConfig) -> Vec<NewsItem> {
        let now = self.clock.now();
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for source in sources {
            let entries = match self.fetch_entries(source).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(source = %source.url, error = %e, "Skipping feed source");
                    continue;
                }
            };

            let total = entries.len();
            let before = items.len();
            for entry in entries {
                let Some(item) = normalize_entry(entry, source, now, config) else {
                    continue;
                };
                if seen.insert(item.link.clone()) {
                    items.push(item);
                }
            }

            tracing::info!(
                source = %source.url,
                entries = total,
                kept = items.len() - before,
                "Aggregated feed source"
            );
        }

        // Stable: equal timestamps keep source insertion order
        items.sort_by(|a, b| b.published.cmp(&a.published));
        items
    }

    /// Scrape HTML pages through a document extractor, newest first
    pub async fn aggregate_pages(
        &self,
        pages: &[FeedSource],
        extractor: &dyn DocumentExtractor,
    ) -> Vec<NewsItem> {
        let mut seen = HashSet::new();
        let mut items = Vec::new();

        for page in pages {
            let bytes = match self.fetcher.fetch(&page.url).await {
                Ok(bytes) if bytes.is_empty() => {
                    tracing::warn!(page = %page.url, "Page returned an empty body");
                    continue;
                }
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(page = %page.url, error = %e, "Skipping page");
                    continue;
                }
            };

            let document = String::from_utf8_lossy(&bytes);
            let extracted = extractor.extract(&document, &page.url);
            tracing::info!(page = %page.url, count = extracted.len(), "Extracted page items");

            for mut item in extracted {
                if item.link.trim().is_empty() || !seen.insert(item.link.clone()) {
                    continue;
                }
                item.source = page.clone();
                items.push(item);
            }
        }

        items.sort_by(|a, b| b.published.cmp(&a.published));
        items
    }

    async fn fetch_entries(&self, source: &FeedSource) -> Result<Vec<FeedEntry>, SourceError> {
        let bytes = self.fetcher.fetch(&source.url).await?;
        if bytes.is_empty() {
            tracing::warn!(source = %source.url, "Feed returned an empty body");
            return Ok(vec![]);
        }
        Ok(self.decoder.decode(&bytes)?)
    }
}

/// Whether `published` lies in `[now - window, now]`
pub fn within_window(published: OffsetDateTime, now: OffsetDateTime, window: Duration) -> bool {
    published >= now - window && published <= now
}

fn matches_keywords(title: &str, keywords: &[String]) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let title = title.to_lowercase();
    keywords.iter().any(|k| title.contains(&k.to_lowercase()))
}

fn normalize_entry(
    entry: FeedEntry,
    source: &FeedSource,
    now: OffsetDateTime,
    config: &AggregateConfig,
) -> Option<NewsItem> {
    let link = entry.link.trim().to_string();
    if link.is_empty() {
        return None;
    }

    let published = entry.published?;
    if !within_window(published, now, config.window) {
        return None;
    }

    let title = collapse_whitespace(&entry.title);
    if title.is_empty() || !matches_keywords(&title, &config.keywords) {
        return None;
    }

    let image_url = resolve_entry_image(&entry);
    let summary = entry
        .summary_html
        .as_deref()
        .or(entry.content_html.as_deref())
        .map(strip_html)
        .unwrap_or_default();

    Some(NewsItem {
        title,
        link,
        published,
        summary,
        image_url,
        source: source.clone(),
    })
}
