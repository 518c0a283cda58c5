//! Fallback content - substitute posts when the primary selection is empty

use std::sync::Arc;

use async_trait::async_trait;
use time::Date;

use crate::{
    model::{ComposedPost, FeedSource, Layout, Style},
    ports::{DocumentExtractor, PostedLinkStore},
    text::truncate_words,
    usecases::{
        aggregate::{AggregateConfig, Aggregator},
        compose::Composer,
        select::ItemSelector,
    },
};

/// Header line for the rumor digest
pub const RUMOR_HEADER: &str = "🔥 Transfer Rumours";
/// Number of items in the rumor digest
pub const RUMOR_DIGEST_SIZE: usize = 3;
/// Message posted when every other source of content comes up empty
pub const DEFAULT_FALLBACK_MESSAGE: &str =
    "⚽ No fresh football headlines right now. Stay tuned for the latest news!";

/// A strategy that may produce a substitute post
#[async_trait]
pub trait FallbackProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Produce a post, or `None` to let the next provider try
    async fn provide(&self) -> Option<ComposedPost>;
}

/// Digest of recent transfer gossip
pub struct RumorDigestProvider {
    aggregator: Aggregator,
    sources: Vec<FeedSource>,
    config: AggregateConfig,
    selector: ItemSelector,
    store: Arc<dyn PostedLinkStore>,
    composer: Composer,
}

impl RumorDigestProvider {
    pub fn new(
        aggregator: Aggregator,
        sources: Vec<FeedSource>,
        config: AggregateConfig,
        selector: ItemSelector,
        store: Arc<dyn PostedLinkStore>,
        style: Style,
    ) -> Self {
        let style = Style {
            layout: Layout::Digest,
            header: style.header.or_else(|| Some(RUMOR_HEADER.to_string())),
            ..style
        };
        Self {
            aggregator,
            sources,
            config,
            selector,
            store,
            composer: Composer::new(style),
        }
    }
}

#[async_trait]
impl FallbackProvider for RumorDigestProvider {
    fn name(&self) -> &'static str {
        "rumor_digest"
    }

    async fn provide(&self) -> Option<ComposedPost> {
        let items = self.aggregator.aggregate(&self.sources, &self.config).await;
        let selected = self
            .selector
            .select(items, RUMOR_DIGEST_SIZE, self.store.as_ref())
            .await;
        self.composer.compose(&selected)
    }
}

/// One headline scraped from a statistics page
///
/// Stat pages usually keep a fixed URL, so items are deduplicated by page
/// link and run date: each page can post once per day.
pub struct StatOfTheDayProvider {
    aggregator: Aggregator,
    pages: Vec<FeedSource>,
    extractor: Arc<dyn DocumentExtractor>,
    selector: ItemSelector,
    store: Arc<dyn PostedLinkStore>,
    composer: Composer,
}

impl StatOfTheDayProvider {
    pub fn new(
        aggregator: Aggregator,
        pages: Vec<FeedSource>,
        extractor: Arc<dyn DocumentExtractor>,
        selector: ItemSelector,
        store: Arc<dyn PostedLinkStore>,
        style: Style,
    ) -> Self {
        Self {
            aggregator,
            pages,
            extractor,
            selector,
            store,
            composer: Composer::new(Style {
                layout: Layout::HeadlineOnly,
                ..style
            }),
        }
    }
}

#[async_trait]
impl FallbackProvider for StatOfTheDayProvider {
    fn name(&self) -> &'static str {
        "stat_of_the_day"
    }

    async fn provide(&self) -> Option<ComposedPost> {
        let today = self.aggregator.now().date();
        let items = self
            .aggregator
            .aggregate_pages(&self.pages, self.extractor.as_ref())
            .await
            .into_iter()
            .map(|mut item| {
                item.link = daily_key(&item.link, today);
                item
            })
            .collect();
        let selected = self.selector.select(items, 1, self.store.as_ref()).await;
        self.composer.compose(&selected)
    }
}

fn daily_key(link: &str, day: Date) -> String {
    format!("{}#{}", link, day)
}

/// Fixed message; always produces a post
#[derive(Debug, Clone)]
pub struct StaticMessageProvider {
    message: String,
    max_chars: usize,
}

impl StaticMessageProvider {
    /// A blank message falls back to [`DEFAULT_FALLBACK_MESSAGE`]
    pub fn new(message: impl Into<String>, max_chars: usize) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            DEFAULT_FALLBACK_MESSAGE.to_string()
        } else {
            message.trim().to_string()
        };
        Self { message, max_chars }
    }

    pub fn post(&self) -> ComposedPost {
        ComposedPost::text_only(truncate_words(&self.message, self.max_chars))
    }
}

impl Default for StaticMessageProvider {
    fn default() -> Self {
        Self::new(DEFAULT_FALLBACK_MESSAGE, Style::DEFAULT_MAX_CHARS)
    }
}

#[async_trait]
impl FallbackProvider for StaticMessageProvider {
    fn name(&self) -> &'static str {
        "static_message"
    }

    async fn provide(&self) -> Option<ComposedPost> {
        Some(self.post())
    }
}

/// Ordered providers run until one yields a post, then the static message
pub struct FallbackChain {
    providers: Vec<Box<dyn FallbackProvider>>,
    last_resort: StaticMessageProvider,
}

impl FallbackChain {
    pub fn new(providers: Vec<Box<dyn FallbackProvider>>, last_resort: StaticMessageProvider) -> Self {
        Self {
            providers,
            last_resort,
        }
    }

    /// Chain with only the static message
    pub fn static_only(last_resort: StaticMessageProvider) -> Self {
        Self::new(vec![], last_resort)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers
            .iter()
            .map(|p| p.name())
            .chain(std::iter::once(self.last_resort.name()))
            .collect()
    }

    /// First non-empty post from the chain; never fails
    pub async fn fallback(&self) -> ComposedPost {
        for provider in &self.providers {
            match provider.provide().await {
                Some(post) if !post.text.trim().is_empty() => {
                    tracing::info!(provider = provider.name(), "Fallback provider supplied a post");
                    return post;
                }
                _ => {
                    tracing::debug!(provider = provider.name(), "Fallback provider had nothing");
                }
            }
        }

        tracing::info!(provider = self.last_resort.name(), "Using static fallback message");
        self.last_resort.post()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::aggregate::DEFAULT_RUMOR_KEYWORDS;
    use crate::usecases::testing::{
        FakeClock, FakeFetcher, FakeLinkStore, HeadingExtractor, JsonFeedDecoder, entry_at,
        fixed_now,
    };
    use time::{Duration, OffsetDateTime};

    fn aggregator(fetcher: FakeFetcher) -> Aggregator {
        aggregator_at(fetcher, fixed_now())
    }

    fn aggregator_at(fetcher: FakeFetcher, time: OffsetDateTime) -> Aggregator {
        Aggregator::new(
            Arc::new(fetcher),
            Arc::new(JsonFeedDecoder),
            Arc::new(FakeClock { time }),
        )
    }

    fn stat_provider(time: OffsetDateTime, store: Arc<dyn PostedLinkStore>) -> StatOfTheDayProvider {
        let page = "<h1>Salah has 20 goal involvements this season</h1>";
        let fetcher = FakeFetcher::new().with_body("https://stats.test/today", page.as_bytes().to_vec());
        StatOfTheDayProvider::new(
            aggregator_at(fetcher, time),
            vec![FeedSource {
                url: "https://stats.test/today".to_string(),
                handle: String::new(),
            }],
            Arc::new(HeadingExtractor),
            ItemSelector::default(),
            store,
            Style::default(),
        )
    }

    fn rumor_config() -> AggregateConfig {
        AggregateConfig::rumors(DEFAULT_RUMOR_KEYWORDS.iter().map(|k| k.to_string()).collect())
    }

    fn rumor_source() -> FeedSource {
        FeedSource {
            url: "https://rumors.test/rss".to_string(),
            handle: "@Rumors".to_string(),
        }
    }

    fn rumor_fetcher() -> FakeFetcher {
        let now = fixed_now();
        FakeFetcher::new().with_feed(
            "https://rumors.test/rss",
            &[
                entry_at("Chelsea submit bid for young winger", "https://rumors.test/1", now - Duration::days(1)),
                entry_at("Midfielder linked with summer switch", "https://rumors.test/2", now - Duration::days(2)),
                entry_at("Talks stall over striker contract deal", "https://rumors.test/3", now - Duration::days(3)),
                entry_at("Goalkeeper target of three clubs abroad", "https://rumors.test/4", now - Duration::days(4)),
            ],
        )
    }

    struct Empty;

    #[async_trait]
    impl FallbackProvider for Empty {
        fn name(&self) -> &'static str {
            "empty"
        }

        async fn provide(&self) -> Option<ComposedPost> {
            None
        }
    }

    struct Canned(&'static str);

    #[async_trait]
    impl FallbackProvider for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn provide(&self) -> Option<ComposedPost> {
            Some(ComposedPost::text_only(self.0))
        }
    }

    #[tokio::test]
    async fn test_rumor_digest_takes_three_newest() {
        let provider = RumorDigestProvider::new(
            aggregator(rumor_fetcher()),
            vec![rumor_source()],
            rumor_config(),
            ItemSelector::default(),
            Arc::new(FakeLinkStore::default()),
            Style::default(),
        );

        let post = provider.provide().await.unwrap();

        assert!(post.text.starts_with(RUMOR_HEADER));
        assert!(post.text.contains("1. Chelsea submit bid for young winger"));
        assert!(post.text.contains("3. Talks stall over striker contract deal"));
        assert!(!post.text.contains("rumors.test/4"));
        assert_eq!(post.links.len(), 3);
        assert!(post.char_count() <= Style::DEFAULT_MAX_CHARS);
    }

    #[tokio::test]
    async fn test_stat_of_the_day_uses_page_heading_and_image() {
        let page = r#"<html><head><meta property="og:image" content="https://stats.test/chart.png"></head>
            <body><h1>Salah has 20 goal involvements this season</h1></body></html>"#;
        let fetcher = FakeFetcher::new().with_body("https://stats.test/today", page.as_bytes().to_vec());
        let provider = StatOfTheDayProvider::new(
            aggregator(fetcher),
            vec![FeedSource {
                url: "https://stats.test/today".to_string(),
                handle: String::new(),
            }],
            Arc::new(HeadingExtractor),
            ItemSelector::default(),
            Arc::new(FakeLinkStore::default()),
            Style::default(),
        );

        let post = provider.provide().await.unwrap();

        assert!(post.text.starts_with("Salah has 20 goal involvements this season"));
        assert_eq!(post.image_url.as_deref(), Some("https://stats.test/chart.png"));
        assert_eq!(post.links, vec!["https://stats.test/today#2025-03-01"]);
    }

    #[tokio::test]
    async fn test_stat_of_the_day_posts_once_per_day() {
        let store = Arc::new(FakeLinkStore::default());

        let first = stat_provider(fixed_now(), store.clone()).provide().await.unwrap();
        assert_eq!(first.links, vec!["https://stats.test/today#2025-03-01"]);
        store.record(&first.links[0], fixed_now()).await.unwrap();

        let later_same_day = stat_provider(fixed_now() + Duration::hours(6), store.clone());
        assert!(later_same_day.provide().await.is_none());

        let next_day = fixed_now() + Duration::days(1);
        let second = stat_provider(next_day, store.clone()).provide().await.unwrap();
        assert_eq!(second.links, vec!["https://stats.test/today#2025-03-02"]);
        assert!(second.text.starts_with("Salah has 20 goal involvements this season"));
    }

    #[tokio::test]
    async fn test_chain_returns_first_success() {
        let chain = FallbackChain::new(
            vec![Box::new(Empty), Box::new(Canned("second")), Box::new(Canned("third"))],
            StaticMessageProvider::default(),
        );

        assert_eq!(chain.fallback().await.text, "second");
        assert_eq!(
            chain.provider_names(),
            vec!["empty", "canned", "canned", "static_message"]
        );
    }

    #[tokio::test]
    async fn test_everything_posted_still_yields_static_post() {
        let store: Arc<dyn PostedLinkStore> = Arc::new(FakeLinkStore::with_links(&[
            "https://rumors.test/1",
            "https://rumors.test/2",
            "https://rumors.test/3",
            "https://rumors.test/4",
        ]));
        let rumors = RumorDigestProvider::new(
            aggregator(rumor_fetcher()),
            vec![rumor_source()],
            rumor_config(),
            ItemSelector::default(),
            Arc::clone(&store),
            Style::default(),
        );
        let chain = FallbackChain::new(vec![Box::new(rumors)], StaticMessageProvider::new("", 280));

        let post = chain.fallback().await;

        assert_eq!(post.text, DEFAULT_FALLBACK_MESSAGE);
        assert!(post.links.is_empty());
        assert!(post.image_url.is_none());
    }

    #[tokio::test]
    async fn test_static_message_respects_budget() {
        let provider = StaticMessageProvider::new("Plenty of football still to come this weekend", 20);
        let post = provider.provide().await.unwrap();
        assert_eq!(post.text, "Plenty of...");
    }
}
