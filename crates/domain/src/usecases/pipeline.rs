//! Pipeline use case - one aggregate, select, compose and publish run

use std::sync::Arc;

use tempfile::NamedTempFile;
use time::Duration;

use crate::{
    model::{ComposedPost, FeedSource, Layout, RunOutcome, Style},
    ports::{Clock, Fetcher, PostedLinkStore, Publisher},
    usecases::{
        aggregate::{AggregateConfig, Aggregator},
        compose::Composer,
        fallback::FallbackChain,
        select::ItemSelector,
    },
};

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Primary feed sources
    pub sources: Vec<FeedSource>,
    /// Recency window for the primary sources
    pub aggregate: AggregateConfig,
    /// Number of items to select (`k`)
    pub select_count: usize,
    /// Style for the primary post; the layout follows the selection size
    pub style: Style,
    /// Dry run mode (don't publish or record)
    pub dry_run: bool,
    /// Prune posted links older than this before running
    pub retention: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sources: vec![],
            aggregate: AggregateConfig::default(),
            select_count: 1,
            style: Style::default(),
            dry_run: true,
            retention: None,
        }
    }
}

/// Pipeline orchestrator
pub struct Pipeline<P, St>
where
    P: Publisher + ?Sized,
    St: PostedLinkStore + ?Sized,
{
    aggregator: Aggregator,
    selector: ItemSelector,
    fallback: FallbackChain,
    publisher: Arc<P>,
    store: Arc<St>,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    config: PipelineConfig,
}

impl<P, St> Pipeline<P, St>
where
    P: Publisher + ?Sized,
    St: PostedLinkStore + ?Sized,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        aggregator: Aggregator,
        selector: ItemSelector,
        fallback: FallbackChain,
        publisher: Arc<P>,
        store: Arc<St>,
        fetcher: Arc<dyn Fetcher>,
        clock: Arc<dyn Clock>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            aggregator,
            selector,
            fallback,
            publisher,
            store,
            fetcher,
            clock,
            config,
        }
    }

    /// Run the pipeline once
    ///
    /// Source, image and publish failures are logged and reflected in the
    /// outcome; this never errors.
    pub async fn run_once(&self) -> RunOutcome {
        self.apply_retention().await;

        let post = match self.compose_primary().await {
            Some(post) => post,
            None => {
                tracing::info!("No postable items selected, running fallback chain");
                self.fallback.fallback().await
            }
        };

        tracing::info!(
            chars = post.char_count(),
            links = post.links.len(),
            has_image = post.image_url.is_some(),
            "Composed post"
        );

        if self.config.dry_run {
            tracing::info!(
                text = %post.text,
                image = ?post.image_url,
                "[DRY RUN] Would publish"
            );
            return RunOutcome::DryRun { post };
        }

        if !self.publisher.is_enabled() {
            tracing::warn!(
                platform = self.publisher.platform(),
                "Publisher disabled, treating run as dry run"
            );
            return RunOutcome::DryRun { post };
        }

        self.publish(post).await
    }

    async fn apply_retention(&self) {
        let Some(retention) = self.config.retention else {
            return;
        };
        let cutoff = self.clock.now() - retention;
        match self.store.prune_before(cutoff).await {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed = removed, "Pruned old posted links"),
            Err(e) => tracing::warn!(error = %e, "Failed to prune posted links"),
        }
    }

    async fn compose_primary(&self) -> Option<ComposedPost> {
        let items = self
            .aggregator
            .aggregate(&self.config.sources, &self.config.aggregate)
            .await;
        tracing::info!(count = items.len(), "Aggregated primary sources");

        let selected = self
            .selector
            .select(items, self.config.select_count, self.store.as_ref())
            .await;
        if selected.is_empty() {
            return None;
        }

        let layout = if selected.len() == 1 {
            Layout::Single
        } else {
            Layout::Digest
        };
        let style = Style {
            layout,
            ..self.config.style.clone()
        };
        Composer::new(style).compose(&selected)
    }

    async fn publish(&self, post: ComposedPost) -> RunOutcome {
        // Dropping the staged file deletes it, whatever the publish result
        let staged = match &post.image_url {
            Some(url) => self.stage_image(url).await,
            None => None,
        };

        let result = self
            .publisher
            .publish(&post, staged.as_ref().map(|f| f.path()))
            .await;
        drop(staged);

        match result {
            Ok(published) => {
                tracing::info!(
                    platform = self.publisher.platform(),
                    post_id = %published.id,
                    "Published post"
                );
                let now = self.clock.now();
                for link in &post.links {
                    if let Err(e) = self.store.record(link, now).await {
                        tracing::error!(link = %link, error = %e, "Failed to record posted link");
                    }
                }
                RunOutcome::Published {
                    post,
                    post_id: published.id,
                }
            }
            Err(e) => {
                tracing::error!(
                    platform = self.publisher.platform(),
                    error = %e,
                    "Failed to publish"
                );
                RunOutcome::Failed {
                    post,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Download the image into a scratch file; `None` means post without it
    async fn stage_image(&self, url: &str) -> Option<NamedTempFile> {
        let bytes = match self.fetcher.fetch(url).await {
            Ok(bytes) if bytes.is_empty() => {
                tracing::warn!(url = %url, "Image download returned an empty body");
                return None;
            }
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Image download failed, posting without image");
                return None;
            }
        };

        let file = match tempfile::Builder::new()
            .prefix("pitchwire-")
            .suffix(image_suffix(url))
            .tempfile()
        {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create image scratch file");
                return None;
            }
        };

        if let Err(e) = tokio::fs::write(file.path(), &bytes).await {
            tracing::warn!(error = %e, "Failed to write image scratch file");
            return None;
        }

        tracing::debug!(path = %file.path().display(), bytes = bytes.len(), "Staged image");
        Some(file)
    }
}

fn image_suffix(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or_default().to_ascii_lowercase();
    if path.ends_with(".png") {
        ".png"
    } else if path.ends_with(".gif") {
        ".gif"
    } else if path.ends_with(".webp") {
        ".webp"
    } else {
        ".jpg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FeedEntry;
    use crate::usecases::fallback::{DEFAULT_FALLBACK_MESSAGE, StaticMessageProvider};
    use crate::usecases::testing::{
        FakeClock, FakeFetcher, FakeLinkStore, FakePublisher, JsonFeedDecoder, entry_at, fixed_now,
    };

    const FEED: &str = "https://news.test/rss";

    fn source() -> FeedSource {
        FeedSource {
            url: FEED.to_string(),
            handle: "@NewsTest".to_string(),
        }
    }

    fn entry_with_image(title: &str, link: &str, hours_ago: i64, image: &str) -> FeedEntry {
        FeedEntry {
            thumbnail: Some(image.to_string()),
            ..entry_at(title, link, fixed_now() - Duration::hours(hours_ago))
        }
    }

    fn pipeline(
        fetcher: FakeFetcher,
        store: Arc<FakeLinkStore>,
        publisher: Arc<FakePublisher>,
        config: PipelineConfig,
    ) -> Pipeline<FakePublisher, FakeLinkStore> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(fetcher);
        let clock: Arc<dyn Clock> = Arc::new(FakeClock { time: fixed_now() });
        let aggregator = Aggregator::new(Arc::clone(&fetcher), Arc::new(JsonFeedDecoder), Arc::clone(&clock));
        Pipeline::new(
            aggregator,
            ItemSelector::default(),
            FallbackChain::static_only(StaticMessageProvider::default()),
            publisher,
            store,
            fetcher,
            clock,
            config,
        )
    }

    fn live_config() -> PipelineConfig {
        PipelineConfig {
            sources: vec![source()],
            dry_run: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_publishes_and_records_link() {
        let fetcher = FakeFetcher::new()
            .with_feed(
                FEED,
                &[entry_with_image(
                    "Manager linked with shock move to rival club",
                    "https://news.test/manager",
                    1,
                    "https://img.test/manager.jpg",
                )],
            )
            .with_body("https://img.test/manager.jpg", vec![0xFF, 0xD8, 0xFF]);
        let store = Arc::new(FakeLinkStore::default());
        let publisher = Arc::new(FakePublisher::default());

        let outcome = pipeline(fetcher, Arc::clone(&store), Arc::clone(&publisher), live_config())
            .run_once()
            .await;

        match outcome {
            RunOutcome::Published { post, post_id } => {
                assert_eq!(post_id, "post_1");
                assert!(post.text.contains("via @NewsTest"));
                assert!(post.char_count() <= 280);
            }
            other => panic!("expected publish, got {other:?}"),
        }
        assert!(store.contains_now("https://news.test/manager"));

        let seen = publisher.media_seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (path, existed) = &seen[0];
        assert!(*existed, "image file should exist while publishing");
        assert!(!path.exists(), "image file should be deleted afterwards");
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
        assert_eq!(
            *publisher.media_bytes.lock().unwrap(),
            vec![vec![0xFF, 0xD8, 0xFF]],
            "staged file should hold the downloaded bytes"
        );
    }

    #[tokio::test]
    async fn test_publish_failure_records_nothing_and_cleans_up() {
        let fetcher = FakeFetcher::new()
            .with_feed(
                FEED,
                &[entry_with_image(
                    "Striker completes medical ahead of move",
                    "https://news.test/striker",
                    1,
                    "https://img.test/striker.png",
                )],
            )
            .with_body("https://img.test/striker.png", vec![0x89, 0x50, 0x4E, 0x47]);
        let store = Arc::new(FakeLinkStore::default());
        let publisher = Arc::new(FakePublisher {
            fail: true,
            ..Default::default()
        });

        let outcome = pipeline(fetcher, Arc::clone(&store), Arc::clone(&publisher), live_config())
            .run_once()
            .await;

        assert!(matches!(outcome, RunOutcome::Failed { .. }));
        assert!(!store.contains_now("https://news.test/striker"));
        let seen = publisher.media_seen.lock().unwrap();
        assert!(!seen[0].0.exists());
    }

    #[tokio::test]
    async fn test_image_download_failure_posts_text_only() {
        let fetcher = FakeFetcher::new().with_feed(
            FEED,
            &[entry_with_image(
                "Keeper saves two penalties in shootout",
                "https://news.test/keeper",
                1,
                "https://img.test/missing.jpg",
            )],
        );
        let store = Arc::new(FakeLinkStore::default());
        let publisher = Arc::new(FakePublisher::default());

        let outcome = pipeline(fetcher, Arc::clone(&store), Arc::clone(&publisher), live_config())
            .run_once()
            .await;

        assert!(matches!(outcome, RunOutcome::Published { .. }));
        assert!(publisher.media_seen.lock().unwrap().is_empty());
        assert!(store.contains_now("https://news.test/keeper"));
    }

    #[tokio::test]
    async fn test_all_posted_falls_back_to_static_message() {
        let fetcher = FakeFetcher::new().with_feed(
            FEED,
            &[entry_at(
                "Story that went out on the last run",
                "https://news.test/old",
                fixed_now() - Duration::hours(1),
            )],
        );
        let store = Arc::new(FakeLinkStore::with_links(&["https://news.test/old"]));
        let publisher = Arc::new(FakePublisher::default());

        let outcome = pipeline(fetcher, Arc::clone(&store), Arc::clone(&publisher), live_config())
            .run_once()
            .await;

        match outcome {
            RunOutcome::Published { post, .. } => {
                assert_eq!(post.text, DEFAULT_FALLBACK_MESSAGE);
                assert!(post.links.is_empty());
            }
            other => panic!("expected publish, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dry_run_neither_publishes_nor_records() {
        let fetcher = FakeFetcher::new().with_feed(
            FEED,
            &[entry_at(
                "Derby ends level after late equaliser",
                "https://news.test/derby",
                fixed_now() - Duration::hours(2),
            )],
        );
        let store = Arc::new(FakeLinkStore::default());
        let publisher = Arc::new(FakePublisher::default());
        let config = PipelineConfig {
            dry_run: true,
            ..live_config()
        };

        let outcome = pipeline(fetcher, Arc::clone(&store), Arc::clone(&publisher), config)
            .run_once()
            .await;

        assert!(matches!(outcome, RunOutcome::DryRun { .. }));
        assert!(publisher.published.lock().unwrap().is_empty());
        assert!(!store.contains_now("https://news.test/derby"));
    }

    #[tokio::test]
    async fn test_digest_when_several_selected_and_all_links_recorded() {
        let now = fixed_now();
        let fetcher = FakeFetcher::new().with_feed(
            FEED,
            &[
                entry_at("Leaders extend gap at the top of table", "https://news.test/a", now - Duration::hours(1)),
                entry_at("Relegation battle tightens after defeat", "https://news.test/b", now - Duration::hours(2)),
            ],
        );
        let store = Arc::new(FakeLinkStore::default());
        let publisher = Arc::new(FakePublisher::default());
        let config = PipelineConfig {
            select_count: 3,
            ..live_config()
        };

        let outcome = pipeline(fetcher, Arc::clone(&store), Arc::clone(&publisher), config)
            .run_once()
            .await;

        match outcome {
            RunOutcome::Published { post, .. } => {
                assert!(post.text.contains("1. Leaders extend gap"));
                assert!(post.text.contains("2. Relegation battle"));
            }
            other => panic!("expected publish, got {other:?}"),
        }
        assert!(store.contains_now("https://news.test/a"));
        assert!(store.contains_now("https://news.test/b"));
    }

    #[tokio::test]
    async fn test_retention_prunes_before_selection() {
        let fetcher = FakeFetcher::new();
        let store = Arc::new(FakeLinkStore::default());
        store
            .links
            .lock()
            .unwrap()
            .insert("https://news.test/ancient".to_string(), fixed_now() - Duration::days(60));
        store
            .links
            .lock()
            .unwrap()
            .insert("https://news.test/recent".to_string(), fixed_now() - Duration::days(2));
        let config = PipelineConfig {
            retention: Some(Duration::days(30)),
            ..Default::default()
        };

        pipeline(fetcher, Arc::clone(&store), Arc::new(FakePublisher::default()), config)
            .run_once()
            .await;

        assert!(!store.contains_now("https://news.test/ancient"));
        assert!(store.contains_now("https://news.test/recent"));
    }

    #[test]
    fn test_image_suffix() {
        assert_eq!(image_suffix("https://img.test/a.PNG?w=600"), ".png");
        assert_eq!(image_suffix("https://img.test/a.webp"), ".webp");
        assert_eq!(image_suffix("https://img.test/render"), ".jpg");
    }
}
