//! Run command - aggregate, select, compose and publish once

use anyhow::{Context, Result, bail};
use pitchwire_adapters::{
    extract::MetaTagExtractor,
    feed::FeedRsDecoder,
    http::{HttpFetcher, HttpFetcherConfig},
    outbox::{OutboxPublisher, OutboxWriter},
    store::{FileLinkStore, InMemoryLinkStore, SqliteLinkStore},
    x::XPublisher,
};
use pitchwire_domain::{
    Clock, FeedSource, Fetcher, HandleMap, Layout, PostedLinkStore, Publisher, RunOutcome, Style,
    SystemClock,
    usecases::{
        AggregateConfig, Aggregator, FallbackChain, FallbackProvider, ItemSelector, Pipeline,
        PipelineConfig, RumorDigestProvider, SelectConfig, StatOfTheDayProvider,
        StaticMessageProvider,
    },
};
use secrecy::SecretString;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::args::RunArgs;
use crate::config::{AppConfig, DedupBackend};

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    let require_approval = args.require_approval;
    let outbox_path = if require_approval {
        Some(args.outbox.clone().unwrap_or_else(default_outbox_path))
    } else {
        None
    };

    if args.outbox.is_some() && !require_approval {
        tracing::warn!("--outbox is ignored without --require-approval");
    }

    let mut dry_run = args.dry_run || config.general.dry_run;
    if require_approval && dry_run {
        tracing::info!("--require-approval overrides dry-run");
        dry_run = false;
    }

    tracing::info!(
        dry_run = dry_run,
        require_approval = require_approval,
        outbox = ?outbox_path,
        sources = config.feeds.sources.len(),
        backend = ?config.general.dedup_backend,
        "Starting pitchwire run"
    );

    let store = build_store(&config).await?;

    let publisher: Arc<dyn Publisher> = match outbox_path {
        Some(outbox_path) => {
            let writer = OutboxWriter::new(outbox_path.clone())
                .await
                .context("Failed to initialize outbox writer")?;

            tracing::info!(outbox = %outbox_path.display(), "Writing approvals to outbox");

            if config.x.write.enabled {
                Arc::new(OutboxPublisher::new(writer, "x"))
            } else {
                tracing::warn!("Require approval enabled but no publishers are configured");
                Arc::new(XPublisher::disabled())
            }
        }
        None => Arc::new(build_x_publisher(&config, dry_run)?),
    };

    let pipeline = build_pipeline(&config, dry_run, publisher, store)?;

    match pipeline.run_once().await {
        RunOutcome::DryRun { post } => {
            println!("{}", post.text);
            if let Some(image) = &post.image_url {
                tracing::info!(image = %image, "Image that would be attached");
            }
        }
        RunOutcome::Published { post, post_id } => {
            tracing::info!(post_id = %post_id, links = post.links.len(), "Published");
            println!("Published {}", post_id);
        }
        RunOutcome::Failed { post, error } => {
            tracing::error!(
                error = %error,
                chars = post.char_count(),
                "Publish failed; no links recorded"
            );
        }
    }

    tracing::info!("pitchwire run completed");
    Ok(())
}

/// Open the configured posted-link store
pub(crate) async fn build_store(config: &AppConfig) -> Result<Arc<dyn PostedLinkStore>> {
    let path = &config.general.dedup_path;
    let store: Arc<dyn PostedLinkStore> = match config.general.dedup_backend {
        DedupBackend::File => {
            if config.general.retention_days > 0 {
                tracing::warn!("retention_days is ignored by the file dedup backend");
            }
            Arc::new(
                FileLinkStore::open(path.clone())
                    .await
                    .with_context(|| format!("Failed to open link file {}", path.display()))?,
            )
        }
        DedupBackend::Sqlite => Arc::new(
            SqliteLinkStore::new(path)
                .await
                .with_context(|| format!("Failed to open SQLite store {}", path.display()))?,
        ),
        DedupBackend::Memory => {
            tracing::warn!("In-memory dedup store: posted links are forgotten on exit");
            Arc::new(InMemoryLinkStore::new())
        }
    };
    Ok(store)
}

fn build_pipeline(
    config: &AppConfig,
    dry_run: bool,
    publisher: Arc<dyn Publisher>,
    store: Arc<dyn PostedLinkStore>,
) -> Result<Pipeline<dyn Publisher, dyn PostedLinkStore>> {
    let fetcher: Arc<dyn Fetcher> = Arc::new(
        HttpFetcher::new(HttpFetcherConfig {
            timeout: Duration::from_secs(config.feeds.timeout_secs),
            user_agent: config.feeds.user_agent.clone(),
        })
        .context("Failed to build HTTP client")?,
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let aggregator = Aggregator::new(fetcher.clone(), Arc::new(FeedRsDecoder), clock.clone());
    let selector = ItemSelector::new(SelectConfig {
        min_title_chars: config.feeds.min_title_chars,
        tie_break: config.feeds.tie_break,
    });

    let handles = config.feeds.handle_map();
    let sources = feed_sources(&config.feeds.sources, &handles);
    let style = base_style(config);

    let mut providers: Vec<Box<dyn FallbackProvider>> = Vec::new();

    if config.rumors.enabled {
        let rumor_sources = if config.rumors.sources.is_empty() {
            sources.clone()
        } else {
            feed_sources(&config.rumors.sources, &handles)
        };
        let rumor_style = Style {
            header: config
                .rumors
                .header
                .clone()
                .filter(|h| !h.trim().is_empty()),
            ..style.clone()
        };
        providers.push(Box::new(RumorDigestProvider::new(
            aggregator.clone(),
            rumor_sources,
            AggregateConfig::rumors(config.rumors.keywords.clone()),
            selector.clone(),
            store.clone(),
            rumor_style,
        )));
    }

    if config.stat.enabled {
        if config.stat.pages.is_empty() {
            tracing::warn!("Stat of the day enabled but no pages configured");
        } else {
            providers.push(Box::new(StatOfTheDayProvider::new(
                aggregator.clone(),
                feed_sources(&config.stat.pages, &handles),
                Arc::new(MetaTagExtractor::new(clock.clone())),
                selector.clone(),
                store.clone(),
                style.clone(),
            )));
        }
    }

    let fallback = FallbackChain::new(
        providers,
        StaticMessageProvider::new(config.compose.fallback_message.clone(), config.compose.max_chars),
    );
    tracing::debug!(providers = ?fallback.provider_names(), "Fallback chain");

    let retention = match config.general.retention_days {
        0 => None,
        days => Some(time::Duration::days(i64::from(days))),
    };

    let pipeline_config = PipelineConfig {
        sources,
        aggregate: AggregateConfig::recent(time::Duration::hours(i64::from(
            config.feeds.window_hours,
        ))),
        select_count: config.feeds.select_count,
        style,
        dry_run,
        retention,
    };

    Ok(Pipeline::new(
        aggregator,
        selector,
        fallback,
        publisher,
        store,
        fetcher,
        clock,
        pipeline_config,
    ))
}

fn feed_sources(urls: &[String], handles: &HandleMap) -> Vec<FeedSource> {
    urls.iter()
        .map(|url| url.trim())
        .filter(|url| !url.is_empty())
        .map(|url| FeedSource::new(url, handles))
        .collect()
}

fn base_style(config: &AppConfig) -> Style {
    let style = Style::new(Layout::Single)
        .with_hashtags(config.compose.hashtag_policy())
        .with_max_chars(config.compose.max_chars);
    match &config.compose.header {
        Some(header) => style.with_header(header.clone()),
        None => style,
    }
}

fn build_x_publisher(config: &AppConfig, dry_run: bool) -> Result<XPublisher> {
    if dry_run || !config.x.write.enabled {
        return Ok(XPublisher::disabled());
    }

    let user_token = load_api_key(&config.x.write.oauth2_user_token_env, "x_write")?;
    XPublisher::with_base_url(
        user_token,
        config.x.write.base_url.clone(),
        config.x.write.max_chars,
        true,
    )
    .context("Failed to build X publisher")
}

pub(crate) fn load_api_key(env_var: &str, provider: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("No API key env var configured for provider {}", provider);
    }

    let key = std::env::var(env_var).with_context(|| {
        format!(
            "Missing API key env var {} for provider {}",
            env_var, provider
        )
    })?;

    if key.trim().is_empty() {
        bail!(
            "API key env var {} is empty for provider {}",
            env_var,
            provider
        );
    }

    Ok(SecretString::new(key.into()))
}

fn default_outbox_path() -> PathBuf {
    PathBuf::from("./outbox.jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pitchwire_domain::HashtagPolicy;

    #[test]
    fn test_feed_sources_resolve_handles_and_skip_blanks() {
        let config = AppConfig::default();
        let handles = config.feeds.handle_map();
        let urls = vec![
            "https://www.skysports.com/rss/12040".to_string(),
            "  ".to_string(),
            "https://news.example.test/rss".to_string(),
        ];

        let sources = feed_sources(&urls, &handles);

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].handle, "@SkySports");
        assert_eq!(sources[1].handle, "");
    }

    #[test]
    fn test_base_style_from_config() {
        let mut config = AppConfig::default();
        config.compose.header = Some("⚽ Matchday".to_string());
        config.compose.max_chars = 200;

        let style = base_style(&config);

        assert_eq!(style.layout, Layout::Single);
        assert_eq!(style.header.as_deref(), Some("⚽ Matchday"));
        assert_eq!(style.max_chars, 200);
        assert_eq!(style.hashtags, HashtagPolicy::Generated);
    }

    #[test]
    fn test_x_publisher_disabled_in_dry_run() {
        let mut config = AppConfig::default();
        config.x.write.enabled = true;

        let publisher = build_x_publisher(&config, true).unwrap();
        assert!(!publisher.is_enabled());
    }

    #[test]
    fn test_load_api_key_rejects_blank_env_name() {
        assert!(load_api_key("  ", "x_write").is_err());
    }

    #[tokio::test]
    async fn test_build_store_memory_backend() {
        let mut config = AppConfig::default();
        config.general.dedup_backend = DedupBackend::Memory;

        let store = build_store(&config).await.unwrap();
        assert!(!store.contains("https://sport.test/a").await.unwrap());
    }
}
