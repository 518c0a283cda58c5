//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{ComposedPost, FeedEntry, NewsItem};

/// Error type for fetch operations
///
/// An empty body is not an error; it comes back as `Ok` with no bytes.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Port for the raw `fetch(url) -> bytes` capability
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the body at `url`, bounded by the adapter's timeout
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Error type for feed decoding
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Feed parse error: {0}")]
    Parse(String),
}

/// Port for turning feed bytes into entries
pub trait FeedDecoder: Send + Sync {
    /// Decode an RSS/Atom document
    fn decode(&self, bytes: &[u8]) -> Result<Vec<FeedEntry>, DecodeError>;
}

/// Port for layout-coupled page scraping
///
/// Implementations know how a particular site lays out its pages; nothing
/// past this boundary does.
pub trait DocumentExtractor: Send + Sync {
    /// Extract news items from an HTML document fetched from `base_url`
    fn extract(&self, document: &str, base_url: &str) -> Vec<NewsItem>;
}

/// Error type for posted-link store operations
#[derive(Debug, Error)]
pub enum LinkStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Lock poisoned: {0}")]
    Poisoned(String),
}

/// Port for the persisted set of already-published links
#[async_trait]
pub trait PostedLinkStore: Send + Sync {
    /// Whether the link has been published before
    async fn contains(&self, link: &str) -> Result<bool, LinkStoreError>;

    /// Record a link after a confirmed publish
    async fn record(&self, link: &str, at: OffsetDateTime) -> Result<(), LinkStoreError>;

    /// Drop links recorded before `cutoff`, returning how many were removed
    ///
    /// Backends that keep no timestamps do not support retention and
    /// report zero.
    async fn prune_before(&self, _cutoff: OffsetDateTime) -> Result<usize, LinkStoreError> {
        Ok(0)
    }
}

/// Error type for publisher operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Content too long: {len} > {max}")]
    ContentTooLong { len: usize, max: usize },
    #[error("Media upload failed: {0}")]
    Media(String),
}

/// Result of a successful publish operation
#[derive(Debug, Clone)]
pub struct PublishResult {
    /// Platform-specific post ID
    pub id: String,
    /// URL to the published content, if available
    pub url: Option<String>,
}

/// Port for publishing composed posts
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a post with an optional image file, returns the published ID
    async fn publish(
        &self,
        post: &ComposedPost,
        media: Option<&Path>,
    ) -> Result<PublishResult, PublishError>;

    /// Check if this publisher is enabled
    fn is_enabled(&self) -> bool;

    /// Get the platform name (e.g., "x", "outbox")
    fn platform(&self) -> &'static str;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
