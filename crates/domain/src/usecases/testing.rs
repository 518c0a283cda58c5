//! Fake port implementations shared by the use case tests

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use time::{Duration, OffsetDateTime, macros::datetime};

use crate::model::{ComposedPost, FeedEntry, FeedSource, NewsItem};
use crate::ports::{
    Clock, DecodeError, DocumentExtractor, FeedDecoder, FetchError, Fetcher, LinkStoreError,
    PostedLinkStore, PublishError, PublishResult, Publisher,
};

pub fn fixed_now() -> OffsetDateTime {
    datetime!(2025-03-01 12:00 UTC)
}

pub fn entry_at(title: &str, link: &str, published: OffsetDateTime) -> FeedEntry {
    FeedEntry {
        title: title.to_string(),
        link: link.to_string(),
        published: Some(published),
        ..Default::default()
    }
}

pub fn item(title: &str, link: &str, hours_ago: i64, image: Option<&str>) -> NewsItem {
    NewsItem {
        title: title.to_string(),
        link: link.to_string(),
        published: fixed_now() - Duration::hours(hours_ago),
        summary: String::new(),
        image_url: image.map(str::to_string),
        source: FeedSource {
            url: "https://feed.test/rss".to_string(),
            handle: "@FeedTest".to_string(),
        },
    }
}

pub struct FakeClock {
    pub time: OffsetDateTime,
}

impl Clock for FakeClock {
    fn now(&self) -> OffsetDateTime {
        self.time
    }
}

/// Serves canned bodies per URL; unknown URLs fail with a network error
#[derive(Default)]
pub struct FakeFetcher {
    bodies: HashMap<String, Vec<u8>>,
    failing: HashSet<String>,
    pub requested: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    pub fn with_feed(self, url: &str, entries: &[FeedEntry]) -> Self {
        let body = serde_json::to_vec(entries).unwrap();
        self.with_body(url, body)
    }

    pub fn with_error(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(FetchError::Status {
                status: 503,
                url: url.to_string(),
            });
        }
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Network(format!("no route to {url}")))
    }
}

/// Decodes a JSON array of entries, standing in for the RSS decoder
pub struct JsonFeedDecoder;

impl FeedDecoder for JsonFeedDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<FeedEntry>, DecodeError> {
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Parse(e.to_string()))
    }
}

/// Extracts one item per page from a `<h1>` and an optional `<img>`
pub struct HeadingExtractor;

impl DocumentExtractor for HeadingExtractor {
    fn extract(&self, document: &str, base_url: &str) -> Vec<NewsItem> {
        let Some(start) = document.find("<h1>") else {
            return vec![];
        };
        let Some(end) = document.find("</h1>") else {
            return vec![];
        };
        let title = document[start + 4..end].to_string();
        vec![NewsItem {
            title,
            link: base_url.to_string(),
            published: fixed_now(),
            summary: String::new(),
            image_url: crate::image::resolve_document_image(document, base_url),
            source: FeedSource {
                url: base_url.to_string(),
                handle: String::new(),
            },
        }]
    }
}

#[derive(Default)]
pub struct FakeLinkStore {
    pub links: Mutex<HashMap<String, OffsetDateTime>>,
    pub fail_lookups: bool,
}

impl FakeLinkStore {
    pub fn with_links(links: &[&str]) -> Self {
        Self {
            links: Mutex::new(
                links
                    .iter()
                    .map(|l| (l.to_string(), fixed_now() - Duration::days(1)))
                    .collect(),
            ),
            fail_lookups: false,
        }
    }

    pub fn contains_now(&self, link: &str) -> bool {
        self.links.lock().unwrap().contains_key(link)
    }
}

#[async_trait]
impl PostedLinkStore for FakeLinkStore {
    async fn contains(&self, link: &str) -> Result<bool, LinkStoreError> {
        if self.fail_lookups {
            return Err(LinkStoreError::Database("lookup failed".to_string()));
        }
        Ok(self.links.lock().unwrap().contains_key(link))
    }

    async fn record(&self, link: &str, at: OffsetDateTime) -> Result<(), LinkStoreError> {
        self.links.lock().unwrap().insert(link.to_string(), at);
        Ok(())
    }

    async fn prune_before(&self, cutoff: OffsetDateTime) -> Result<usize, LinkStoreError> {
        let mut links = self.links.lock().unwrap();
        let before = links.len();
        links.retain(|_, at| *at >= cutoff);
        Ok(before - links.len())
    }
}

/// Captures published posts; optionally fails every publish
#[derive(Default)]
pub struct FakePublisher {
    pub fail: bool,
    pub published: Mutex<Vec<ComposedPost>>,
    /// (media path, whether the file existed at publish time)
    pub media_seen: Mutex<Vec<(std::path::PathBuf, bool)>>,
    /// Contents of each media file at publish time
    pub media_bytes: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(
        &self,
        post: &ComposedPost,
        media: Option<&Path>,
    ) -> Result<PublishResult, PublishError> {
        if let Some(path) = media {
            self.media_seen
                .lock()
                .unwrap()
                .push((path.to_path_buf(), path.exists()));
            if let Ok(bytes) = std::fs::read(path) {
                self.media_bytes.lock().unwrap().push(bytes);
            }
        }
        if self.fail {
            return Err(PublishError::RateLimited);
        }
        self.published.lock().unwrap().push(post.clone());
        Ok(PublishResult {
            id: "post_1".to_string(),
            url: None,
        })
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn platform(&self) -> &'static str {
        "fake"
    }
}
