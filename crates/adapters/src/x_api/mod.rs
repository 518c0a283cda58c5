//! X (Twitter) API adapters

mod write;

pub use write::{DEFAULT_BASE_URL, XPublisher};

use async_trait::async_trait;
use pitchwire_domain::{ComposedPost, PublishError, PublishResult, Publisher};
use std::path::Path;
use std::sync::Mutex;

/// Stub publisher for testing
pub struct StubPublisher {
    enabled: bool,
    published: Mutex<Vec<(ComposedPost, bool)>>,
}

impl StubPublisher {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            published: Mutex::new(vec![]),
        }
    }

    /// Posts published so far, each with whether an image file was attached
    pub fn get_published(&self) -> Vec<(ComposedPost, bool)> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

#[async_trait]
impl Publisher for StubPublisher {
    async fn publish(
        &self,
        post: &ComposedPost,
        media: Option<&Path>,
    ) -> Result<PublishResult, PublishError> {
        if !self.enabled {
            return Err(PublishError::Api("Publisher disabled".to_string()));
        }

        let mut published = self
            .published
            .lock()
            .map_err(|e| PublishError::Api(e.to_string()))?;
        published.push((post.clone(), media.is_some_and(Path::exists)));
        let id = format!("stub_{}", published.len());

        Ok(PublishResult {
            url: Some(format!("https://x.com/stub/status/{}", id)),
            id,
        })
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn platform(&self) -> &'static str {
        "stub"
    }
}
