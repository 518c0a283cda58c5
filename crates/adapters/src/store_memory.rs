//! In-memory posted-link store for testing and dry runs

use async_trait::async_trait;
use pitchwire_domain::{LinkStoreError, PostedLinkStore};
use std::collections::HashMap;
use std::sync::RwLock;
use time::OffsetDateTime;

/// In-memory posted-link store implementation
pub struct InMemoryLinkStore {
    links: RwLock<HashMap<String, OffsetDateTime>>,
}

impl InMemoryLinkStore {
    pub fn new() -> Self {
        Self {
            links: RwLock::new(HashMap::new()),
        }
    }

    /// Store pre-seeded with links recorded at `at`
    pub fn with_links<I, S>(links: I, at: OffsetDateTime) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            links: RwLock::new(links.into_iter().map(|l| (l.into(), at)).collect()),
        }
    }
}

impl Default for InMemoryLinkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostedLinkStore for InMemoryLinkStore {
    async fn contains(&self, link: &str) -> Result<bool, LinkStoreError> {
        let links = self
            .links
            .read()
            .map_err(|e| LinkStoreError::Poisoned(e.to_string()))?;
        Ok(links.contains_key(link.trim()))
    }

    async fn record(&self, link: &str, at: OffsetDateTime) -> Result<(), LinkStoreError> {
        let mut links = self
            .links
            .write()
            .map_err(|e| LinkStoreError::Poisoned(e.to_string()))?;
        links.entry(link.trim().to_string()).or_insert(at);
        Ok(())
    }

    async fn prune_before(&self, cutoff: OffsetDateTime) -> Result<usize, LinkStoreError> {
        let mut links = self
            .links
            .write()
            .map_err(|e| LinkStoreError::Poisoned(e.to_string()))?;
        let before = links.len();
        links.retain(|_, at| *at >= cutoff);
        Ok(before - links.len())
    }
}
