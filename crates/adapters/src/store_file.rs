//! Newline-delimited posted-link file

use async_trait::async_trait;
use pitchwire_domain::{LinkStoreError, PostedLinkStore};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use time::OffsetDateTime;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only link file, read once at open
///
/// Keeps no timestamps, so retention pruning is not supported.
#[derive(Debug)]
pub struct FileLinkStore {
    path: PathBuf,
    links: RwLock<HashSet<String>>,
    file: Mutex<tokio::fs::File>,
}

impl FileLinkStore {
    /// Open (or create) the link file; a missing file is an empty store
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, LinkStoreError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let links: HashSet<String> = match fs::read_to_string(&path).await {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e.into()),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        tracing::debug!(path = %path.display(), count = links.len(), "Loaded posted links");

        Ok(Self {
            path,
            links: RwLock::new(links),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.links.read().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PostedLinkStore for FileLinkStore {
    async fn contains(&self, link: &str) -> Result<bool, LinkStoreError> {
        let links = self
            .links
            .read()
            .map_err(|e| LinkStoreError::Poisoned(e.to_string()))?;
        Ok(links.contains(link.trim()))
    }

    async fn record(&self, link: &str, _at: OffsetDateTime) -> Result<(), LinkStoreError> {
        let link = link.trim();
        if link.is_empty() || self.contains(link).await? {
            return Ok(());
        }

        // Written and flushed before the in-memory set is updated
        let mut file = self.file.lock().await;
        file.write_all(link.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        self.links
            .write()
            .map_err(|e| LinkStoreError::Poisoned(e.to_string()))?
            .insert(link.to_string());
        Ok(())
    }
}
