//! Outbox publisher for require-approval mode.

use async_trait::async_trait;
use pitchwire_domain::{ComposedPost, PublishError, PublishResult, Publisher};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct OutboxWriter {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl OutboxWriter {
    pub async fn new(path: PathBuf) -> Result<Self, OutboxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &OutboxEntry<'_>) -> Result<(), OutboxError> {
        let line = serde_json::to_string(entry)?;
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

/// Queues composed posts as JSON lines for manual review
///
/// The staged image file is not kept; reviewers get the image URL.
#[derive(Debug, Clone)]
pub struct OutboxPublisher {
    writer: OutboxWriter,
    platform: &'static str,
}

impl OutboxPublisher {
    pub fn new(writer: OutboxWriter, platform: &'static str) -> Self {
        Self { writer, platform }
    }
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    id: String,
    platform: &'a str,
    queued_at: String,
    text: &'a str,
    image_url: Option<&'a str>,
    links: &'a [String],
}

#[async_trait]
impl Publisher for OutboxPublisher {
    async fn publish(
        &self,
        post: &ComposedPost,
        _media: Option<&Path>,
    ) -> Result<PublishResult, PublishError> {
        let id = Uuid::new_v4().to_string();
        let queued_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| PublishError::Api(format!("Timestamp format failed: {}", e)))?;

        let entry = OutboxEntry {
            id: id.clone(),
            platform: self.platform,
            queued_at,
            text: &post.text,
            image_url: post.image_url.as_deref(),
            links: &post.links,
        };

        self.writer
            .append(&entry)
            .await
            .map_err(|error| PublishError::Api(format!("Outbox write failed: {}", error)))?;

        tracing::info!(path = %self.writer.path().display(), id = %id, "Queued post for approval");

        Ok(PublishResult { id, url: None })
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn platform(&self) -> &'static str {
        self.platform
    }
}
