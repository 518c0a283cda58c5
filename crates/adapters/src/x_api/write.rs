//! X API write adapter for publishing posts

use async_trait::async_trait;
use pitchwire_domain::{ComposedPost, PublishError, PublishResult, Publisher};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default X API origin
pub const DEFAULT_BASE_URL: &str = "https://api.x.com";

/// X API publisher: optional media upload, then create post
pub struct XPublisher {
    client: Client,
    user_token: SecretString,
    base_url: String,
    max_chars: usize,
    enabled: bool,
}

impl XPublisher {
    pub fn new(user_token: SecretString, max_chars: usize) -> Result<Self, PublishError> {
        Self::with_base_url(user_token, DEFAULT_BASE_URL.to_string(), max_chars, true)
    }

    pub fn with_base_url(
        user_token: SecretString,
        base_url: String,
        max_chars: usize,
        enabled: bool,
    ) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PublishError::Api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            user_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_chars,
            enabled,
        })
    }

    /// Create a disabled publisher (for testing/dry-run)
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            user_token: SecretString::new("".into()),
            base_url: String::new(),
            max_chars: 280,
            enabled: false,
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.user_token.expose_secret())
    }

    /// Upload an image and return its media id
    async fn upload_media(&self, path: &Path) -> Result<String, PublishError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PublishError::Media(format!("Failed to read {}: {}", path.display(), e)))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(path))
            .map_err(|e| PublishError::Media(e.to_string()))?;
        let form = Form::new()
            .text("media_category", "tweet_image")
            .part("media", part);

        let url = format!("{}/2/media/upload", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(|e| PublishError::Media(e.to_string()))?;

        let response = check_status(response, PublishError::Media).await?;
        let upload: MediaUploadResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Media(e.to_string()))?;

        Ok(upload.data.id)
    }
}

/// MIME type by file extension; X accepts JPEG, PNG, GIF and WEBP
fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Map auth and rate-limit statuses; other failures go through `other`
async fn check_status(
    response: Response,
    other: fn(String) -> PublishError,
) -> Result<Response, PublishError> {
    let status = response.status();

    if status == 401 || status == 403 {
        return Err(PublishError::Auth("Invalid user token".to_string()));
    }

    if status == 429 {
        return Err(PublishError::RateLimited);
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(other(format!("{}: {}", status, body)));
    }

    Ok(response)
}

#[derive(Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<TweetMedia>,
}

#[derive(Serialize)]
struct TweetMedia {
    media_ids: Vec<String>,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[derive(Deserialize)]
struct MediaUploadResponse {
    data: MediaData,
}

#[derive(Deserialize)]
struct MediaData {
    id: String,
}

#[async_trait]
impl Publisher for XPublisher {
    async fn publish(
        &self,
        post: &ComposedPost,
        media: Option<&Path>,
    ) -> Result<PublishResult, PublishError> {
        if !self.enabled {
            return Err(PublishError::Api("Publisher is disabled".to_string()));
        }

        let len = post.char_count();
        if len > self.max_chars {
            return Err(PublishError::ContentTooLong {
                len,
                max: self.max_chars,
            });
        }

        let media_id = match media {
            Some(path) => match self.upload_media(path).await {
                Ok(id) => Some(id),
                Err(e @ (PublishError::Auth(_) | PublishError::RateLimited)) => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, "Media upload failed, posting text only");
                    None
                }
            },
            None => None,
        };

        let request = CreateTweetRequest {
            text: &post.text,
            media: media_id.map(|id| TweetMedia {
                media_ids: vec![id],
            }),
        };

        let url = format!("{}/2/tweets", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        let response = check_status(response, |msg| {
            PublishError::Api(format!("Failed to create post: {}", msg))
        })
        .await?;

        let tweet_response: CreateTweetResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Ok(PublishResult {
            url: Some(format!("https://x.com/i/status/{}", tweet_response.data.id)),
            id: tweet_response.data.id,
        })
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn platform(&self) -> &'static str {
        "x"
    }
}
