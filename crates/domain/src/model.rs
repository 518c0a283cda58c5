//! Domain models and value objects

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A configured feed endpoint together with the handle credited in posts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    /// Feed or page URL
    pub url: String,
    /// Display handle (e.g. "@BBCSport"), empty when none applies
    pub handle: String,
}

impl FeedSource {
    /// Build a source, resolving its handle through the given map
    pub fn new(url: impl Into<String>, handles: &HandleMap) -> Self {
        let url = url.into();
        let handle = handles.resolve(&url).to_string();
        Self { url, handle }
    }
}

/// One `(domain substring, handle)` pair of a [`HandleMap`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleRule {
    pub pattern: String,
    pub handle: String,
}

/// Ordered mapping from URL substrings to display handles
///
/// Rules are tried in order and the first whose pattern occurs in the URL
/// wins. URLs matching no rule get the default handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleMap {
    pub rules: Vec<HandleRule>,
    pub default_handle: String,
}

impl HandleMap {
    pub fn new(rules: Vec<HandleRule>, default_handle: impl Into<String>) -> Self {
        Self {
            rules,
            default_handle: default_handle.into(),
        }
    }

    /// Look up the handle for a URL
    pub fn resolve(&self, url: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| !rule.pattern.is_empty() && url.contains(&rule.pattern))
            .map(|rule| rule.handle.as_str())
            .unwrap_or(&self.default_handle)
    }
}

/// A media reference attached to a feed entry (media object or entry link)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    /// Declared MIME type, if any
    pub media_type: Option<String>,
}

/// A decoded but not yet normalized feed entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    /// Publication instant, falling back to the update instant
    #[serde(with = "time::serde::rfc3339::option")]
    pub published: Option<OffsetDateTime>,
    /// Raw summary/description HTML
    pub summary_html: Option<String>,
    /// Raw content body HTML
    pub content_html: Option<String>,
    /// Thumbnail URL from the media extensions
    pub thumbnail: Option<String>,
    /// Media content objects
    #[serde(default)]
    pub media: Vec<MediaRef>,
    /// Entry links with their declared types
    #[serde(default)]
    pub links: Vec<MediaRef>,
}

/// A normalized news item ready for selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Headline
    pub title: String,
    /// Canonical article link; the sole dedup identity
    pub link: String,
    /// Publication instant (UTC)
    #[serde(with = "time::serde::rfc3339")]
    pub published: OffsetDateTime,
    /// Plain-text summary
    pub summary: String,
    /// Resolved absolute image URL
    pub image_url: Option<String>,
    /// Where the item came from
    pub source: FeedSource,
}

impl NewsItem {
    pub fn has_image(&self) -> bool {
        self.image_url.is_some()
    }

    /// Title length in characters
    pub fn title_chars(&self) -> usize {
        self.title.chars().count()
    }
}

/// Post layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// One item with handle credit and link
    #[default]
    Single,
    /// Numbered list of several items with links
    Digest,
    /// Headline and hashtags only
    HeadlineOnly,
}

/// How the trailing hashtag block is produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HashtagPolicy {
    /// Derive tags from the headline
    #[default]
    Generated,
    /// Always use this list
    Fixed(Vec<String>),
    /// No hashtag block
    Disabled,
}

/// Rendering style for a composed post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Style {
    pub layout: Layout,
    pub hashtags: HashtagPolicy,
    /// Optional first line
    pub header: Option<String>,
    /// Hard character budget
    pub max_chars: usize,
}

impl Style {
    pub const DEFAULT_MAX_CHARS: usize = 280;

    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        let header = header.into();
        self.header = if header.trim().is_empty() {
            None
        } else {
            Some(header)
        };
        self
    }

    pub fn with_hashtags(mut self, hashtags: HashtagPolicy) -> Self {
        self.hashtags = hashtags;
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

impl Default for Style {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            hashtags: HashtagPolicy::default(),
            header: None,
            max_chars: Self::DEFAULT_MAX_CHARS,
        }
    }
}

/// Platform-ready post text plus optional image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposedPost {
    /// Final text, never longer than the style budget
    pub text: String,
    /// Image to attach, if any
    pub image_url: Option<String>,
    /// Links covered by this post; recorded after a successful publish
    pub links: Vec<String>,
}

impl ComposedPost {
    /// A post with no backing items (nothing to record)
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: None,
            links: Vec::new(),
        }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Result of one pipeline run
#[derive(Debug)]
pub enum RunOutcome {
    /// Post was published and its links recorded
    Published { post: ComposedPost, post_id: String },
    /// Dry run: post composed but not published
    DryRun { post: ComposedPost },
    /// Publishing failed; nothing was recorded
    Failed { post: ComposedPost, error: String },
}
