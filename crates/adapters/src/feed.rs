//! RSS/Atom decoding via feed-rs

use feed_rs::model::Entry;
use feed_rs::parser;
use pitchwire_domain::{DecodeError, FeedDecoder, FeedEntry, MediaRef};
use time::OffsetDateTime;

/// Feed decoder for RSS 0.x/1.0/2.0, Atom and JSON Feed
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedRsDecoder;

impl FeedDecoder for FeedRsDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<FeedEntry>, DecodeError> {
        let feed = parser::parse(bytes).map_err(|e| DecodeError::Parse(e.to_string()))?;
        Ok(feed.entries.into_iter().map(convert_entry).collect())
    }
}

fn convert_entry(entry: Entry) -> FeedEntry {
    let link = select_entry_link(&entry);

    // Zone-less dates are read as UTC by the parser
    let published = entry
        .published
        .or(entry.updated)
        .and_then(|dt| OffsetDateTime::from_unix_timestamp(dt.timestamp()).ok());

    let thumbnail = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.trim())
        .find(|uri| !uri.is_empty())
        .map(str::to_string);

    let media = entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .filter_map(|content| {
            let url = content.url.as_ref()?.as_str().trim();
            (!url.is_empty()).then(|| MediaRef {
                url: url.to_string(),
                media_type: content.content_type.as_ref().map(|m| m.to_string()),
            })
        })
        .collect();

    let links = entry
        .links
        .iter()
        .filter(|l| !l.href.trim().is_empty())
        .map(|l| MediaRef {
            url: l.href.trim().to_string(),
            media_type: l.media_type.clone(),
        })
        .collect();

    FeedEntry {
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        link,
        published,
        summary_html: entry.summary.map(|s| s.content),
        content_html: entry.content.and_then(|c| c.body),
        thumbnail,
        media,
        links,
    }
}

/// The article link: first `alternate` (or untyped) link, else any link,
/// else an id that looks like a URL
fn select_entry_link(entry: &Entry) -> String {
    let is_image = |media_type: Option<&str>| media_type.is_some_and(|m| m.starts_with("image/"));

    for link in &entry.links {
        let href = link.href.trim();
        if href.is_empty() || is_image(link.media_type.as_deref()) {
            continue;
        }
        let rel = link.rel.as_deref().unwrap_or("");
        if rel.is_empty() || rel.eq_ignore_ascii_case("alternate") {
            return href.to_string();
        }
    }
    if let Some(link) = entry.links.iter().find(|l| !l.href.trim().is_empty()) {
        return link.href.trim().to_string();
    }
    let id = entry.id.trim();
    if id.starts_with("http://") || id.starts_with("https://") {
        return id.to_string();
    }
    String::new()
}
