//! Page extraction from Open Graph and article meta tags

use std::sync::Arc;

use pitchwire_domain::image::resolve_document_image;
use pitchwire_domain::text::collapse_whitespace;
use pitchwire_domain::{Clock, DocumentExtractor, FeedSource, NewsItem};
use reqwest::Url;
use scraper::{Html, Selector};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Reads one item per page from `og:*` / `article:*` meta tags
///
/// Falls back to the first `<h1>` or the `<title>` for the headline and to
/// the fetch time when the page carries no publication timestamp.
pub struct MetaTagExtractor {
    clock: Arc<dyn Clock>,
}

impl MetaTagExtractor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl DocumentExtractor for MetaTagExtractor {
    fn extract(&self, document: &str, base_url: &str) -> Vec<NewsItem> {
        let html = Html::parse_document(document);

        let title = meta_content(&html, "og:title")
            .or_else(|| first_text(&html, "h1"))
            .or_else(|| first_text(&html, "title"))
            .map(|t| collapse_whitespace(&t))
            .unwrap_or_default();
        if title.is_empty() {
            tracing::debug!(page = %base_url, "No headline found on page");
            return vec![];
        }

        // og:url must be absolute; otherwise the fetched URL is the identity
        let link = meta_content(&html, "og:url")
            .and_then(|u| Url::parse(&u).ok())
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .map(|u| u.to_string())
            .unwrap_or_else(|| base_url.to_string());

        let summary = meta_content(&html, "og:description")
            .or_else(|| meta_content(&html, "description"))
            .map(|s| collapse_whitespace(&s))
            .unwrap_or_default();

        let published = meta_content(&html, "article:published_time")
            .and_then(|t| OffsetDateTime::parse(t.trim(), &Rfc3339).ok())
            .unwrap_or_else(|| self.clock.now());

        vec![NewsItem {
            title,
            link,
            published,
            summary,
            image_url: resolve_document_image(document, base_url),
            source: FeedSource {
                url: base_url.to_string(),
                handle: String::new(),
            },
        }]
    }
}

fn meta_content(html: &Html, key: &str) -> Option<String> {
    let selector = Selector::parse("meta").ok()?;
    html.select(&selector).find_map(|meta| {
        let element = meta.value();
        let name = element.attr("property").or_else(|| element.attr("name"))?;
        if !name.eq_ignore_ascii_case(key) {
            return None;
        }
        element
            .attr("content")
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    })
}

fn first_text(html: &Html, tag: &str) -> Option<String> {
    let selector = Selector::parse(tag).ok()?;
    html.select(&selector)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .find(|t| !t.trim().is_empty())
}
