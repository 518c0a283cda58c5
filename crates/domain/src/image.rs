//! Image URL resolution
//!
//! Best-effort: every function here returns `None` rather than failing, so
//! image lookup can never abort the pipeline.

use scraper::{Html, Selector};
use url::{Host, Url};

use crate::model::FeedEntry;

const ALLOWED_SCHEMES: [&str; 3] = ["http", "https", "ftp"];

/// Resolve the image for a feed entry
///
/// Order: thumbnail, image media content, `image/*` entry link, first `<img>`
/// in the content body, first `<img>` in the summary. Relative candidates are
/// resolved against the entry link; the result must pass [`validate_image_url`].
pub fn resolve_entry_image(entry: &FeedEntry) -> Option<String> {
    let candidate = entry
        .thumbnail
        .clone()
        .filter(|url| !url.trim().is_empty())
        .or_else(|| {
            entry
                .media
                .iter()
                .find(|m| is_image_type(m.media_type.as_deref()) && !m.url.trim().is_empty())
                .map(|m| m.url.clone())
        })
        .or_else(|| {
            entry
                .links
                .iter()
                .find(|l| is_image_type(l.media_type.as_deref()) && !l.url.trim().is_empty())
                .map(|l| l.url.clone())
        })
        .or_else(|| entry.content_html.as_deref().and_then(first_img_src))
        .or_else(|| entry.summary_html.as_deref().and_then(first_img_src))?;

    let absolute = absolutize(candidate.trim(), &entry.link)?;
    validate_image_url(&absolute)
}

/// Resolve the image for a scraped document
///
/// Prefers the `og:image` meta tag, falling back to the first `<img>` anywhere.
pub fn resolve_document_image(html: &str, base_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let candidate = og_image(&document).or_else(|| {
        let selector = Selector::parse("img[src]").ok()?;
        document
            .select(&selector)
            .filter_map(|img| img.value().attr("src"))
            .map(str::trim)
            .find(|src| !src.is_empty())
            .map(str::to_string)
    })?;

    let absolute = absolutize(&candidate, base_url)?;
    validate_image_url(&absolute)
}

/// Check a candidate against the absolute-URL grammar
///
/// Accepts `http`, `https` and `ftp` URLs whose host is a dotted domain name,
/// `localhost`, or an IP address.
pub fn validate_image_url(candidate: &str) -> Option<String> {
    let parsed = Url::parse(candidate.trim()).ok()?;
    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return None;
    }

    let host_ok = match parsed.host()? {
        Host::Domain(domain) => is_valid_domain(domain),
        Host::Ipv4(_) | Host::Ipv6(_) => true,
    };

    host_ok.then(|| parsed.to_string())
}

fn og_image(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta").ok()?;
    document.select(&selector).find_map(|meta| {
        let element = meta.value();
        let key = element.attr("property").or_else(|| element.attr("name"))?;
        if !key.eq_ignore_ascii_case("og:image") {
            return None;
        }
        element
            .attr("content")
            .map(str::trim)
            .filter(|content| !content.is_empty())
            .map(str::to_string)
    })
}

fn first_img_src(html: &str) -> Option<String> {
    let fragment = Html::parse_fragment(html);
    let selector = Selector::parse("img").ok()?;
    fragment
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

fn is_image_type(media_type: Option<&str>) -> bool {
    media_type.is_some_and(|t| t.trim().to_ascii_lowercase().starts_with("image/"))
}

fn absolutize(candidate: &str, base: &str) -> Option<String> {
    if !candidate.starts_with('/') {
        return Some(candidate.to_string());
    }
    let base = Url::parse(base).ok()?;
    base.join(candidate).ok().map(|u| u.to_string())
}

fn is_valid_domain(domain: &str) -> bool {
    if domain.eq_ignore_ascii_case("localhost") {
        return true;
    }

    let domain = domain.strip_suffix('.').unwrap_or(domain);
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && !tld.chars().all(|c| c.is_ascii_digit()));

    labels_ok && tld_ok
}
