//! Composition use case - turn selected items into budget-safe post text

use crate::model::{ComposedPost, HashtagPolicy, Layout, NewsItem, Style};
use crate::text::{char_len, hard_truncate, truncate_words};

/// Maximum number of generated hashtags
pub const MAX_HASHTAGS: usize = 3;
/// Minimum word length (characters) for a generated hashtag
pub const MIN_HASHTAG_WORD_CHARS: usize = 5;

const SINGLE_TITLE_ALLOWANCE: usize = 200;
const DIGEST_TITLE_ALLOWANCE: usize = 90;
const LINK_PREFIX: &str = "🔗 ";

/// Composer for a fixed style
#[derive(Debug, Clone)]
pub struct Composer {
    style: Style,
}

impl Composer {
    pub fn new(style: Style) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Compose a post from the given items; `None` when there are none
    ///
    /// The returned text never exceeds the style's character budget.
    pub fn compose(&self, items: &[NewsItem]) -> Option<ComposedPost> {
        if items.is_empty() {
            return None;
        }

        let budget = self.style.max_chars;
        let hashtags = self.hashtag_line(items);
        let allowance = match self.style.layout {
            Layout::Digest => DIGEST_TITLE_ALLOWANCE,
            Layout::Single | Layout::HeadlineOnly => SINGLE_TITLE_ALLOWANCE,
        };

        let titles: Vec<String> = items
            .iter()
            .map(|i| truncate_words(&i.title, allowance))
            .collect();
        let mut text = self.assemble(items, &titles, &hashtags);

        if char_len(&text) > budget {
            // Split what the fixed text leaves over evenly between titles
            let blank = vec![String::new(); items.len()];
            let fixed = char_len(&self.assemble(items, &blank, &hashtags));
            let per_item = (budget.saturating_sub(fixed) / items.len()).min(allowance);

            let titles: Vec<String> = items
                .iter()
                .map(|i| truncate_words(&i.title, per_item))
                .collect();
            text = self.assemble(items, &titles, &hashtags);

            if char_len(&text) > budget {
                tracing::debug!(
                    length = char_len(&text),
                    budget = budget,
                    "Post still over budget, hard truncating"
                );
                text = hard_truncate(&text, budget);
            }
        }

        Some(ComposedPost {
            text,
            image_url: items.iter().find_map(|i| i.image_url.clone()),
            links: items.iter().map(|i| i.link.clone()).collect(),
        })
    }

    fn assemble(&self, items: &[NewsItem], titles: &[String], hashtags: &str) -> String {
        let mut lines: Vec<String> = Vec::new();

        if let Some(header) = &self.style.header {
            lines.push(header.clone());
        }

        match self.style.layout {
            Layout::Single => {
                let item = &items[0];
                lines.push(titles[0].clone());
                if !item.source.handle.is_empty() {
                    lines.push(format!("via {}", item.source.handle));
                }
                lines.push(format!("{}{}", LINK_PREFIX, item.link));
            }
            Layout::Digest => {
                for (n, (item, title)) in items.iter().zip(titles).enumerate() {
                    lines.push(format!("{}. {}", n + 1, title));
                    lines.push(format!("{}{}", LINK_PREFIX, item.link));
                }
            }
            Layout::HeadlineOnly => {
                lines.push(titles[0].clone());
            }
        }

        if !hashtags.is_empty() {
            lines.push(String::new());
            lines.push(hashtags.to_string());
        }

        lines.join("\n")
    }

    fn hashtag_line(&self, items: &[NewsItem]) -> String {
        let tags = match &self.style.hashtags {
            HashtagPolicy::Generated => generate_hashtags(&items[0].title),
            HashtagPolicy::Fixed(tags) => tags
                .iter()
                .map(|t| t.trim().trim_start_matches('#'))
                .filter(|t| !t.is_empty())
                .map(|t| format!("#{t}"))
                .collect(),
            HashtagPolicy::Disabled => vec![],
        };
        tags.join(" ")
    }
}

/// Derive hashtags from a headline
///
/// Alphabetic words of at least five characters, lowercased, first
/// occurrence wins, at most three.
pub fn generate_hashtags(headline: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();

    for word in headline.split(|c: char| !c.is_alphabetic()) {
        if char_len(word) < MIN_HASHTAG_WORD_CHARS {
            continue;
        }
        let tag = format!("#{}", word.to_lowercase());
        if !tags.contains(&tag) {
            tags.push(tag);
        }
        if tags.len() == MAX_HASHTAGS {
            break;
        }
    }

    tags
}
