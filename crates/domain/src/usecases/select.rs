//! Selection use case - pick unposted, substantive items, image items first

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::NewsItem;
use crate::ports::PostedLinkStore;

/// How to choose among items that tie on every ranking criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep ranking order (reproducible)
    #[default]
    First,
    /// Pick uniformly among the leading ties; only applies when selecting one item
    Random,
}

/// Configuration for the selector
#[derive(Debug, Clone)]
pub struct SelectConfig {
    /// Titles shorter than this (in characters) are treated as stubs
    pub min_title_chars: usize,
    pub tie_break: TieBreak,
}

impl Default for SelectConfig {
    fn default() -> Self {
        Self {
            min_title_chars: 20,
            tie_break: TieBreak::First,
        }
    }
}

/// Selector/ranker over aggregated items
#[derive(Debug, Clone, Default)]
pub struct ItemSelector {
    config: SelectConfig,
}

impl ItemSelector {
    pub fn new(config: SelectConfig) -> Self {
        Self { config }
    }

    /// Choose up to `k` items not yet in the store
    ///
    /// Items with an image come first; each group is ordered newest first.
    /// A failed store lookup drops the item rather than risk a repost.
    pub async fn select<St>(&self, items: Vec<NewsItem>, k: usize, store: &St) -> Vec<NewsItem>
    where
        St: PostedLinkStore + ?Sized,
    {
        if k == 0 {
            return vec![];
        }

        let mut with_image = Vec::new();
        let mut without_image = Vec::new();

        for item in items {
            if item.title_chars() < self.config.min_title_chars {
                tracing::debug!(link = %item.link, title = %item.title, "Skipping stub title");
                continue;
            }

            match store.contains(&item.link).await {
                Ok(true) => {
                    tracing::debug!(link = %item.link, "Already posted");
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(link = %item.link, error = %e, "Posted-link lookup failed, skipping item");
                    continue;
                }
            }

            if item.has_image() {
                with_image.push(item);
            } else {
                without_image.push(item);
            }
        }

        with_image.sort_by(|a, b| b.published.cmp(&a.published));
        without_image.sort_by(|a, b| b.published.cmp(&a.published));

        let mut ranked: Vec<NewsItem> = with_image.into_iter().chain(without_image).collect();

        if k == 1 && self.config.tie_break == TieBreak::Random && ranked.len() > 1 {
            let ties = leading_ties(&ranked);
            if ties > 1 {
                let pick = rand::rng().random_range(0..ties);
                return vec![ranked.swap_remove(pick)];
            }
        }

        ranked.truncate(k);
        tracing::info!(selected = ranked.len(), requested = k, "Selected items");
        ranked
    }
}

fn leading_ties(ranked: &[NewsItem]) -> usize {
    let Some(first) = ranked.first() else {
        return 0;
    };
    ranked
        .iter()
        .take_while(|i| i.has_image() == first.has_image() && i.published == first.published)
        .count()
}
