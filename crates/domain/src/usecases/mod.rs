//! Application use cases / business logic

pub mod aggregate;
pub mod compose;
pub mod fallback;
pub mod pipeline;
pub mod select;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{AggregateConfig, Aggregator, DEFAULT_RUMOR_KEYWORDS, RUMOR_WINDOW};
pub use compose::{Composer, generate_hashtags};
pub use fallback::{
    DEFAULT_FALLBACK_MESSAGE, FallbackChain, FallbackProvider, RUMOR_HEADER, RumorDigestProvider,
    StatOfTheDayProvider, StaticMessageProvider,
};
pub use pipeline::{Pipeline, PipelineConfig};
pub use select::{ItemSelector, SelectConfig, TieBreak};
