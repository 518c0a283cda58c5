//! pitchwire adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `http`: reqwest-backed fetcher
//! - `feed`: RSS/Atom decoder (feed-rs)
//! - `extract`: meta-tag page extractor (scraper)
//! - `store`: file, SQLite and in-memory posted-link stores
//! - `x`: X (Twitter) API publisher
//! - `outbox`: JSONL review queue for require-approval mode

pub mod extract;
pub mod feed;
pub mod http;
pub mod outbox;
mod store_file;
mod store_memory;
mod store_sqlite;

pub mod x_api;

/// Re-exports for posted-link stores
pub mod store {
    pub use crate::store_file::FileLinkStore;
    pub use crate::store_memory::InMemoryLinkStore;
    pub use crate::store_sqlite::SqliteLinkStore;
}

/// Re-exports for X API adapters
pub mod x {
    pub use crate::x_api::{StubPublisher, XPublisher};
}
