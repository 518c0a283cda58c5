//! pitchwire domain crate
//!
//! This crate contains the core domain logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `image`: Image URL resolution for feed entries and documents
//! - `text`: HTML stripping and word-safe truncation helpers
//! - `usecases`: Aggregation, selection, composition, fallbacks and the pipeline

pub mod image;
pub mod model;
pub mod ports;
pub mod text;
pub mod usecases;

pub use model::*;
pub use ports::*;
