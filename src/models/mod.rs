// src/models/mod.rs

//! Domain models for the archiver.

mod board;
mod config;
mod post;
mod thread;

// Re-export all public types
pub use board::{Board, BoardStatus};
pub use config::{
    Config, CrawlerConfig, DocumentBackend, RetryConfig, SiteConfig, StorageConfig,
};
pub use post::ArchivedPost;
pub use thread::ThreadRef;
