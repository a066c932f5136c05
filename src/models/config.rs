//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client and worker settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Retry policy for page fetches
    #[serde(default)]
    pub retry: RetryConfig,

    /// Store addresses
    #[serde(default)]
    pub storage: StorageConfig,

    /// Upstream site layout
    #[serde(default)]
    pub site: SiteConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.workers == Some(0) {
            return Err(AppError::validation("crawler.workers must be > 0"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }
        if self.storage.redis.trim().is_empty() {
            return Err(AppError::validation("storage.redis is empty"));
        }
        match self.storage.backend {
            DocumentBackend::Mongo => {
                if !self.storage.mongo.starts_with("mongodb://")
                    && !self.storage.mongo.starts_with("mongodb+srv://")
                {
                    return Err(AppError::validation(
                        "storage.mongo must be a mongodb:// or mongodb+srv:// URI",
                    ));
                }
                if self.storage.database.trim().is_empty() {
                    return Err(AppError::validation("storage.database is empty"));
                }
            }
            DocumentBackend::Files => {
                if self.storage.documents.trim().is_empty() {
                    return Err(AppError::validation("storage.documents is empty"));
                }
            }
        }
        if self.site.items_per_page == 0 {
            return Err(AppError::validation("site.items_per_page must be > 0"));
        }
        url::Url::parse(&self.site.base_url)?;
        Ok(())
    }

    /// Worker count, falling back to the available hardware parallelism.
    pub fn workers(&self) -> usize {
        self.crawler.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

/// HTTP client and worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Session cookie sent with every request
    #[serde(default)]
    pub cookie: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Concurrent workers per stage (hardware parallelism when unset)
    #[serde(default)]
    pub workers: Option<usize>,

    /// How long an in-flight request may run after shutdown is requested
    #[serde(default = "defaults::shutdown_grace")]
    pub shutdown_grace_secs: u64,

    /// Skip TLS certificate verification (the legacy site serves an old chain)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl CrawlerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            cookie: String::new(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            workers: None,
            shutdown_grace_secs: defaults::shutdown_grace(),
            accept_invalid_certs: false,
        }
    }
}

/// Bounded retry policy for page fetches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per URL, including the first
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub delay_ms: u64,
}

impl RetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            delay_ms: defaults::retry_delay(),
        }
    }
}

/// Which store receives archived posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentBackend {
    /// MongoDB, one collection per board
    #[default]
    Mongo,
    /// Local directory tree, one directory per board
    Files,
}

/// Store addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Redis connection URL for work queues and metadata
    #[serde(default = "defaults::redis")]
    pub redis: String,

    /// Document store for archived posts
    #[serde(default)]
    pub backend: DocumentBackend,

    /// MongoDB connection URI
    #[serde(default = "defaults::mongo")]
    pub mongo: String,

    /// MongoDB database holding the board collections
    #[serde(default = "defaults::database")]
    pub database: String,

    /// Root directory of the `files` backend
    #[serde(default = "defaults::documents")]
    pub documents: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            redis: defaults::redis(),
            backend: DocumentBackend::default(),
            mongo: defaults::mongo(),
            database: defaults::database(),
            documents: defaults::documents(),
        }
    }
}

/// Upstream site layout: where pages live and how counts are read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site root, without trailing slash
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Threads per listing page
    #[serde(default = "defaults::items_per_page")]
    pub items_per_page: usize,

    /// Bytes of marker prefix in front of every listing title
    #[serde(default = "defaults::title_prefix_len")]
    pub title_prefix_len: usize,

    /// Pattern on a board's first page; group 1 is the thread total
    #[serde(default = "defaults::board_total_pattern")]
    pub board_total_pattern: String,

    /// Pattern on a thread's first page; group 2 is the page total
    #[serde(default = "defaults::post_pages_pattern")]
    pub post_pages_pattern: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            items_per_page: defaults::items_per_page(),
            title_prefix_len: defaults::title_prefix_len(),
            board_total_pattern: defaults::board_total_pattern(),
            post_pages_pattern: defaults::post_pages_pattern(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; bbs-archiver/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn shutdown_grace() -> u64 {
        10
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        5
    }
    pub fn retry_delay() -> u64 {
        1000
    }

    // Storage defaults
    pub fn redis() -> String {
        "redis://127.0.0.1:6379".into()
    }
    pub fn mongo() -> String {
        "mongodb://127.0.0.1:27017".into()
    }
    pub fn database() -> String {
        "sjtubbs".into()
    }
    pub fn documents() -> String {
        "archive".into()
    }

    // Site defaults
    pub fn base_url() -> String {
        "https://bbs.sjtu.edu.cn".into()
    }
    pub fn items_per_page() -> usize {
        20
    }
    pub fn title_prefix_len() -> usize {
        3
    }
    pub fn board_total_pattern() -> String {
        r"主题(\d+)个".into()
    }
    pub fn post_pages_pattern() -> String {
        r"本主题共有 (\d+) 篇文章，分 (\d+) 页, 当前显示第 (\d+) 页".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.crawler.workers = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.site.base_url = "not a url".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            cookie = "sid=abc"
            workers = 8

            [storage]
            redis = "redis://cache:6379"
            "#,
        )
        .unwrap();
        assert_eq!(config.crawler.cookie, "sid=abc");
        assert_eq!(config.workers(), 8);
        assert_eq!(config.storage.redis, "redis://cache:6379");
        assert_eq!(config.storage.backend, DocumentBackend::Mongo);
        assert_eq!(config.storage.database, "sjtubbs");
        assert_eq!(config.storage.documents, "archive");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.site.items_per_page, 20);
    }

    #[test]
    fn files_backend_needs_only_a_directory() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            backend = "files"
            documents = "/var/lib/bbs"
            mongo = ""
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.backend, DocumentBackend::Files);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_mongo_uri() {
        let mut config = Config::default();
        config.storage.mongo = "redis://127.0.0.1:6379".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn workers_default_to_parallelism() {
        assert!(Config::default().workers() >= 1);
    }

    #[test]
    fn example_config_matches_defaults() {
        let config: Config = toml::from_str(include_str!("../../config.example.toml")).unwrap();
        config.validate().unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.site.board_total_pattern, defaults.board_total_pattern);
        assert_eq!(config.site.post_pages_pattern, defaults.post_pages_pattern);
        assert_eq!(config.retry.delay_ms, RetryConfig::default().delay_ms);
    }
}
