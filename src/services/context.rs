//! Shared wiring handed to every stage.

use std::sync::Arc;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::pool::WorkerPool;
use crate::services::parse::Patterns;
use crate::storage::Backends;
use crate::utils::http::PageFetcher;
use crate::utils::retry::{RetryPolicy, RetryingFetch};
use crate::utils::shutdown::Shutdown;
use crate::utils::url::SiteUrls;

/// Configuration, network client, store factory and shutdown signal.
///
/// Cheap to clone; stages take what they need at `open`.
#[derive(Clone)]
pub struct StageContext {
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub backends: Arc<dyn Backends>,
    pub shutdown: Shutdown,
    workers: usize,
}

impl StageContext {
    pub fn new(
        config: Arc<Config>,
        fetcher: Arc<dyn PageFetcher>,
        backends: Arc<dyn Backends>,
        shutdown: Shutdown,
    ) -> Self {
        let workers = config.workers();
        Self {
            config,
            fetcher,
            backends,
            shutdown,
            workers,
        }
    }

    /// Override the configured worker count (`--nthreads`).
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        if let Some(n) = workers {
            self.workers = n.max(1);
        }
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn retrying_fetch(&self) -> RetryingFetch {
        RetryingFetch::new(
            Arc::clone(&self.fetcher),
            RetryPolicy::from(&self.config.retry),
            self.shutdown.clone(),
            self.config.crawler.shutdown_grace(),
        )
    }

    pub fn pool(&self) -> WorkerPool {
        WorkerPool::new(self.workers, self.shutdown.clone())
    }

    pub fn urls(&self) -> SiteUrls {
        SiteUrls::new(&self.config.site.base_url)
    }

    pub fn patterns(&self) -> Result<Patterns> {
        Patterns::compile(&self.config.site)
    }
}
