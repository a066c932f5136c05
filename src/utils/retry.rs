//! Bounded, cancellable retries around a `PageFetcher`.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::RetryConfig;
use crate::utils::http::PageFetcher;
use crate::utils::shutdown::Shutdown;

/// Attempt budget and fixed backoff.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub delay: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: config.delay(),
        }
    }
}

/// Fetches pages, retrying transport failures up to the policy's budget.
///
/// Shutdown is checked before every attempt and while backing off. A request
/// already in flight when shutdown is requested gets `grace` to complete.
#[derive(Clone)]
pub struct RetryingFetch {
    fetcher: Arc<dyn PageFetcher>,
    policy: RetryPolicy,
    shutdown: Shutdown,
    grace: Duration,
}

impl RetryingFetch {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        policy: RetryPolicy,
        shutdown: Shutdown,
        grace: Duration,
    ) -> Self {
        Self {
            fetcher,
            policy,
            shutdown,
            grace,
        }
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Fetch `url`, returning its body.
    ///
    /// Non-transport errors are returned as-is. When the budget runs out the
    /// result is `AppError::RetriesExhausted`.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            if self.shutdown.is_requested() {
                return Err(AppError::cancelled(format!("fetch of {url}")));
            }
            attempt += 1;

            let error = match self.attempt(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transport() => e,
                Err(e) => return Err(e),
            };

            if attempt >= self.policy.max_attempts {
                return Err(AppError::RetriesExhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last: error.to_string(),
                });
            }

            log::warn!(
                "Retrying {} (attempt {}/{}) after: {}",
                url,
                attempt + 1,
                self.policy.max_attempts,
                error
            );

            tokio::select! {
                _ = tokio::time::sleep(self.policy.delay) => {}
                _ = self.shutdown.requested() => {
                    return Err(AppError::cancelled(format!("retry of {url}")));
                }
            }
        }
    }

    async fn attempt(&self, url: &str) -> Result<String> {
        let deadline = async {
            self.shutdown.requested().await;
            tokio::time::sleep(self.grace).await;
        };
        tokio::select! {
            result = self.fetcher.fetch(url) => result,
            _ = deadline => Err(AppError::cancelled(format!(
                "{url} still in flight after the shutdown grace period"
            ))),
        }
    }
}
