//! Bounded fan-out of work items across concurrent workers.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future;

use crate::error::Result;
use crate::utils::progress::Progress;
use crate::utils::shutdown::Shutdown;

/// Summary of one pool run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolReport {
    /// Items handed to workers
    pub submitted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Shutdown left items unhandled: never handed out, or dropped from the
    /// channel before a worker took them
    pub cancelled: bool,
}

impl PoolReport {
    /// Every item was handed out and handled successfully.
    pub fn is_complete(&self, total: usize) -> bool {
        !self.cancelled && self.failed == 0 && self.succeeded == total
    }
}

/// Fixed-size pool of workers fed through a bounded channel.
///
/// The coordinator pushes every item into a channel holding at most one
/// item per worker and closes it when done; each worker pulls until the
/// channel is closed and drained. `run` returns only after every worker has
/// exited. A failing item is logged and counted; it never stops the pool.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: usize,
    shutdown: Shutdown,
}

impl WorkerPool {
    pub fn new(workers: usize, shutdown: Shutdown) -> Self {
        Self {
            workers: workers.max(1),
            shutdown,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `handler` over `items` with at most `workers` in flight.
    pub async fn run<I, F, Fut>(&self, label: &str, items: Vec<I>, handler: F) -> PoolReport
    where
        I: fmt::Display,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let items_len = items.len();
        let progress = Progress::new(label, items_len);
        let succeeded = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let (tx, rx) = flume::bounded::<I>(self.workers);

        let shutdown = &self.shutdown;
        let handler = &handler;
        let progress = &progress;
        let succeeded = &succeeded;
        let failed = &failed;

        let coordinator = async move {
            let mut submitted = 0;
            for item in items {
                tokio::select! {
                    biased;
                    _ = shutdown.requested() => {
                        log::warn!(
                            "{}: shutdown requested, {} items not handed out",
                            label,
                            items_len - submitted
                        );
                        break;
                    }
                    sent = tx.send_async(item) => {
                        if sent.is_err() {
                            break;
                        }
                        submitted += 1;
                    }
                }
            }
            // dropping the sender closes the channel
            submitted
        };

        let workers: Vec<_> = (0..self.workers)
            .map(|id| {
                let rx = rx.clone();
                async move {
                    loop {
                        let item = tokio::select! {
                            biased;
                            _ = shutdown.requested() => break,
                            item = rx.recv_async() => match item {
                                Ok(item) => item,
                                Err(_) => break,
                            },
                        };

                        let name = item.to_string();
                        match handler(item).await {
                            Ok(()) => {
                                succeeded.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                                log::error!("{} [worker {}]: {} failed: {}", label, id, name, e);
                            }
                        }
                        progress.inc();
                    }
                }
            })
            .collect();
        drop(rx);

        let (submitted, _) = futures::join!(coordinator, future::join_all(workers));
        let succeeded = succeeded.load(Ordering::Relaxed);
        let failed = failed.load(Ordering::Relaxed);
        progress.finish();

        PoolReport {
            submitted,
            succeeded,
            failed,
            cancelled: submitted < items_len || succeeded + failed < submitted,
        }
    }
}
