//! Archiving of pending threads.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{AppError, Result};
use crate::models::ArchivedPost;
use crate::pipeline::pool::WorkerPool;
use crate::services::StageContext;
use crate::services::parse::Patterns;
use crate::storage::{BoardStorage, DocumentStore, InsertOutcome, ReidStorage};
use crate::utils::retry::RetryingFetch;
use crate::utils::url::SiteUrls;

/// Outcome of archiving one board's pending threads.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchSummary {
    pub board: String,
    /// Threads pending when the run started
    pub pending: usize,
    pub archived: usize,
    /// Threads found already archived; drained from the pending set
    pub duplicates: usize,
    /// Threads left pending for the next run
    pub failed: usize,
    pub cancelled: bool,
}

/// Downloads every pending thread of a board into its document collection.
pub struct PostFetcher {
    board: String,
    fetch: RetryingFetch,
    urls: SiteUrls,
    patterns: Patterns,
    pool: WorkerPool,
    reids: ReidStorage,
    documents: Arc<dyn DocumentStore>,
}

impl PostFetcher {
    /// Open the stage for `board`.
    ///
    /// Fails with `Validation` when the board is not in the board set; no
    /// request is made and no collection is created in that case.
    pub async fn open(ctx: &StageContext, board: &str) -> Result<Self> {
        let store = ctx.backends.key_value().await?;
        if !BoardStorage::new(Arc::clone(&store)).contains(board).await? {
            return Err(AppError::validation(format!(
                "unknown board '{board}'; run `boards` first"
            )));
        }

        Ok(Self {
            board: board.to_string(),
            fetch: ctx.retrying_fetch(),
            urls: ctx.urls(),
            patterns: ctx.patterns()?,
            pool: ctx.pool(),
            reids: ReidStorage::new(store, board),
            documents: ctx.backends.documents(board).await?,
        })
    }

    pub fn board(&self) -> &str {
        &self.board
    }

    /// Archive every pending thread of the board.
    ///
    /// A thread that fails stays pending and is logged; the others go on.
    pub async fn run(&self) -> Result<FetchSummary> {
        let ids = self.reids.pending().list().await?;
        let mut summary = FetchSummary {
            board: self.board.clone(),
            pending: ids.len(),
            ..FetchSummary::default()
        };

        if ids.is_empty() {
            log::info!("{}: no pending threads", self.board);
            return Ok(summary);
        }
        log::info!("{}: archiving {} pending threads", self.board, ids.len());

        let archived = AtomicUsize::new(0);
        let duplicates = AtomicUsize::new(0);
        let label = format!("{} threads", self.board);

        let report = self
            .pool
            .run(&label, ids, |thread_id: String| {
                let archived = &archived;
                let duplicates = &duplicates;
                async move {
                    match self.retrieve_one(&thread_id).await? {
                        InsertOutcome::Inserted => archived.fetch_add(1, Ordering::Relaxed),
                        InsertOutcome::Duplicate => {
                            log::debug!("{}: {} already archived", self.board, thread_id);
                            duplicates.fetch_add(1, Ordering::Relaxed)
                        }
                    };
                    Ok(())
                }
            })
            .await;

        summary.archived = archived.load(Ordering::Relaxed);
        summary.duplicates = duplicates.load(Ordering::Relaxed);
        summary.failed = report.failed;
        summary.cancelled = report.cancelled;

        log::info!(
            "{}: {} archived, {} already archived, {} failed",
            self.board,
            summary.archived,
            summary.duplicates,
            summary.failed
        );
        if summary.cancelled {
            log::warn!("{}: interrupted, unfinished threads stay pending", self.board);
        }
        Ok(summary)
    }

    /// Download, store and dequeue one thread.
    ///
    /// The id leaves the pending set only after the document is stored (or
    /// found already stored).
    pub async fn retrieve_one(&self, thread_id: &str) -> Result<InsertOutcome> {
        let pages = self.fetch_pages(thread_id).await?;
        let meta = self.reids.payload(thread_id).await?;

        let post = ArchivedPost {
            thread_id: thread_id.to_string(),
            title: meta.title,
            section: meta.section,
            pages,
        };
        let outcome = self.documents.insert(&post).await?;
        self.reids.complete(thread_id).await?;
        Ok(outcome)
    }

    /// Every content page of a thread, in page order.
    ///
    /// The first page announces the total; its body is kept as page 1.
    async fn fetch_pages(&self, thread_id: &str) -> Result<Vec<String>> {
        let first = self
            .fetch
            .fetch(&self.urls.thread_page(&self.board, thread_id, 1))
            .await?;
        let total = self.patterns.page_total(&first)?;
        log::debug!("{}: thread {} has {} pages", self.board, thread_id, total);

        let mut pages = Vec::with_capacity(total.max(1));
        pages.push(first);
        for page in 2..=total {
            let url = self.urls.thread_page(&self.board, thread_id, page);
            pages.push(self.fetch.fetch(&url).await?);
        }
        Ok(pages)
    }

    /// Release the store handles taken at `open`.
    pub fn close(self) {
        drop(self.reids);
        drop(self.documents);
        log::debug!("{}: post fetcher closed", self.board);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ThreadRef;
    use crate::storage::{KeyValueStore, MemoryBackends};
    use crate::testing::{
        ScriptedFetcher, site_urls, stage_context, stage_context_with_shutdown, thread_page_html,
    };
    use crate::utils::shutdown;

    const BOARD: &str = "Linux";

    async fn seed(backends: &MemoryBackends, ids: &[&str]) {
        let store: Arc<dyn KeyValueStore> = Arc::new(backends.store());
        BoardStorage::new(Arc::clone(&store))
            .register(BOARD)
            .await
            .unwrap();
        let threads: Vec<ThreadRef> = ids
            .iter()
            .map(|id| ThreadRef {
                thread_id: id.to_string(),
                title: format!("title {id}"),
                author: "alice".into(),
                section: BOARD.into(),
            })
            .collect();
        ReidStorage::new(store, BOARD).stage(&threads).await.unwrap();
    }

    fn script_thread(fetcher: &ScriptedFetcher, id: &str, pages: usize) {
        for page in 1..=pages {
            fetcher.page(
                site_urls().thread_page(BOARD, id, page),
                thread_page_html(pages, page, &format!("{id} body {page}")),
            );
        }
    }

    async fn fetch_posts(
        fetcher: &Arc<ScriptedFetcher>,
        backends: &MemoryBackends,
    ) -> FetchSummary {
        let posts = PostFetcher::open(&stage_context(fetcher, backends), BOARD)
            .await
            .unwrap();
        let summary = posts.run().await.unwrap();
        posts.close();
        summary
    }

    fn pending(backends: &MemoryBackends) -> ReidStorage {
        ReidStorage::new(Arc::new(backends.store()), BOARD)
    }

    #[tokio::test]
    async fn archives_every_page_in_order() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        script_thread(&fetcher, "12345", 3);
        let backends = MemoryBackends::new();
        seed(&backends, &["12345"]).await;

        let summary = fetch_posts(&fetcher, &backends).await;
        assert_eq!(summary.archived, 1);
        assert_eq!(summary.failed, 0);

        let urls: Vec<String> = (1..=3)
            .map(|p| site_urls().thread_page(BOARD, "12345", p))
            .collect();
        assert_eq!(fetcher.calls(), urls);

        let doc = backends.collection(BOARD).get("12345").unwrap();
        assert_eq!(doc.title, "title 12345");
        assert_eq!(doc.section, BOARD);
        assert_eq!(doc.pages.len(), 3);
        for (i, body) in doc.pages.iter().enumerate() {
            assert!(body.contains(&format!("12345 body {}", i + 1)));
        }
        assert!(!pending(&backends).pending().contains("12345").await.unwrap());
    }

    #[tokio::test]
    async fn unknown_board_makes_no_requests() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let backends = MemoryBackends::new();

        let result = PostFetcher::open(&stage_context(&fetcher, &backends), "Nowhere").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_thread_stays_pending_until_next_run() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        script_thread(&fetcher, "100", 2);
        script_thread(&fetcher, "200", 1);
        fetcher.fail_times(site_urls().thread_page(BOARD, "100", 2), 5);
        let backends = MemoryBackends::new();
        seed(&backends, &["100", "200"]).await;

        let summary = fetch_posts(&fetcher, &backends).await;
        assert_eq!(summary.archived, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(pending(&backends).pending().list().await.unwrap(), vec!["100"]);
        assert!(backends.collection(BOARD).get("100").is_none());

        let summary = fetch_posts(&fetcher, &backends).await;
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.archived, 1);
        assert!(pending(&backends).pending().list().await.unwrap().is_empty());
        assert_eq!(backends.collection(BOARD).count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn already_archived_thread_is_drained() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        script_thread(&fetcher, "300", 1);
        let backends = MemoryBackends::new();
        seed(&backends, &["300"]).await;
        let existing = ArchivedPost {
            thread_id: "300".into(),
            title: "title 300".into(),
            section: BOARD.into(),
            pages: vec!["old".into()],
        };
        backends.collection(BOARD).insert(&existing).await.unwrap();

        let summary = fetch_posts(&fetcher, &backends).await;
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.archived, 0);
        assert!(pending(&backends).pending().list().await.unwrap().is_empty());
        assert_eq!(backends.collection(BOARD).get("300").unwrap().pages, vec!["old"]);
    }

    #[tokio::test]
    async fn missing_page_total_fails_the_thread() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.page(site_urls().thread_page(BOARD, "400", 1), "<html>deleted</html>");
        let backends = MemoryBackends::new();
        seed(&backends, &["400"]).await;

        let summary = fetch_posts(&fetcher, &backends).await;
        assert_eq!(summary.failed, 1);
        assert!(pending(&backends).pending().contains("400").await.unwrap());
    }

    #[tokio::test]
    async fn missing_payload_fails_the_thread() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        script_thread(&fetcher, "500", 1);
        let backends = MemoryBackends::new();
        seed(&backends, &[]).await;
        pending(&backends)
            .pending()
            .add(&["500".to_string()])
            .await
            .unwrap();

        let summary = fetch_posts(&fetcher, &backends).await;
        assert_eq!(summary.failed, 1);
        assert!(pending(&backends).pending().contains("500").await.unwrap());
        assert!(backends.collection(BOARD).get("500").is_none());
    }

    #[tokio::test]
    async fn shutdown_mid_run_leaves_unfinished_threads_pending() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let ids: Vec<String> = (601..=610).map(|i: u32| i.to_string()).collect();
        for id in &ids {
            script_thread(&fetcher, id, 1);
        }
        let backends = MemoryBackends::new();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        seed(&backends, &id_refs).await;

        let (trigger, shutdown) = shutdown::channel();
        fetcher.shutdown_on_call(1, trigger);
        let ctx = stage_context_with_shutdown(&fetcher, &backends, shutdown);
        let posts = PostFetcher::open(&ctx, BOARD).await.unwrap();
        let summary = posts.run().await.unwrap();
        posts.close();

        assert!(summary.cancelled);
        assert_eq!(summary.pending, 10);
        assert!(summary.archived < 10);
        let left = pending(&backends).pending().list().await.unwrap();
        assert_eq!(left.len(), 10 - summary.archived);
        for id in &left {
            assert!(backends.collection(BOARD).get(id).is_none());
            // payloads survive for the next run
            assert!(pending(&backends).payload(id).await.is_ok());
        }

        let summary = fetch_posts(&fetcher, &backends).await;
        assert!(!summary.cancelled);
        assert_eq!(summary.archived, left.len());
        assert!(pending(&backends).pending().list().await.unwrap().is_empty());
        assert_eq!(backends.collection(BOARD).count().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn close_releases_the_store_handles() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let backends = MemoryBackends::new();
        seed(&backends, &[]).await;
        let ctx = stage_context(&fetcher, &backends);
        let before = backends.open_handles();

        let posts = PostFetcher::open(&ctx, BOARD).await.unwrap();
        assert!(backends.open_handles() > before);
        posts.close();
        assert_eq!(backends.open_handles(), before);
    }
}
