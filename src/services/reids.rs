//! Thread-id harvesting from a board's listing pages.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{AppError, Result};
use crate::models::{BoardStatus, ThreadRef};
use crate::pipeline::pool::WorkerPool;
use crate::services::StageContext;
use crate::services::parse::{self, Patterns};
use crate::storage::{BoardStorage, ReidStorage};
use crate::utils::retry::RetryingFetch;
use crate::utils::set::SharedSet;
use crate::utils::url::SiteUrls;

/// Outcome of harvesting one board.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarvestSummary {
    pub board: String,
    /// Listing pages scheduled
    pub pages: usize,
    pub failed_pages: usize,
    /// Distinct thread ids seen on the listing pages
    pub threads: usize,
    /// Ids that were not pending before this run
    pub queued: usize,
    /// The board was already harvested and nothing was fetched
    pub skipped: bool,
    /// The board is now marked harvested
    pub harvested: bool,
}

/// Fills one board's pending set from its listing pages.
pub struct ReidHarvester {
    board: String,
    fetch: RetryingFetch,
    urls: SiteUrls,
    patterns: Patterns,
    pool: WorkerPool,
    items_per_page: usize,
    title_prefix_len: usize,
    boards: BoardStorage,
    reids: ReidStorage,
}

impl ReidHarvester {
    pub async fn open(ctx: &StageContext, board: &str) -> Result<Self> {
        let store = ctx.backends.key_value().await?;
        Ok(Self {
            board: board.to_string(),
            fetch: ctx.retrying_fetch(),
            urls: ctx.urls(),
            patterns: ctx.patterns()?,
            pool: ctx.pool(),
            items_per_page: ctx.config.site.items_per_page,
            title_prefix_len: ctx.config.site.title_prefix_len,
            boards: BoardStorage::new(Arc::clone(&store)),
            reids: ReidStorage::new(store, board),
        })
    }

    pub fn board(&self) -> &str {
        &self.board
    }

    /// Number of full listing pages announced on the board's first page.
    pub async fn fetch_initial_total(&self) -> Result<usize> {
        let html = self.fetch.fetch(&self.urls.board_initial(&self.board)).await?;
        let threads = self.patterns.thread_total(&html)?;
        let pages = parse::listing_pages(threads, self.items_per_page);
        log::info!(
            "{}: {} threads on {} listing pages",
            self.board,
            threads,
            pages
        );
        Ok(pages)
    }

    /// Harvest every listing page of the board into its pending set.
    ///
    /// A harvested board is skipped. The board is marked harvested only
    /// when every page was fetched, parsed and stored.
    pub async fn harvest(&self) -> Result<HarvestSummary> {
        let mut summary = HarvestSummary {
            board: self.board.clone(),
            ..HarvestSummary::default()
        };

        if !self.boards.contains(&self.board).await? {
            return Err(AppError::validation(format!(
                "unknown board '{}'; run `boards` first",
                self.board
            )));
        }

        if self.boards.status(&self.board).await? == BoardStatus::Harvested {
            log::info!("{}: already harvested, skipping", self.board);
            summary.skipped = true;
            summary.harvested = true;
            return Ok(summary);
        }

        let pages = self.fetch_initial_total().await?;
        let seen = SharedSet::new();
        let queued = AtomicUsize::new(0);

        let label = format!("{} listing", self.board);
        let report = self
            .pool
            .run(&label, (1..=pages).collect(), |page: usize| {
                self.harvest_page(page, &seen, &queued)
            })
            .await;

        summary.pages = pages;
        summary.failed_pages = report.failed;
        summary.threads = seen.len();
        summary.queued = queued.load(Ordering::Relaxed);

        if report.is_complete(pages) {
            self.boards
                .set_status(&self.board, BoardStatus::Harvested)
                .await?;
            summary.harvested = true;
            log::info!(
                "{}: harvested {} threads, {} newly pending",
                self.board,
                summary.threads,
                summary.queued
            );
        } else if report.cancelled {
            log::warn!("{}: harvest interrupted, board stays pending", self.board);
        } else {
            log::warn!(
                "{}: {} of {} listing pages failed, board stays pending",
                self.board,
                report.failed,
                pages
            );
        }

        Ok(summary)
    }

    async fn harvest_page(
        &self,
        page: usize,
        seen: &SharedSet,
        queued: &AtomicUsize,
    ) -> Result<()> {
        let url = self.urls.listing(&self.board, page);
        let html = self.fetch.fetch(&url).await?;
        let rows = parse::listing(&html, self.title_prefix_len)?;
        log::debug!("{}: page {} lists {} threads", self.board, page, rows.len());

        let threads: Vec<ThreadRef> = rows
            .into_iter()
            .filter(|row| seen.insert(&row.thread_id))
            .map(|row| ThreadRef {
                thread_id: row.thread_id,
                title: row.title,
                author: row.author,
                section: self.board.clone(),
            })
            .collect();

        let added = self.reids.stage(&threads).await?;
        queued.fetch_add(added, Ordering::Relaxed);
        Ok(())
    }

    /// Release the store handles taken at `open`.
    pub fn close(self) {
        drop(self.boards);
        drop(self.reids);
        log::debug!("{}: harvester closed", self.board);
    }
}
