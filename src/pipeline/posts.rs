// src/pipeline/posts.rs

//! Thread archiving command.

use chrono::Utc;

use crate::error::Result;
use crate::services::{FetchSummary, PostFetcher, StageContext};

use super::reids::run_reids;
use super::require_boards;

/// Archive the pending threads of each board, optionally harvesting first.
pub async fn run_posts(
    ctx: &StageContext,
    boards: &[String],
    harvest_first: bool,
) -> Result<Vec<FetchSummary>> {
    require_boards(boards)?;

    if harvest_first {
        log::info!("Step 1/2: Harvesting thread ids...");
        run_reids(ctx, boards).await?;
        if ctx.shutdown.is_requested() {
            return Ok(Vec::new());
        }
        log::info!("Step 2/2: Archiving threads...");
    }

    let start_time = Utc::now();
    let mut summaries = Vec::with_capacity(boards.len());
    for (i, board) in boards.iter().enumerate() {
        log::info!("[{}/{}] Archiving {}", i + 1, boards.len(), board);

        let fetcher = PostFetcher::open(ctx, board).await?;
        let result = fetcher.run().await;
        fetcher.close();
        summaries.push(result?);

        if ctx.shutdown.is_requested() {
            log::warn!("Shutdown requested, skipping remaining boards");
            break;
        }
    }

    let elapsed = Utc::now() - start_time;
    let archived: usize = summaries.iter().map(|s| s.archived).sum();
    let failed: usize = summaries.iter().map(|s| s.failed).sum();
    log::info!(
        "Archiving complete in {}s: {} threads archived, {} left pending",
        elapsed.num_seconds(),
        archived,
        failed
    );
    Ok(summaries)
}
