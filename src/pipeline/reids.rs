// src/pipeline/reids.rs

//! Thread-id harvesting command.

use chrono::Utc;

use crate::error::Result;
use crate::services::{HarvestSummary, ReidHarvester, StageContext};

use super::require_boards;

/// Harvest the listing pages of each board in turn.
///
/// A board-level failure (unknown board, unreadable first page) aborts the
/// run; failed listing pages only leave their board pending.
pub async fn run_reids(ctx: &StageContext, boards: &[String]) -> Result<Vec<HarvestSummary>> {
    require_boards(boards)?;
    let start_time = Utc::now();
    log::info!(
        "Harvesting {} boards with {} workers",
        boards.len(),
        ctx.workers()
    );

    let mut summaries = Vec::with_capacity(boards.len());
    for (i, board) in boards.iter().enumerate() {
        log::info!("[{}/{}] Harvesting {}", i + 1, boards.len(), board);

        let harvester = ReidHarvester::open(ctx, board).await?;
        let result = harvester.harvest().await;
        harvester.close();
        summaries.push(result?);

        if ctx.shutdown.is_requested() {
            log::warn!("Shutdown requested, skipping remaining boards");
            break;
        }
    }

    let elapsed = Utc::now() - start_time;
    let pending = summaries.iter().filter(|s| !s.harvested).count();
    log::info!(
        "Harvest complete in {}s: {} boards, {} still pending",
        elapsed.num_seconds(),
        summaries.len(),
        pending
    );
    Ok(summaries)
}
