// src/pipeline/boards.rs

//! Board discovery command.

use chrono::Utc;

use crate::error::Result;
use crate::services::{BoardCatalog, StageContext};

/// Register every board listed on the site's board index.
pub async fn run_boards(ctx: &StageContext) -> Result<usize> {
    let start_time = Utc::now();
    log::info!("Discovering boards...");

    let catalog = BoardCatalog::open(ctx).await?;
    let result = catalog.fetch_boards().await;
    catalog.close();
    let count = result?;

    let elapsed = Utc::now() - start_time;
    log::info!(
        "Board discovery complete: {} boards in {}s",
        count,
        elapsed.num_seconds()
    );
    Ok(count)
}
