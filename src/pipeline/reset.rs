// src/pipeline/reset.rs

//! Explicit reset of boards for a fresh harvest.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::BoardStatus;
use crate::services::StageContext;
use crate::storage::{BoardStorage, ReidStorage};

use super::require_boards;

/// Clear each board's pending set and mark it pending again.
///
/// Archived documents and thread payloads are left alone.
pub async fn run_reset(ctx: &StageContext, boards: &[String]) -> Result<()> {
    require_boards(boards)?;
    let store = ctx.backends.key_value().await?;
    let catalog = BoardStorage::new(Arc::clone(&store));

    for board in boards {
        if !catalog.contains(board).await? {
            return Err(AppError::validation(format!("unknown board '{board}'")));
        }
    }

    for board in boards {
        let reids = ReidStorage::new(Arc::clone(&store), board);
        let dropped = reids.pending().len().await?;
        reids.reset().await?;
        catalog.set_status(board, BoardStatus::Pending).await?;
        log::info!("{}: reset, {} pending ids dropped", board, dropped);
    }
    Ok(())
}
