// src/pipeline/info.rs

//! Per-board progress report.

use std::sync::Arc;

use crate::error::Result;
use crate::models::BoardStatus;
use crate::services::StageContext;
use crate::storage::{BoardStorage, ReidStorage};

/// Progress of one board across the stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardInfo {
    pub code: String,
    /// `None` when the board is not in the board set
    pub status: Option<BoardStatus>,
    pub pending: usize,
    pub archived: usize,
}

/// Report status, pending and archived counts for `boards`, or for every
/// known board when none are given.
pub async fn run_info(ctx: &StageContext, boards: &[String]) -> Result<Vec<BoardInfo>> {
    let store = ctx.backends.key_value().await?;
    let catalog = BoardStorage::new(Arc::clone(&store));

    let codes = if boards.is_empty() {
        catalog.list().await?
    } else {
        boards.to_vec()
    };
    log::info!("{} boards", codes.len());

    let mut report = Vec::with_capacity(codes.len());
    for code in codes {
        if !catalog.contains(&code).await? {
            log::warn!("{}: not a known board", code);
            report.push(BoardInfo {
                code,
                status: None,
                pending: 0,
                archived: 0,
            });
            continue;
        }

        let status = catalog.status(&code).await?;
        let pending = ReidStorage::new(Arc::clone(&store), &code)
            .pending()
            .len()
            .await?;
        let archived = ctx.backends.documents(&code).await?.count().await?;
        log::info!(
            "{:<16} {:<10} pending: {:<6} archived: {}",
            code,
            status.as_str(),
            pending,
            archived
        );

        report.push(BoardInfo {
            code,
            status: Some(status),
            pending,
            archived,
        });
    }
    Ok(report)
}
