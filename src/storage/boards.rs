//! Board set and per-board harvest status.

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Board, BoardStatus};
use crate::storage::{BOARD_SET_KEY, KeyValueStore, WorkQueue, status_key};

/// Typed access to the global board set and status flags.
#[derive(Clone)]
pub struct BoardStorage {
    store: Arc<dyn KeyValueStore>,
    boards: WorkQueue,
}

impl BoardStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let boards = WorkQueue::new(Arc::clone(&store), BOARD_SET_KEY);
        Self { store, boards }
    }

    /// Register a board. A board seen for the first time starts `Pending`;
    /// the status of a known board is left alone.
    ///
    /// Returns whether the board was new to the set.
    pub async fn register(&self, code: &str) -> Result<bool> {
        let added = self.boards.add(&[code.to_string()]).await? > 0;
        self.store
            .set_if_absent(&status_key(code), BoardStatus::Pending.as_str())
            .await?;
        Ok(added)
    }

    pub async fn contains(&self, code: &str) -> Result<bool> {
        self.boards.contains(code).await
    }

    /// Every known board code, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut codes = self.boards.list().await?;
        codes.sort();
        Ok(codes)
    }

    /// Status of a board; a board with no flag is `Pending`.
    pub async fn status(&self, code: &str) -> Result<BoardStatus> {
        match self.store.get(&status_key(code)).await? {
            Some(raw) => raw.parse(),
            None => Ok(BoardStatus::Pending),
        }
    }

    pub async fn set_status(&self, code: &str, status: BoardStatus) -> Result<()> {
        self.store.set(&status_key(code), status.as_str()).await
    }

    /// Board record with its current status.
    pub async fn board(&self, code: &str) -> Result<Board> {
        Ok(Board {
            code: code.to_string(),
            status: self.status(code).await?,
        })
    }
}
