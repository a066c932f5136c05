//! Per-board pending thread ids and per-thread metadata payloads.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::ThreadRef;
use crate::storage::{KeyValueStore, WorkQueue, payload_key, pending_key};

/// Typed access to one board's thread-id work queue.
#[derive(Clone)]
pub struct ReidStorage {
    store: Arc<dyn KeyValueStore>,
    pending: WorkQueue,
    board: String,
}

impl ReidStorage {
    pub fn new(store: Arc<dyn KeyValueStore>, board: &str) -> Self {
        let pending = WorkQueue::new(Arc::clone(&store), pending_key(board));
        Self {
            store,
            pending,
            board: board.to_string(),
        }
    }

    pub fn board(&self) -> &str {
        &self.board
    }

    /// The board's pending thread-id queue.
    pub fn pending(&self) -> &WorkQueue {
        &self.pending
    }

    /// Store payloads for a batch of threads, then queue their ids.
    ///
    /// Payloads go first so every queued id has metadata to load.
    /// Returns how many ids were newly queued.
    pub async fn stage(&self, threads: &[ThreadRef]) -> Result<usize> {
        for thread in threads {
            self.set_payload(thread).await?;
        }
        let ids: Vec<String> = threads.iter().map(|t| t.thread_id.clone()).collect();
        self.pending.add(&ids).await
    }

    /// Upsert a thread's metadata payload.
    pub async fn set_payload(&self, thread: &ThreadRef) -> Result<()> {
        self.store
            .set(&payload_key(&thread.thread_id), &thread.encode()?)
            .await
    }

    /// Load a thread's metadata payload.
    pub async fn payload(&self, thread_id: &str) -> Result<ThreadRef> {
        let raw = self
            .store
            .get(&payload_key(thread_id))
            .await?
            .ok_or_else(|| {
                AppError::persistence(format!("no metadata stored for thread {thread_id}"))
            })?;
        ThreadRef::decode(&raw)
    }

    /// Drop a thread from the pending queue once it is archived.
    pub async fn complete(&self, thread_id: &str) -> Result<()> {
        self.pending.remove(&[thread_id.to_string()]).await?;
        Ok(())
    }

    /// Forget every pending id of the board.
    pub async fn reset(&self) -> Result<()> {
        self.pending.clear().await
    }
}
