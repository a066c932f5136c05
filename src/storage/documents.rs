//! Local filesystem document store.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── {board}/              # one collection per board
//!     ├── 1187654321.json   # one document per thread
//!     └── 1187654322.json
//! ```
//!
//! Documents are written to a temp file and then hard-linked into place.
//! The link fails if the target already exists, which makes the thread id a
//! unique key and never exposes a half-written document.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::ArchivedPost;
use crate::storage::{DocumentStore, InsertOutcome};

/// One board's collection on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    dir: PathBuf,
}

impl LocalDocumentStore {
    /// Open (and create if needed) the collection for `board` under `root`.
    pub async fn open(root: impl AsRef<Path>, board: &str) -> Result<Self> {
        if board.is_empty() || board.contains(['/', '\\']) || board.starts_with('.') {
            return Err(AppError::validation(format!(
                "'{board}' is not a usable collection name"
            )));
        }
        let dir = root.as_ref().join(board);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn document_path(&self, thread_id: &str) -> PathBuf {
        self.dir.join(format!("{thread_id}.json"))
    }

    /// Read a document back, returning None if it was never archived.
    pub async fn get(&self, thread_id: &str) -> Result<Option<ArchivedPost>> {
        match tokio::fs::read(self.document_path(thread_id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write_temp(&self, post: &ArchivedPost) -> Result<PathBuf> {
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", post.thread_id, std::process::id()));
        let bytes = serde_json::to_vec(post)?;
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);
        Ok(tmp)
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn insert(&self, post: &ArchivedPost) -> Result<InsertOutcome> {
        if post.thread_id.is_empty() || post.thread_id.contains(['/', '\\', '.']) {
            return Err(AppError::validation(format!(
                "'{}' is not a usable thread id",
                post.thread_id
            )));
        }

        let path = self.document_path(&post.thread_id);
        let tmp = self.write_temp(post).await?;
        let linked = tokio::fs::hard_link(&tmp, &path).await;
        tokio::fs::remove_file(&tmp).await?;

        match linked {
            Ok(()) => Ok(InsertOutcome::Inserted),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(AppError::persistence(format!(
                "cannot write {}: {e}",
                path.display()
            ))),
        }
    }

    async fn contains(&self, thread_id: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.document_path(thread_id)).await?)
    }

    async fn count(&self) -> Result<usize> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !name.starts_with('.') && name.ends_with(".json") {
                count += 1;
            }
        }
        Ok(count)
    }
}
