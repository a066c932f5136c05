//! Storage abstractions for crawl state and archived posts.
//!
//! Crawl state lives in a key-value store with native sets (Redis in
//! production); archived threads go to a document store with one collection
//! per board (MongoDB in production, or a directory tree).
//!
//! ## Key Layout
//!
//! ```text
//! BoardStorage              # set: every known board code
//! status:<board>            # string: PENDING | HARVESTED
//! workset:reid:<board>      # set: thread ids waiting to be archived
//! reid:<thread_id>          # string: JSON thread metadata
//! ```

pub mod boards;
pub mod documents;
pub mod memory;
pub mod mongo;
pub mod queue;
pub mod redis_store;
pub mod reids;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ArchivedPost, DocumentBackend, StorageConfig};

// Re-export for convenience
pub use boards::BoardStorage;
pub use documents::LocalDocumentStore;
pub use memory::{MemoryBackends, MemoryDocumentStore, MemoryStore};
pub use mongo::MongoDocumentStore;
pub use queue::WorkQueue;
pub use redis_store::RedisStore;
pub use reids::ReidStorage;

/// Key of the global board set.
pub const BOARD_SET_KEY: &str = "BoardStorage";

/// Key of a board's status flag.
pub fn status_key(board: &str) -> String {
    format!("status:{board}")
}

/// Key of a board's pending thread-id set.
pub fn pending_key(board: &str) -> String {
    format!("workset:reid:{board}")
}

/// Key of a thread's metadata payload.
pub fn payload_key(thread_id: &str) -> String {
    format!("reid:{thread_id}")
}

/// Key-value store with string values and string sets.
///
/// Each call is atomic on its own; nothing is transactional across calls.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Add members to a set, returning how many were new.
    async fn set_add(&self, key: &str, members: &[String]) -> Result<usize>;

    /// Remove members from a set, returning how many were present.
    async fn set_remove(&self, key: &str, members: &[String]) -> Result<usize>;

    async fn set_members(&self, key: &str) -> Result<Vec<String>>;

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool>;

    async fn set_len(&self, key: &str) -> Result<usize>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Write `value` only when `key` is absent. Returns whether it was written.
    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool>;

    async fn delete(&self, key: &str) -> Result<()>;
}

/// Result of inserting a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A document with the same thread id already exists; nothing was written
    Duplicate,
}

/// One board's collection of archived threads.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a post; the thread id is a unique key.
    async fn insert(&self, post: &ArchivedPost) -> Result<InsertOutcome>;

    async fn contains(&self, thread_id: &str) -> Result<bool>;

    async fn count(&self) -> Result<usize>;
}

/// Opens fresh store handles for a stage instance.
#[async_trait]
pub trait Backends: Send + Sync {
    async fn key_value(&self) -> Result<Arc<dyn KeyValueStore>>;

    async fn documents(&self, board: &str) -> Result<Arc<dyn DocumentStore>>;
}

/// Where archived posts are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentTarget {
    /// One collection per board in `database`
    Mongo { uri: String, database: String },
    /// One directory per board under `root`
    Files { root: PathBuf },
}

/// Redis for crawl state, MongoDB or the local filesystem for archived posts.
pub struct ProductionBackends {
    redis_url: String,
    documents: DocumentTarget,
}

impl ProductionBackends {
    pub fn new(redis_url: impl Into<String>, documents: DocumentTarget) -> Self {
        Self {
            redis_url: redis_url.into(),
            documents,
        }
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        let documents = match storage.backend {
            DocumentBackend::Mongo => DocumentTarget::Mongo {
                uri: storage.mongo.clone(),
                database: storage.database.clone(),
            },
            DocumentBackend::Files => DocumentTarget::Files {
                root: PathBuf::from(&storage.documents),
            },
        };
        Self::new(storage.redis.as_str(), documents)
    }

    pub fn document_target(&self) -> &DocumentTarget {
        &self.documents
    }
}

#[async_trait]
impl Backends for ProductionBackends {
    async fn key_value(&self) -> Result<Arc<dyn KeyValueStore>> {
        Ok(Arc::new(RedisStore::connect(&self.redis_url).await?))
    }

    async fn documents(&self, board: &str) -> Result<Arc<dyn DocumentStore>> {
        let store: Arc<dyn DocumentStore> = match &self.documents {
            DocumentTarget::Mongo { uri, database } => {
                Arc::new(MongoDocumentStore::open(uri, database, board).await?)
            }
            DocumentTarget::Files { root } => {
                Arc::new(LocalDocumentStore::open(root, board).await?)
            }
        };
        Ok(store)
    }
}
