//! In-memory stores.
//!
//! Same semantics as the Redis and filesystem backends, kept in process.
//! Clones of a store share state, so handles opened by different stage
//! instances see each other's writes just as they would against a server.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::ArchivedPost;
use crate::storage::{Backends, DocumentStore, InsertOutcome, KeyValueStore};

#[derive(Debug, Default)]
struct KvState {
    strings: HashMap<String, String>,
    sets: HashMap<String, HashSet<String>>,
}

/// In-memory key-value store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<KvState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, KvState>> {
        self.state
            .read()
            .map_err(|_| AppError::persistence("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, KvState>> {
        self.state
            .write()
            .map_err(|_| AppError::persistence("memory store lock poisoned"))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set_add(&self, key: &str, members: &[String]) -> Result<usize> {
        let mut state = self.write()?;
        let set = state.sets.entry(key.to_string()).or_default();
        Ok(members.iter().filter(|m| set.insert((*m).clone())).count())
    }

    async fn set_remove(&self, key: &str, members: &[String]) -> Result<usize> {
        let mut state = self.write()?;
        let Some(set) = state.sets.get_mut(key) else {
            return Ok(0);
        };
        let removed = members.iter().filter(|m| set.remove(m.as_str())).count();
        if set.is_empty() {
            state.sets.remove(key);
        }
        Ok(removed)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>> {
        let state = self.read()?;
        Ok(state
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
        let state = self.read()?;
        Ok(state.sets.get(key).is_some_and(|set| set.contains(member)))
    }

    async fn set_len(&self, key: &str) -> Result<usize> {
        let state = self.read()?;
        Ok(state.sets.get(key).map_or(0, HashSet::len))
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read()?.strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write()?
            .strings
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str) -> Result<bool> {
        let mut state = self.write()?;
        if state.strings.contains_key(key) {
            return Ok(false);
        }
        state.strings.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.write()?;
        state.strings.remove(key);
        state.sets.remove(key);
        Ok(())
    }
}

type Collections = HashMap<String, HashMap<String, ArchivedPost>>;

/// In-memory document store scoped to one board.
#[derive(Debug, Clone)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
    board: String,
}

impl MemoryDocumentStore {
    pub fn new(board: impl Into<String>) -> Self {
        Self {
            collections: Arc::default(),
            board: board.into(),
        }
    }

    /// Look up an archived post by thread id.
    pub fn get(&self, thread_id: &str) -> Option<ArchivedPost> {
        let collections = self.collections.read().ok()?;
        collections.get(&self.board)?.get(thread_id).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, post: &ArchivedPost) -> Result<InsertOutcome> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| AppError::persistence("memory document store lock poisoned"))?;
        let collection = collections.entry(self.board.clone()).or_default();
        if collection.contains_key(&post.thread_id) {
            return Ok(InsertOutcome::Duplicate);
        }
        collection.insert(post.thread_id.clone(), post.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn contains(&self, thread_id: &str) -> Result<bool> {
        Ok(self.get(thread_id).is_some())
    }

    async fn count(&self) -> Result<usize> {
        let collections = self
            .collections
            .read()
            .map_err(|_| AppError::persistence("memory document store lock poisoned"))?;
        Ok(collections.get(&self.board).map_or(0, HashMap::len))
    }
}

/// Backends whose handles all share one in-memory state.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackends {
    kv: MemoryStore,
    collections: Arc<RwLock<Collections>>,
}

impl MemoryBackends {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct handle on the shared key-value state.
    pub fn store(&self) -> MemoryStore {
        self.kv.clone()
    }

    /// Direct handle on one board's shared document collection.
    pub fn collection(&self, board: &str) -> MemoryDocumentStore {
        MemoryDocumentStore {
            collections: Arc::clone(&self.collections),
            board: board.to_string(),
        }
    }

    /// Live handles on the shared state, these backends included.
    pub fn open_handles(&self) -> usize {
        Arc::strong_count(&self.kv.state) + Arc::strong_count(&self.collections)
    }
}

#[async_trait]
impl Backends for MemoryBackends {
    async fn key_value(&self) -> Result<Arc<dyn KeyValueStore>> {
        Ok(Arc::new(self.store()))
    }

    async fn documents(&self, board: &str) -> Result<Arc<dyn DocumentStore>> {
        Ok(Arc::new(self.collection(board)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn set_add_counts_only_new_members() {
        let store = MemoryStore::new();
        assert_eq!(store.set_add("k", &strings(&["a", "b"])).await.unwrap(), 2);
        assert_eq!(store.set_add("k", &strings(&["b", "c"])).await.unwrap(), 1);
        assert_eq!(store.set_len("k").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn set_if_absent_keeps_existing_value() {
        let store = MemoryStore::new();
        assert!(store.set_if_absent("k", "first").await.unwrap());
        assert!(!store.set_if_absent("k", "second").await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set_add("k", &strings(&["x"])).await.unwrap();
        assert!(other.set_contains("k", "x").await.unwrap());
    }

    #[tokio::test]
    async fn document_store_rejects_duplicate_ids() {
        let backends = MemoryBackends::new();
        let docs = backends.documents("b1").await.unwrap();
        let post = ArchivedPost {
            thread_id: "1".into(),
            title: "t".into(),
            section: "b1".into(),
            pages: vec!["p1".into()],
        };
        assert_eq!(docs.insert(&post).await.unwrap(), InsertOutcome::Inserted);

        let mut changed = post.clone();
        changed.pages.push("p2".into());
        assert_eq!(docs.insert(&changed).await.unwrap(), InsertOutcome::Duplicate);
        assert_eq!(backends.collection("b1").get("1").unwrap().pages.len(), 1);
        assert_eq!(backends.collection("b2").count().await.unwrap(), 0);
    }
}
