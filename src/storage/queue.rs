//! Durable set-based work queue.

use std::sync::Arc;

use crate::error::Result;
use crate::storage::KeyValueStore;

/// A named set of pending work items.
///
/// Membership is the only queue semantics: no ordering, no priority, and
/// adding an item twice is the same as adding it once.
#[derive(Clone)]
pub struct WorkQueue {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl WorkQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Store key backing this queue.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Add items, returning how many were not already queued.
    pub async fn add(&self, items: &[String]) -> Result<usize> {
        self.store.set_add(&self.key, items).await
    }

    /// Remove items, returning how many were queued.
    pub async fn remove(&self, items: &[String]) -> Result<usize> {
        self.store.set_remove(&self.key, items).await
    }

    /// All queued items, in no particular order.
    pub async fn list(&self) -> Result<Vec<String>> {
        self.store.set_members(&self.key).await
    }

    pub async fn contains(&self, item: &str) -> Result<bool> {
        self.store.set_contains(&self.key, item).await
    }

    pub async fn len(&self) -> Result<usize> {
        self.store.set_len(&self.key).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.delete(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn queue() -> WorkQueue {
        WorkQueue::new(Arc::new(MemoryStore::new()), "workset:test")
    }

    fn items(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn add_is_idempotent() {
        let q = queue();
        assert_eq!(q.add(&items(&["1", "2"])).await.unwrap(), 2);
        assert_eq!(q.add(&items(&["2", "1"])).await.unwrap(), 0);

        let mut listed = q.list().await.unwrap();
        listed.sort();
        assert_eq!(listed, items(&["1", "2"]));
    }

    #[tokio::test]
    async fn remove_and_contains() {
        let q = queue();
        q.add(&items(&["1", "2", "3"])).await.unwrap();
        assert_eq!(q.remove(&items(&["2", "9"])).await.unwrap(), 1);
        assert!(q.contains("1").await.unwrap());
        assert!(!q.contains("2").await.unwrap());
        assert_eq!(q.len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn clear_empties_the_queue() {
        let q = queue();
        q.add(&items(&["1"])).await.unwrap();
        q.clear().await.unwrap();
        assert!(q.list().await.unwrap().is_empty());
        assert_eq!(q.len().await.unwrap(), 0);
    }
}
