//! In-process string set for local deduplication.

use std::collections::HashSet;
use std::sync::RwLock;

/// A string set shared between workers.
///
/// Reads take the shared lock, writes the exclusive one.
#[derive(Debug, Default)]
pub struct SharedSet {
    inner: RwLock<HashSet<String>>,
}

impl SharedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, returning whether it was absent.
    pub fn insert(&self, item: &str) -> bool {
        match self.inner.write() {
            Ok(mut set) => set.insert(item.to_string()),
            Err(poisoned) => poisoned.into_inner().insert(item.to_string()),
        }
    }

    pub fn remove(&self, item: &str) -> bool {
        match self.inner.write() {
            Ok(mut set) => set.remove(item),
            Err(poisoned) => poisoned.into_inner().remove(item),
        }
    }

    pub fn contains(&self, item: &str) -> bool {
        match self.inner.read() {
            Ok(set) => set.contains(item),
            Err(poisoned) => poisoned.into_inner().contains(item),
        }
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(set) => set.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        match self.inner.write() {
            Ok(mut set) => set.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}
