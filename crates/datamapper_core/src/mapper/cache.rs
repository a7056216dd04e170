//! Identity map keyed by persisted identity.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// At most one canonical `Arc<T>` per identity.
///
/// `get` hands out clones of the stored `Arc`, so callers observe the very
/// same object (`Arc::ptr_eq`) until the entry is replaced or evicted.
#[derive(Debug)]
pub struct IdentityCache<K, T> {
    entries: HashMap<K, Arc<T>>,
}

impl<K, T> Default for IdentityCache<K, T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, T> IdentityCache<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &K) -> Option<Arc<T>> {
        self.entries.get(id).cloned()
    }

    /// Inserts or overwrites; returns the displaced entry.
    pub fn put(&mut self, id: K, object: Arc<T>) -> Option<Arc<T>> {
        self.entries.insert(id, object)
    }

    pub fn remove(&mut self, id: &K) -> Option<Arc<T>> {
        self.entries.remove(id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, id: &K) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
