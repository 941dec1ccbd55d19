use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Shared last-value store. Readers get clones, so no guard escapes.
pub struct Cache<K, V> {
    data: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Cache {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash, V> Cache<K, V> {
    pub fn new() -> Self {
        Self {
            data: Arc::default(),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<K, V>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the value under `key`, returning the previous one.
    pub fn set_data(&self, key: K, data: V) -> Option<V> {
        self.entries().insert(key, data)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash, V: Clone> Cache<K, V> {
    pub fn get_data(&self, key: &K) -> Option<V> {
        self.entries().get(key).cloned()
    }
}

impl<K: Eq + Hash, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
