//! Memoized read projections with validity tracking.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// A single cached projection.
///
/// Values are handed out as `Arc<[T]>`, so callers share the cached buffer
/// but can never mutate it.
#[derive(Debug)]
pub struct Memo<T> {
    value: Option<Arc<[T]>>,
    /// Incremented on every invalidation
    generation: u32,
}

impl<T> Memo<T> {
    pub fn new() -> Self {
        Self {
            value: None,
            generation: 0,
        }
    }

    /// Return the cached value, computing it first if invalid.
    pub fn get_or_compute(&mut self, compute: impl FnOnce() -> Vec<T>) -> Arc<[T]> {
        if let Some(value) = &self.value {
            return Arc::clone(value);
        }
        let value: Arc<[T]> = compute().into();
        self.value = Some(Arc::clone(&value));
        value
    }

    pub fn invalidate(&mut self) {
        self.value = None;
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A family of cached projections keyed by a parameter (layer, plane, ...).
#[derive(Debug)]
pub struct KeyedMemo<K, T> {
    values: HashMap<K, Arc<[T]>>,
    generation: u32,
}

impl<K: Eq + Hash, T> KeyedMemo<K, T> {
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            generation: 0,
        }
    }

    pub fn get_or_compute(&mut self, key: K, compute: impl FnOnce() -> Vec<T>) -> Arc<[T]> {
        Arc::clone(self.values.entry(key).or_insert_with(|| compute().into()))
    }

    /// Drop one cached entry.
    pub fn invalidate_key(&mut self, key: &K) {
        if self.values.remove(key).is_some() {
            self.generation = self.generation.wrapping_add(1);
        }
    }

    /// Drop the entries whose key matches `stale`.
    pub fn invalidate_where(&mut self, mut stale: impl FnMut(&K) -> bool) {
        let before = self.values.len();
        self.values.retain(|key, _| !stale(key));
        if self.values.len() != before {
            self.generation = self.generation.wrapping_add(1);
        }
    }

    /// Drop every cached entry.
    pub fn invalidate(&mut self) {
        self.values.clear();
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn is_cached(&self, key: &K) -> bool {
        self.values.contains_key(key)
    }

    pub fn cached_count(&self) -> usize {
        self.values.len()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<K: Eq + Hash, T> Default for KeyedMemo<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
