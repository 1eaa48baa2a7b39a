//! Registry of open windows.
//!
//! Every opened file gets an entry keyed by its window id. The entry is
//! removed when the window reports it was closed, which drops the surface
//! and texture with it. The application exits once the registry is empty.

use std::collections::HashMap;
use std::hash::Hash;

/// Open windows and their per-window state.
#[derive(Debug)]
pub struct WindowRegistry<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for WindowRegistry<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> WindowRegistry<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a window. Returns the previous entry for `id`, if any.
    pub fn insert(&mut self, id: K, value: V) -> Option<V> {
        self.entries.insert(id, value)
    }

    pub fn get(&self, id: &K) -> Option<&V> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &K) -> Option<&mut V> {
        self.entries.get_mut(id)
    }

    /// Drop the entry for a closed window.
    pub fn remove(&mut self, id: &K) -> Option<V> {
        self.entries.remove(id)
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

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter()
    }
}
