use rustc_hash::FxHashMap;
use slotmap::{Key, SecondaryMap, SlotMap};

use crate::hash::ContentHash;

/// Insertion-ordered entity collection owned by a document.
///
/// Entries may be registered under the content hash they were built from so
/// that later lookups reuse them. Reference indices (the position an entry
/// takes in the serialized array) are assigned by
/// [`assign_reference_indices`](Self::assign_reference_indices) and dropped
/// again on the next insert.
pub struct Collection<K: Key, T> {
    items: SlotMap<K, T>,
    order: Vec<K>,
    by_hash: FxHashMap<ContentHash, K>,
    reference_indices: SecondaryMap<K, usize>,
    resolved: bool,
}

impl<K: Key, T> Default for Collection<K, T> {
    fn default() -> Self {
        Self {
            items: SlotMap::default(),
            order: Vec::new(),
            by_hash: FxHashMap::default(),
            reference_indices: SecondaryMap::new(),
            resolved: false,
        }
    }
}

impl<K: Key, T> Collection<K, T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> K {
        self.invalidate();
        let key = self.items.insert(value);
        self.order.push(key);
        key
    }

    /// Registers `value` as the entry for `hash`. If one is already
    /// registered it is kept and `value` is dropped.
    pub fn insert_keyed(&mut self, hash: ContentHash, value: T) -> K {
        if let Some(&existing) = self.by_hash.get(&hash) {
            log::warn!("Collection: entry for {hash} already registered, keeping the first");
            return existing;
        }
        let key = self.insert(value);
        self.by_hash.insert(hash, key);
        key
    }

    #[inline]
    pub fn find(&self, hash: ContentHash) -> Option<K> {
        self.by_hash.get(&hash).copied()
    }

    #[inline]
    pub fn get(&self, key: K) -> Option<&T> {
        self.items.get(key)
    }

    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        self.items.get_mut(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        self.order
            .iter()
            .filter_map(|&key| self.items.get(key).map(|value| (key, value)))
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.order.iter().copied()
    }

    /// Numbers every entry `0..len` in insertion order.
    pub fn assign_reference_indices(&mut self) {
        self.reference_indices.clear();
        for (index, &key) in self.order.iter().enumerate() {
            self.reference_indices.insert(key, index);
        }
        self.resolved = true;
    }

    /// `None` until indices are assigned, and again after any insert.
    #[inline]
    pub fn reference_index(&self, key: K) -> Option<usize> {
        if !self.resolved {
            return None;
        }
        self.reference_indices.get(key).copied()
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    fn invalidate(&mut self) {
        if self.resolved {
            self.reference_indices.clear();
            self.resolved = false;
        }
    }
}
