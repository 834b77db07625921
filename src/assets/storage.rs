use std::future::Future;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use rustc_hash::FxHashMap;
use slotmap::{Key, SlotMap};

use crate::errors::{BoxedError, ExportError, Result};
use crate::hash::{ContentAddressed, ContentHash};

// Internal data structure, protected by a lock.
pub struct TableInner<K: Key, T> {
    pub map: SlotMap<K, Arc<T>>,
    pub lookup: FxHashMap<ContentHash, K>,
}

impl<K: Key, T> Default for TableInner<K, T> {
    fn default() -> Self {
        Self {
            map: SlotMap::default(),
            lookup: FxHashMap::default(),
        }
    }
}

impl<K: Key, T> TableInner<K, T> {
    fn find(&self, hash: ContentHash) -> Option<Arc<T>> {
        let key = self.lookup.get(&hash)?;
        self.map.get(*key).cloned()
    }

    fn insert(&mut self, hash: ContentHash, value: Arc<T>) -> Arc<T> {
        let key = self.map.insert(value.clone());
        self.lookup.insert(hash, key);
        value
    }
}

/// Thread-safe content-addressed table.
///
/// At most one entry exists per hash, and entries never change once
/// inserted. Synchronous builders run under the write lock, so no two callers
/// ever build the same hash. Asynchronous builders run unlocked: concurrent
/// callers may both build, and the first to insert wins.
pub struct AssetTable<K: Key, T> {
    kind: &'static str,
    inner: RwLock<TableInner<K, T>>,
}

impl<K: Key, T> AssetTable<K, T> {
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            inner: RwLock::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// [Read] Gets the entry stored under `hash`.
    pub fn get(&self, hash: ContentHash) -> Option<Arc<T>> {
        self.inner.read().find(hash)
    }

    pub fn contains(&self, hash: ContentHash) -> bool {
        self.inner.read().lookup.contains_key(&hash)
    }

    /// [Write] Adds `value` if nothing is stored under `hash` yet.
    /// Returns whether it was inserted.
    pub fn insert_unique(&self, hash: ContentHash, value: Arc<T>) -> bool {
        let mut guard = self.inner.write();
        if guard.lookup.contains_key(&hash) {
            return false;
        }
        guard.insert(hash, value);
        true
    }

    /// [Write] Returns the entry already stored under `hash`, or stores and
    /// returns `value`.
    pub fn get_or_insert(&self, hash: ContentHash, value: Arc<T>) -> Arc<T> {
        let mut guard = self.inner.write();
        if let Some(existing) = guard.find(hash) {
            return existing;
        }
        guard.insert(hash, value)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().map.is_empty()
    }

    /// Snapshot of every stored entry.
    pub fn values(&self) -> Vec<Arc<T>> {
        self.inner.read().map.values().cloned().collect()
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write();
        guard.map.clear();
        guard.lookup.clear();
    }

    /// [Read - Advanced] Acquires a read-lock guard for batch access.
    pub fn read_lock(&self) -> RwLockReadGuard<'_, TableInner<K, T>> {
        self.inner.read()
    }

    fn builder_failed(&self, hash: ContentHash, source: BoxedError) -> ExportError {
        log::error!("AssetTable<{}>: builder for {hash} failed: {source}", self.kind);
        ExportError::Builder {
            kind: self.kind,
            hash,
            source,
        }
    }
}

impl<K: Key, T: ContentAddressed> AssetTable<K, T> {
    /// Returns the entry for `hash`, invoking `build` only if it is absent.
    ///
    /// The builder runs under this table's write lock. It may fill *other*
    /// tables but must not call back into this one.
    pub fn get_or_create<F, E>(&self, hash: ContentHash, build: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: Into<BoxedError>,
    {
        let mut guard = self.inner.write();
        if let Some(existing) = guard.find(hash) {
            return Ok(existing);
        }
        let value = build().map_err(|e| self.builder_failed(hash, e.into()))?;
        self.check_consistency(hash, &value);
        Ok(guard.insert(hash, Arc::new(value)))
    }

    /// Like [`get_or_create`](Self::get_or_create), but the builder runs
    /// outside the lock. If another caller inserted `hash` while this one was
    /// building, the freshly built value is dropped and the stored one
    /// returned.
    pub async fn get_or_create_async<F, Fut, E>(&self, hash: ContentHash, build: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<BoxedError>,
    {
        if let Some(existing) = self.get(hash) {
            return Ok(existing);
        }
        let value = build().await.map_err(|e| self.builder_failed(hash, e.into()))?;
        self.check_consistency(hash, &value);

        let mut guard = self.inner.write();
        if let Some(existing) = guard.find(hash) {
            log::debug!(
                "AssetTable<{}>: {hash} was built concurrently, discarding duplicate",
                self.kind
            );
            return Ok(existing);
        }
        Ok(guard.insert(hash, Arc::new(value)))
    }

    fn check_consistency(&self, hash: ContentHash, value: &T) {
        let actual = value.content_hash();
        if actual != hash {
            log::error!(
                "AssetTable<{}>: builder result hash {actual} does not match key {hash}",
                self.kind
            );
        }
    }
}
