//! Memory Adapter Module
//!
//! Main cache engine combining HashMap storage with an expiration index and
//! LRU tracking, behind the [`Adapter`] contract.
//!
//! Expiration is checked logically on every access and enforced physically by
//! the periodic sweep. Reads never take the write lock: an LRU hit only
//! appends a touch event, which the next writer or sweep replays.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use parking_lot::Mutex;
use tokio::sync::{RwLock, RwLockWriteGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::cache::adapter::{key_absent, Adapter, Loader};
use crate::cache::entry::{current_timestamp_ms, expire_timestamp, CacheEntry};
use crate::cache::expire::ExpireIndex;
use crate::cache::lru::LruTracker;
use crate::cache::stats::{CacheStats, StatsCounters};
use crate::config::{CacheConfig, DEFAULT_SWEEP_BATCH_SIZE};
use crate::context::Context;
use crate::error::Result;
use crate::tasks::{spawn_sweeper, Maintain};

/// Pending touch events kept between two replays. Further hits are dropped
/// from the LRU ordering until the buffer is drained.
const TOUCH_BUFFER_LIMIT: usize = 1 << 16;

// == Store ==
/// The three indices guarded together by the adapter lock.
#[derive(Debug)]
struct Store<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    expire: ExpireIndex<K>,
    lru: LruTracker<K>,
    stats: StatsCounters,
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn new(lru_capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            expire: ExpireIndex::new(),
            lru: LruTracker::new(lru_capacity),
            stats: StatsCounters::default(),
        }
    }

    /// Returns the entry for `key` unless it is missing or expired.
    fn live(&self, key: &K, now: i64) -> Option<&CacheEntry<V>> {
        self.entries.get(key).filter(|entry| !entry.is_expired_at(now))
    }

    fn live_mut(&mut self, key: &K, now: i64) -> Option<&mut CacheEntry<V>> {
        self.entries
            .get_mut(key)
            .filter(|entry| !entry.is_expired_at(now))
    }

    /// Live entry count: expired entries not yet swept are subtracted.
    fn live_len(&self, now: i64) -> usize {
        self.entries.len().saturating_sub(self.expire.count_due(now))
    }

    fn live_entries(&self, now: i64) -> impl Iterator<Item = (&K, &CacheEntry<V>)> {
        self.entries
            .iter()
            .filter(move |(_, entry)| !entry.is_expired_at(now))
    }

    // == Put ==
    /// Stores `value` under `key`, or deletes `key` when the value is absent
    /// or `ttl` is negative.
    fn put(&mut self, key: K, value: Option<V>, ttl: Duration, now: i64) {
        match storable(value, ttl) {
            Some(value) => self.insert(key, value, ttl, now),
            None => {
                self.remove(&key);
            }
        }
    }

    /// Insert branch of the conditional writes: stores `value` when it is
    /// storable and never deletes, leaving any current entry untouched.
    fn put_new(&mut self, key: K, value: Option<V>, ttl: Duration, now: i64) -> Option<V> {
        let value = storable(value, ttl)?;
        self.insert(key, value.clone(), ttl, now);
        Some(value)
    }

    // == Insert ==
    /// Upserts an entry, moving it to the most recently used position and
    /// evicting down to capacity.
    fn insert(&mut self, key: K, value: V, ttl: Duration, now: i64) {
        let mut entry = CacheEntry::new(value, ttl, now);
        let lru_seq = match self.entries.get(&key) {
            Some(old) => {
                self.expire.reschedule(&key, old.expires_at, entry.expires_at);
                old.lru_seq
            }
            None => {
                if let Some(expires_at) = entry.expires_at {
                    self.expire.insert(key.clone(), expires_at);
                }
                None
            }
        };
        entry.lru_seq = self
            .lru
            .is_enabled()
            .then(|| self.lru.touch(key.clone(), lru_seq));

        self.entries.insert(key, entry);
        self.evict_overflow(now);
    }

    // == Remove ==
    /// Physically removes `key` from all three indices.
    fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        if let Some(expires_at) = entry.expires_at {
            self.expire.remove(key, expires_at);
        }
        if let Some(seq) = entry.lru_seq {
            self.lru.remove(seq);
        }
        Some(entry)
    }

    /// Moves a stored key to the most recently used position.
    fn touch(&mut self, key: &K) {
        if !self.lru.is_enabled() {
            return;
        }
        if let Some(entry) = self.entries.get_mut(key) {
            entry.lru_seq = Some(self.lru.touch(key.clone(), entry.lru_seq));
        }
    }

    /// Replays touch events recorded by readers, oldest first.
    fn apply_touches(&mut self, keys: Vec<K>) {
        for key in keys {
            self.touch(&key);
        }
    }

    // == Evict Overflow ==
    /// Evicts least recently used entries until the live count fits the
    /// capacity. Expired entries are reclaimed first since they do not count.
    fn evict_overflow(&mut self, now: i64) {
        if !self.lru.is_enabled() || self.entries.len() <= self.lru.capacity() {
            return;
        }
        self.purge_due(now, usize::MAX);

        let mut evicted = 0;
        while self.entries.len() > self.lru.capacity() {
            let Some(key) = self.lru.evict_oldest() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&key) {
                if let Some(expires_at) = entry.expires_at {
                    self.expire.remove(&key, expires_at);
                }
                evicted += 1;
            }
        }
        if evicted > 0 {
            trace!("LRU eviction: removed {} entries", evicted);
            self.stats.record_evictions(evicted);
        }
    }

    // == Purge Due ==
    /// Deletes up to `limit` entries whose expiration is at or before `now`.
    ///
    /// Returns the number of expiration index slots processed.
    fn purge_due(&mut self, now: i64, limit: usize) -> usize {
        let due = self.expire.take_due(now, limit);
        let processed = due.len();
        let mut removed = 0;

        for key in due {
            let Some(entry) = self.entries.get(&key) else {
                continue;
            };
            if !entry.is_expired_at(now) {
                continue;
            }
            if let Some(seq) = entry.lru_seq {
                self.lru.remove(seq);
            }
            self.entries.remove(&key);
            removed += 1;
        }

        self.stats.record_expired(removed);
        processed
    }

    /// Swaps out all indices, returning the old ones so they can be dropped
    /// after the lock is released.
    fn reset(&mut self) -> (HashMap<K, CacheEntry<V>>, ExpireIndex<K>, LruTracker<K>) {
        let capacity = self.lru.capacity();
        (
            std::mem::take(&mut self.entries),
            std::mem::take(&mut self.expire),
            std::mem::replace(&mut self.lru, LruTracker::new(capacity)),
        )
    }
}

/// A value a write may store: present, with a non-negative duration.
fn storable<V>(value: Option<V>, ttl: Duration) -> Option<V> {
    value.filter(|_| ttl >= Duration::zero())
}

// == Memory Adapter ==
/// In-process cache backend with TTL expiration and optional LRU capacity.
pub struct MemoryAdapter<K, V> {
    /// Entries plus expiration and LRU indices
    store: RwLock<Store<K, V>>,
    /// Keys hit by readers since the last replay
    touches: Mutex<Vec<K>>,
    lru_enabled: bool,
    sweep_batch_size: usize,
    closed: AtomicBool,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> MemoryAdapter<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates a memory adapter. A positive `lru_capacity` bounds the number
    /// of live entries, 0 leaves the cache unbounded.
    ///
    /// No sweeper is attached; see [`MemoryAdapter::start_sweeper`].
    pub fn new(lru_capacity: usize) -> Self {
        Self {
            store: RwLock::new(Store::new(lru_capacity)),
            touches: Mutex::new(Vec::new()),
            lru_enabled: lru_capacity > 0,
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
            closed: AtomicBool::new(false),
            sweeper: Mutex::new(None),
        }
    }

    /// Creates a memory adapter from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        let mut adapter = Self::new(config.lru_capacity);
        adapter.sweep_batch_size = config.sweep_batch_size.max(1);
        adapter
    }

    // == Start Sweeper ==
    /// Registers this adapter with a periodic sweeper running every `interval`.
    ///
    /// Replaces any previously started sweeper. Does nothing once closed.
    pub fn start_sweeper(self: &Arc<Self>, interval: std::time::Duration) {
        if self.is_closed() {
            return;
        }
        let handle = spawn_sweeper(Arc::downgrade(self), interval);
        if let Some(previous) = std::mem::replace(&mut *self.sweeper.lock(), handle) {
            previous.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let store = self.store.read().await;
        store.stats.snapshot(store.live_len(current_timestamp_ms()))
    }

    // == Sync Events And Clear Expired ==
    /// Maintenance pass: replays pending LRU touches, then deletes expired
    /// entries in batches, releasing the write lock between batches.
    pub async fn sync_event_and_clear_expired(&self) {
        let mut removed = 0;
        loop {
            let Some(mut store) = self.write_store().await else {
                return;
            };
            let processed = store.purge_due(current_timestamp_ms(), self.sweep_batch_size);
            drop(store);

            removed += processed;
            if processed < self.sweep_batch_size {
                break;
            }
            tokio::task::yield_now().await;
        }

        if removed > 0 {
            debug!("Cache sweep: removed {} expired entries", removed);
        } else {
            trace!("Cache sweep: no expired entries found");
        }
    }

    /// Takes the write lock and replays pending touches.
    ///
    /// Returns `None` once the adapter is closed, turning writes into no-ops.
    async fn write_store(&self) -> Option<RwLockWriteGuard<'_, Store<K, V>>> {
        let mut store = self.store.write().await;
        if self.is_closed() {
            return None;
        }
        if self.lru_enabled {
            let pending = std::mem::take(&mut *self.touches.lock());
            store.apply_touches(pending);
        }
        Some(store)
    }

    /// Records an LRU hit without taking the write lock.
    fn record_touch(&self, key: &K) {
        if !self.lru_enabled {
            return;
        }
        let mut touches = self.touches.lock();
        if touches.len() < TOUCH_BUFFER_LIMIT {
            touches.push(key.clone());
        } else {
            trace!("Touch buffer full, dropping LRU touch event");
        }
    }

    /// Read-locked lookup shared by `get` and the fast path of the compute variants.
    async fn lookup(&self, key: &K) -> Option<V> {
        let store = self.store.read().await;
        let value = store
            .live(key, current_timestamp_ms())
            .map(|entry| entry.value.clone());
        if value.is_some() {
            store.stats.record_hit();
        } else {
            store.stats.record_miss();
        }
        drop(store);

        if value.is_some() {
            self.record_touch(key);
        }
        value
    }
}

impl<K, V> Drop for MemoryAdapter<K, V> {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

#[async_trait]
impl<K, V> Maintain for MemoryAdapter<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn sync_event_and_clear_expired(&self) {
        MemoryAdapter::sync_event_and_clear_expired(self).await;
    }
}

#[async_trait]
impl<K, V> Adapter<K, V> for MemoryAdapter<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn set(&self, _ctx: &Context, key: K, value: Option<V>, ttl: Duration) -> Result<()> {
        if let Some(mut store) = self.write_store().await {
            store.put(key, value, ttl, current_timestamp_ms());
        }
        Ok(())
    }

    async fn set_multi(
        &self,
        _ctx: &Context,
        data: Vec<(K, Option<V>)>,
        ttl: Duration,
    ) -> Result<()> {
        if let Some(mut store) = self.write_store().await {
            let now = current_timestamp_ms();
            for (key, value) in data {
                store.put(key, value, ttl, now);
            }
        }
        Ok(())
    }

    async fn set_if_not_exist(
        &self,
        _ctx: &Context,
        key: K,
        value: Option<V>,
        ttl: Duration,
    ) -> Result<bool> {
        let Some(mut store) = self.write_store().await else {
            return Ok(false);
        };
        let now = current_timestamp_ms();
        if store.live(&key, now).is_some() {
            return Ok(false);
        }
        Ok(store.put_new(key, value, ttl, now).is_some())
    }

    async fn set_if_not_exist_func(
        &self,
        _ctx: &Context,
        key: K,
        loader: Loader<V>,
        ttl: Duration,
    ) -> Result<bool> {
        if self.store.read().await.live(&key, current_timestamp_ms()).is_some() {
            return Ok(false);
        }

        let Some(mut store) = self.write_store().await else {
            return Ok(false);
        };
        if store.live(&key, current_timestamp_ms()).is_some() {
            return Ok(false);
        }
        let value = loader().await?;
        Ok(store
            .put_new(key, value, ttl, current_timestamp_ms())
            .is_some())
    }

    async fn get(&self, _ctx: &Context, key: &K) -> Result<Option<V>> {
        Ok(self.lookup(key).await)
    }

    async fn get_or_set(
        &self,
        _ctx: &Context,
        key: K,
        value: Option<V>,
        ttl: Duration,
    ) -> Result<Option<V>> {
        let Some(mut store) = self.write_store().await else {
            return Ok(None);
        };
        let now = current_timestamp_ms();
        let existing = store.live(&key, now).map(|entry| entry.value.clone());
        if existing.is_some() {
            store.stats.record_hit();
            store.touch(&key);
            return Ok(existing);
        }
        store.stats.record_miss();
        Ok(store.put_new(key, value, ttl, now))
    }

    async fn get_or_set_func(
        &self,
        _ctx: &Context,
        key: K,
        loader: Loader<V>,
        ttl: Duration,
    ) -> Result<Option<V>> {
        if let Some(value) = self.lookup(&key).await {
            return Ok(Some(value));
        }

        // No lock is held while the loader runs.
        let Some(value) = storable(loader().await?, ttl) else {
            return Ok(None);
        };

        let Some(mut store) = self.write_store().await else {
            return Ok(None);
        };
        Ok(store.put_new(key, Some(value), ttl, current_timestamp_ms()))
    }

    async fn get_or_set_func_lock(
        &self,
        _ctx: &Context,
        key: K,
        loader: Loader<V>,
        ttl: Duration,
    ) -> Result<Option<V>> {
        if let Some(value) = self.lookup(&key).await {
            return Ok(Some(value));
        }

        let Some(mut store) = self.write_store().await else {
            return Ok(None);
        };
        let existing = store
            .live(&key, current_timestamp_ms())
            .map(|entry| entry.value.clone());
        if existing.is_some() {
            store.touch(&key);
            return Ok(existing);
        }

        // The write lock is held across the loader: one computation at a time.
        let value = loader().await?;
        Ok(store.put_new(key, value, ttl, current_timestamp_ms()))
    }

    async fn contains(&self, _ctx: &Context, key: &K) -> Result<bool> {
        let store = self.store.read().await;
        Ok(store.live(key, current_timestamp_ms()).is_some())
    }

    async fn get_expire(&self, _ctx: &Context, key: &K) -> Result<Duration> {
        let store = self.store.read().await;
        let now = current_timestamp_ms();
        Ok(store
            .live(key, now)
            .and_then(|entry| entry.ttl_remaining_at(now))
            .unwrap_or_else(key_absent))
    }

    async fn remove(&self, _ctx: &Context, keys: &[K]) -> Result<Option<V>> {
        let Some(mut store) = self.write_store().await else {
            return Ok(None);
        };
        let now = current_timestamp_ms();
        let mut last = None;
        for key in keys {
            if let Some(entry) = store.remove(key) {
                if !entry.is_expired_at(now) {
                    last = Some(entry.value);
                }
            }
        }
        Ok(last)
    }

    async fn update(
        &self,
        _ctx: &Context,
        key: &K,
        value: Option<V>,
    ) -> Result<(Option<V>, bool)> {
        let Some(mut store) = self.write_store().await else {
            return Ok((None, false));
        };
        let now = current_timestamp_ms();
        if store.live(key, now).is_none() {
            return Ok((None, false));
        }

        match value {
            Some(value) => {
                let old = store
                    .live_mut(key, now)
                    .map(|entry| std::mem::replace(&mut entry.value, value));
                store.touch(key);
                Ok((old, true))
            }
            None => Ok((store.remove(key).map(|entry| entry.value), true)),
        }
    }

    async fn update_expire(&self, _ctx: &Context, key: &K, ttl: Duration) -> Result<Duration> {
        let Some(mut store) = self.write_store().await else {
            return Ok(key_absent());
        };
        let now = current_timestamp_ms();
        let Some(entry) = store.live_mut(key, now) else {
            return Ok(key_absent());
        };
        let old = entry.ttl_remaining_at(now).unwrap_or_else(key_absent);

        if ttl < Duration::zero() {
            store.remove(key);
            return Ok(old);
        }

        let expires_at = expire_timestamp(ttl, now);
        let previous = std::mem::replace(&mut entry.expires_at, expires_at);
        store.expire.reschedule(key, previous, expires_at);
        Ok(old)
    }

    async fn size(&self, _ctx: &Context) -> Result<usize> {
        let store = self.store.read().await;
        Ok(store.live_len(current_timestamp_ms()))
    }

    async fn data(&self, _ctx: &Context) -> Result<HashMap<K, V>> {
        let store = self.store.read().await;
        Ok(store
            .live_entries(current_timestamp_ms())
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect())
    }

    async fn keys(&self, _ctx: &Context) -> Result<Vec<K>> {
        let store = self.store.read().await;
        Ok(store
            .live_entries(current_timestamp_ms())
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn values(&self, _ctx: &Context) -> Result<Vec<V>> {
        let store = self.store.read().await;
        Ok(store
            .live_entries(current_timestamp_ms())
            .map(|(_, entry)| entry.value.clone())
            .collect())
    }

    async fn clear(&self, _ctx: &Context) -> Result<()> {
        let old = {
            let mut store = self.store.write().await;
            self.touches.lock().clear();
            store.reset()
        };
        debug!("Cache cleared: dropped {} entries", old.0.len());
        drop(old);
        Ok(())
    }

    async fn close(&self, ctx: &Context) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        self.clear(ctx).await?;
        info!("Memory cache adapter closed");
        Ok(())
    }
}
