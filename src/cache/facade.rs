//! Cache Facade Module
//!
//! The user-facing handle: a context plus a shared adapter. Every operation
//! forwards to the adapter with the handle's context.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use chrono::Duration;
use futures::FutureExt;

use crate::cache::adapter::{Adapter, Loader};
use crate::cache::memory::MemoryAdapter;
use crate::config::{CacheConfig, DEFAULT_SWEEP_INTERVAL};
use crate::context::Context;
use crate::error::Result;

// == Cache ==
/// Handle to a cache backend.
///
/// Clones are shallow: they share the adapter and may carry a different
/// [`Context`] (see [`Cache::with_context`]).
///
/// # Example
/// ```ignore
/// let cache: Cache<String, u64> = Cache::new(1024);
/// cache.set("answer".to_string(), 42, Duration::seconds(30)).await?;
/// ```
pub struct Cache<K, V> {
    adapter: Arc<dyn Adapter<K, V>>,
    ctx: Context,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            ctx: self.ctx.clone(),
        }
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache").field("ctx", &self.ctx).finish_non_exhaustive()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a cache backed by a memory adapter, swept once per second.
    ///
    /// A positive `lru_capacity` bounds the number of live entries. Must be
    /// called from within a tokio runtime for the sweeper to start.
    pub fn new(lru_capacity: usize) -> Self {
        let adapter = Arc::new(MemoryAdapter::new(lru_capacity));
        adapter.start_sweeper(DEFAULT_SWEEP_INTERVAL);
        Self::with_adapter(adapter)
    }

    /// Creates a memory-backed cache from validated configuration.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        let adapter = Arc::new(MemoryAdapter::from_config(config));
        adapter.start_sweeper(config.sweep_interval);
        Ok(Self::with_adapter(adapter))
    }

    /// Creates a cache over any backend. The adapter is fixed for the
    /// lifetime of the handle and its clones.
    pub fn with_adapter(adapter: Arc<dyn Adapter<K, V>>) -> Self {
        Self {
            adapter,
            ctx: Context::background(),
        }
    }

    // == Context ==
    /// Returns a handle sharing this cache's adapter but carrying `ctx`.
    pub fn with_context(&self, ctx: Context) -> Self {
        Self {
            adapter: Arc::clone(&self.adapter),
            ctx,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter<K, V>> {
        &self.adapter
    }

    // == Writes ==
    /// Sets `key` to `value`, expiring after `ttl`.
    ///
    /// A zero `ttl` never expires. A negative `ttl` or a `None` value deletes `key`.
    pub async fn set(&self, key: K, value: impl Into<Option<V>>, ttl: Duration) -> Result<()> {
        self.adapter.set(&self.ctx, key, value.into(), ttl).await
    }

    /// Sets every pair of `data` in one batch with the same `ttl`.
    pub async fn set_multi<I, T>(&self, data: I, ttl: Duration) -> Result<()>
    where
        I: IntoIterator<Item = (K, T)>,
        T: Into<Option<V>>,
    {
        let data = data
            .into_iter()
            .map(|(key, value)| (key, value.into()))
            .collect();
        self.adapter.set_multi(&self.ctx, data, ttl).await
    }

    /// Sets `key` only if it does not exist. Returns true if the value was stored.
    pub async fn set_if_not_exist(
        &self,
        key: K,
        value: impl Into<Option<V>>,
        ttl: Duration,
    ) -> Result<bool> {
        self.adapter
            .set_if_not_exist(&self.ctx, key, value.into(), ttl)
            .await
    }

    /// Sets `key` to the result of `f` only if it does not exist. `f` is not
    /// called when the key is present; a `None` result stores nothing.
    pub async fn set_if_not_exist_func<F, Fut>(&self, key: K, f: F, ttl: Duration) -> Result<bool>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<V>>> + Send + 'static,
    {
        self.adapter
            .set_if_not_exist_func(&self.ctx, key, boxed_loader(f), ttl)
            .await
    }

    // == Reads ==
    /// Returns the value of `key`, or `None` if it is missing or expired.
    pub async fn get(&self, key: &K) -> Result<Option<V>> {
        self.adapter.get(&self.ctx, key).await
    }

    /// Returns the value of `key`, storing `value` first if it is missing.
    pub async fn get_or_set(
        &self,
        key: K,
        value: impl Into<Option<V>>,
        ttl: Duration,
    ) -> Result<Option<V>> {
        self.adapter
            .get_or_set(&self.ctx, key, value.into(), ttl)
            .await
    }

    /// Returns the value of `key`, computing it with `f` on a miss.
    ///
    /// `f` runs without any cache lock held, so concurrent misses for the
    /// same key may each run it; the last one to store wins. Use
    /// [`Cache::get_or_set_func_lock`] when `f` must run only once.
    pub async fn get_or_set_func<F, Fut>(&self, key: K, f: F, ttl: Duration) -> Result<Option<V>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<V>>> + Send + 'static,
    {
        self.adapter
            .get_or_set_func(&self.ctx, key, boxed_loader(f), ttl)
            .await
    }

    /// Returns the value of `key`, computing it with `f` under the adapter's
    /// write lock on a miss. Concurrent callers wait for the running
    /// computation instead of starting their own.
    pub async fn get_or_set_func_lock<F, Fut>(
        &self,
        key: K,
        f: F,
        ttl: Duration,
    ) -> Result<Option<V>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Option<V>>> + Send + 'static,
    {
        self.adapter
            .get_or_set_func_lock(&self.ctx, key, boxed_loader(f), ttl)
            .await
    }

    pub async fn contains(&self, key: &K) -> Result<bool> {
        self.adapter.contains(&self.ctx, key).await
    }

    /// Remaining lifetime of `key`: zero if it never expires, negative if it
    /// does not exist.
    pub async fn get_expire(&self, key: &K) -> Result<Duration> {
        self.adapter.get_expire(&self.ctx, key).await
    }

    // == Removal And Updates ==
    /// Removes `keys` and returns the value of the last one that existed.
    pub async fn remove(&self, keys: &[K]) -> Result<Option<V>> {
        self.adapter.remove(&self.ctx, keys).await
    }

    /// Replaces the value of `key` keeping its expiration. Returns the old
    /// value and whether the key existed. A `None` value deletes the key.
    pub async fn update(&self, key: &K, value: impl Into<Option<V>>) -> Result<(Option<V>, bool)> {
        self.adapter.update(&self.ctx, key, value.into()).await
    }

    /// Changes the expiration of `key` and returns the previous remaining
    /// lifetime. A negative `ttl` deletes the key.
    pub async fn update_expire(&self, key: &K, ttl: Duration) -> Result<Duration> {
        self.adapter.update_expire(&self.ctx, key, ttl).await
    }

    // == Snapshots ==
    pub async fn size(&self) -> Result<usize> {
        self.adapter.size(&self.ctx).await
    }

    /// Copy of all live key-value pairs. Can be large.
    pub async fn data(&self) -> Result<HashMap<K, V>> {
        self.adapter.data(&self.ctx).await
    }

    pub async fn keys(&self) -> Result<Vec<K>> {
        self.adapter.keys(&self.ctx).await
    }

    /// All live keys rendered as strings.
    pub async fn key_strings(&self) -> Result<Vec<String>>
    where
        K: Display,
    {
        Ok(self
            .keys()
            .await?
            .iter()
            .map(ToString::to_string)
            .collect())
    }

    pub async fn values(&self) -> Result<Vec<V>> {
        self.adapter.values(&self.ctx).await
    }

    // == Lifecycle ==
    /// Drops every entry.
    pub async fn clear(&self) -> Result<()> {
        self.adapter.clear(&self.ctx).await
    }

    /// Closes the adapter shared by this handle and all its clones.
    pub async fn close(&self) -> Result<()> {
        self.adapter.close(&self.ctx).await
    }
}

/// Boxes a user closure into the adapter's [`Loader`] type.
fn boxed_loader<V, F, Fut>(f: F) -> Loader<V>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Option<V>>> + Send + 'static,
{
    Box::new(move || f().boxed())
}
