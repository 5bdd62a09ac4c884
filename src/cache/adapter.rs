//! Adapter Contract Module
//!
//! The operation set every cache backend implements. The memory adapter is
//! the built-in backend; remote or tiered backends implement the same trait
//! and are interchangeable behind a [`Cache`](crate::Cache).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Duration;
use futures::future::BoxFuture;

use crate::context::Context;
use crate::error::Result;

/// Deferred computation producing the value to cache on a miss.
///
/// `Ok(None)` stores nothing. An error is returned to the caller and nothing
/// is stored.
pub type Loader<V> = Box<dyn FnOnce() -> BoxFuture<'static, Result<Option<V>>> + Send>;

/// Sentinel returned by `get_expire` and `update_expire` for absent keys.
pub fn key_absent() -> Duration {
    Duration::milliseconds(-1)
}

// == Adapter ==
/// Backend contract for a cache.
///
/// Durations are signed: zero never expires, negative deletes the key. A
/// `None` value passed to a write deletes the key as well.
#[async_trait]
pub trait Adapter<K, V>: Send + Sync {
    /// Upserts `key` with `value` expiring after `ttl`.
    async fn set(&self, ctx: &Context, key: K, value: Option<V>, ttl: Duration) -> Result<()>;

    /// Applies `set` to every pair as one batch.
    async fn set_multi(&self, ctx: &Context, data: Vec<(K, Option<V>)>, ttl: Duration)
        -> Result<()>;

    /// Inserts only when `key` is absent or expired. Returns true if inserted.
    async fn set_if_not_exist(
        &self,
        ctx: &Context,
        key: K,
        value: Option<V>,
        ttl: Duration,
    ) -> Result<bool>;

    /// Like `set_if_not_exist`, computing the value only when `key` is missing.
    async fn set_if_not_exist_func(
        &self,
        ctx: &Context,
        key: K,
        loader: Loader<V>,
        ttl: Duration,
    ) -> Result<bool>;

    /// Returns the live value of `key`.
    async fn get(&self, ctx: &Context, key: &K) -> Result<Option<V>>;

    /// Returns the live value, or stores `value` and returns what is now stored.
    async fn get_or_set(
        &self,
        ctx: &Context,
        key: K,
        value: Option<V>,
        ttl: Duration,
    ) -> Result<Option<V>>;

    /// On miss, runs `loader` without holding the adapter lock, then stores
    /// its result. Concurrent misses may each run the loader; the last insert
    /// wins. A `None` result or a negative `ttl` stores nothing and leaves
    /// whatever another caller wrote meanwhile in place.
    async fn get_or_set_func(
        &self,
        ctx: &Context,
        key: K,
        loader: Loader<V>,
        ttl: Duration,
    ) -> Result<Option<V>>;

    /// On miss, runs `loader` while holding the adapter write lock so at most
    /// one computation runs at a time.
    async fn get_or_set_func_lock(
        &self,
        ctx: &Context,
        key: K,
        loader: Loader<V>,
        ttl: Duration,
    ) -> Result<Option<V>>;

    async fn contains(&self, ctx: &Context, key: &K) -> Result<bool>;

    /// Remaining lifetime of `key`: zero if it never expires, [`key_absent`]
    /// if it does not exist.
    async fn get_expire(&self, ctx: &Context, key: &K) -> Result<Duration>;

    /// Removes `keys`, returning the value of the last live key removed.
    async fn remove(&self, ctx: &Context, keys: &[K]) -> Result<Option<V>>;

    /// Replaces the value of a live key without touching its expiration.
    /// Returns the old value and whether the key existed.
    async fn update(&self, ctx: &Context, key: &K, value: Option<V>)
        -> Result<(Option<V>, bool)>;

    /// Changes only the expiration of a live key and returns the old one.
    async fn update_expire(&self, ctx: &Context, key: &K, ttl: Duration) -> Result<Duration>;

    /// Number of live entries.
    async fn size(&self, ctx: &Context) -> Result<usize>;

    /// Copy of all live entries.
    async fn data(&self, ctx: &Context) -> Result<HashMap<K, V>>;

    async fn keys(&self, ctx: &Context) -> Result<Vec<K>>;

    async fn values(&self, ctx: &Context) -> Result<Vec<V>>;

    /// Drops every entry.
    async fn clear(&self, ctx: &Context) -> Result<()>;

    /// Releases background resources. Safe to call more than once.
    async fn close(&self, ctx: &Context) -> Result<()>;
}
