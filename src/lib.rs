//! Timed Cache - an in-process key-value cache
//!
//! Provides TTL expiration, optional LRU-bounded capacity and compute-on-miss
//! operations behind a swappable adapter. The built-in [`MemoryAdapter`] is
//! swept periodically by a background tokio task.

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod tasks;

pub use cache::{key_absent, Adapter, Cache, CacheStats, Loader, MemoryAdapter};
pub use config::CacheConfig;
pub use context::Context;
pub use error::{CacheError, Result};
