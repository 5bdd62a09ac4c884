//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and LRU eviction behind a
//! pluggable adapter contract.

mod adapter;
mod entry;
mod expire;
mod facade;
mod lru;
mod memory;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use adapter::{key_absent, Adapter, Loader};
pub use entry::CacheEntry;
pub use facade::Cache;
pub use memory::MemoryAdapter;
pub use stats::CacheStats;
