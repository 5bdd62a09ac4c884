//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use chrono::{Duration, Utc};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<i64>,
    /// Position in the LRU index, None when LRU is disabled
    pub lru_seq: Option<u64>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` after `now`.
    ///
    /// A zero `ttl` never expires. Callers handle negative durations (deletes)
    /// before building an entry.
    pub fn new(value: V, ttl: Duration, now: i64) -> Self {
        Self {
            value,
            expires_at: expire_timestamp(ttl, now),
            lru_seq: None,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now` (Unix milliseconds).
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its expiration time.
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining lifetime of the entry at `now`.
    ///
    /// # Returns
    /// - `Duration::zero()` if the entry never expires
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry is logically expired
    pub fn ttl_remaining_at(&self, now: i64) -> Option<Duration> {
        match self.expires_at {
            None => Some(Duration::zero()),
            Some(expires) => {
                let remaining = expires - now;
                (remaining > 0).then(|| Duration::milliseconds(remaining))
            }
        }
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Converts a TTL relative to `now` into an absolute expiration timestamp.
/// Zero maps to `None` (never expires).
pub fn expire_timestamp(ttl: Duration, now: i64) -> Option<i64> {
    if ttl.is_zero() {
        None
    } else {
        Some(now.saturating_add(ttl.num_milliseconds().max(1)))
    }
}
