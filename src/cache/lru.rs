//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for capacity-bounded eviction.

use std::collections::BTreeMap;

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch hands out a fresh, strictly increasing sequence number which the
/// cache entry keeps as its back-reference. The smallest live sequence is the
/// least recently used key.
#[derive(Debug)]
pub struct LruTracker<K> {
    /// Keys ordered by last access
    order: BTreeMap<u64, K>,
    /// Next sequence number to hand out
    next_seq: u64,
    /// Maximum number of live keys, 0 = unbounded
    capacity: usize,
}

impl<K> LruTracker<K> {
    // == Constructor ==
    /// Creates a new empty LRU tracker bounded to `capacity` keys.
    pub fn new(capacity: usize) -> Self {
        Self {
            order: BTreeMap::new(),
            next_seq: 0,
            capacity,
        }
    }

    /// Returns true when a positive capacity is configured.
    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Touch ==
    /// Marks a key as most recently used and returns its new position.
    ///
    /// `current` is the position previously returned for this key, if any.
    pub fn touch(&mut self, key: K, current: Option<u64>) -> u64 {
        if let Some(seq) = current {
            self.order.remove(&seq);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key);
        seq
    }

    // == Remove ==
    /// Removes the key at position `seq` from the tracker.
    pub fn remove(&mut self, seq: u64) -> Option<K> {
        self.order.remove(&seq)
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    ///
    /// Returns None if tracker is empty.
    pub fn evict_oldest(&mut self) -> Option<K> {
        self.order.pop_first().map(|(_, key)| key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    #[allow(dead_code)]
    pub fn peek_oldest(&self) -> Option<&K> {
        self.order.first_key_value().map(|(_, key)| key)
    }

    // == Length ==
    /// Returns the number of tracked keys.
    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
