//! Expiration Index Module
//!
//! Maps expiration timestamps to the keys expiring at that instant so the
//! sweep only visits buckets that are already due.

use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

// == Expire Index ==
/// Time-bucketed index of expiring keys.
///
/// Buckets are keyed by Unix millisecond timestamps in ascending order.
/// Keys that never expire are not tracked.
#[derive(Debug)]
pub struct ExpireIndex<K> {
    buckets: BTreeMap<i64, HashSet<K>>,
    len: usize,
}

impl<K: Eq + Hash + Clone> ExpireIndex<K> {
    pub fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
            len: 0,
        }
    }

    // == Insert ==
    /// Records `key` as expiring at `expires_at`.
    pub fn insert(&mut self, key: K, expires_at: i64) {
        if self.buckets.entry(expires_at).or_default().insert(key) {
            self.len += 1;
        }
    }

    // == Remove ==
    /// Removes `key` from the bucket at `expires_at`, dropping the bucket once empty.
    pub fn remove(&mut self, key: &K, expires_at: i64) {
        if let Some(bucket) = self.buckets.get_mut(&expires_at) {
            if bucket.remove(key) {
                self.len -= 1;
            }
            if bucket.is_empty() {
                self.buckets.remove(&expires_at);
            }
        }
    }

    /// Moves `key` from its old expiration to a new one.
    pub fn reschedule(&mut self, key: &K, old: Option<i64>, new: Option<i64>) {
        if old == new {
            return;
        }
        if let Some(old) = old {
            self.remove(key, old);
        }
        if let Some(new) = new {
            self.insert(key.clone(), new);
        }
    }

    // == Count Due ==
    /// Number of tracked keys whose expiration is at or before `now`.
    pub fn count_due(&self, now: i64) -> usize {
        self.buckets.range(..=now).map(|(_, keys)| keys.len()).sum()
    }

    // == Take Due ==
    /// Removes and returns up to `limit` keys expiring at or before `now`,
    /// oldest buckets first. Emptied buckets are dropped.
    pub fn take_due(&mut self, now: i64, limit: usize) -> Vec<K> {
        let mut due = Vec::new();
        while due.len() < limit {
            let Some(mut bucket) = self.buckets.first_entry() else {
                break;
            };
            if *bucket.key() > now {
                break;
            }

            let keys = bucket.get_mut();
            let take = (limit - due.len()).min(keys.len());
            let batch: Vec<K> = keys.iter().take(take).cloned().collect();
            for key in &batch {
                keys.remove(key);
            }
            if keys.is_empty() {
                bucket.remove();
            }
            self.len -= batch.len();
            due.extend(batch);
        }
        due
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<K: Eq + Hash + Clone> Default for ExpireIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_count_due() {
        let mut index = ExpireIndex::new();
        index.insert("a", 100);
        index.insert("b", 100);
        index.insert("c", 200);

        assert_eq!(index.len(), 3);
        assert_eq!(index.count_due(99), 0);
        assert_eq!(index.count_due(100), 2);
        assert_eq!(index.count_due(500), 3);
    }

    #[test]
    fn test_remove_drops_empty_bucket() {
        let mut index = ExpireIndex::new();
        index.insert("a", 100);
        index.remove(&"a", 100);

        assert!(index.is_empty());
        assert!(index.buckets.is_empty());
    }

    #[test]
    fn test_remove_wrong_bucket_is_noop() {
        let mut index = ExpireIndex::new();
        index.insert("a", 100);
        index.remove(&"a", 200);

        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_reschedule() {
        let mut index = ExpireIndex::new();
        index.insert("a", 100);

        index.reschedule(&"a", Some(100), Some(300));
        assert_eq!(index.count_due(200), 0);
        assert_eq!(index.count_due(300), 1);

        index.reschedule(&"a", Some(300), None);
        assert!(index.is_empty());
    }

    #[test]
    fn test_take_due_respects_limit_and_order() {
        let mut index = ExpireIndex::new();
        index.insert("a", 100);
        index.insert("b", 150);
        index.insert("c", 150);
        index.insert("d", 400);

        let first = index.take_due(200, 2);
        assert_eq!(first.len(), 2);
        assert!(first.contains(&"a"));

        let second = index.take_due(200, 2);
        assert_eq!(second.len(), 1);

        assert!(index.take_due(200, 2).is_empty());
        assert_eq!(index.len(), 1);
        assert_eq!(index.take_due(400, 10), vec!["d"]);
    }
}
