//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the memory adapter against a plain HashMap model and
//! the LRU ordering rules.

use std::collections::{HashMap, HashSet};

use chrono::Duration;
use proptest::prelude::*;
use tokio_test::block_on;

use crate::cache::{Adapter, MemoryAdapter};
use crate::context::Context;

// == Strategies ==
/// Generates cache keys from a small alphabet so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e][0-9]{0,1}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = u32> {
    any::<u32>()
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Option<u32> },
    Get { key: String },
    Remove { key: String },
    Update { key: String, value: u32 },
    SetIfNotExist { key: String, value: u32 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), prop::option::weighted(0.9, value_strategy()))
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Remove { key }),
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Update { key, value }),
        (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::SetIfNotExist { key, value }),
    ]
}

/// Distinct keys in first-seen order.
fn dedup(keys: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Any sequence of never-expiring operations on an unbounded cache behaves
    // like a HashMap.
    #[test]
    fn prop_matches_hashmap_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let ctx = Context::background();
        let adapter = MemoryAdapter::new(0);
        let mut model: HashMap<String, u32> = HashMap::new();

        block_on(async {
            for op in ops {
                match op {
                    CacheOp::Set { key, value } => {
                        adapter.set(&ctx, key.clone(), value, Duration::zero()).await.unwrap();
                        match value {
                            Some(value) => model.insert(key, value),
                            None => model.remove(&key),
                        };
                    }
                    CacheOp::Get { key } => {
                        let got = adapter.get(&ctx, &key).await.unwrap();
                        prop_assert_eq!(got, model.get(&key).copied());
                    }
                    CacheOp::Remove { key } => {
                        let got = adapter.remove(&ctx, &[key.clone()]).await.unwrap();
                        prop_assert_eq!(got, model.remove(&key));
                    }
                    CacheOp::Update { key, value } => {
                        let (old, existed) = adapter.update(&ctx, &key, Some(value)).await.unwrap();
                        prop_assert_eq!(existed, model.contains_key(&key));
                        prop_assert_eq!(old, model.get(&key).copied());
                        if existed {
                            model.insert(key, value);
                        }
                    }
                    CacheOp::SetIfNotExist { key, value } => {
                        let inserted = adapter
                            .set_if_not_exist(&ctx, key.clone(), Some(value), Duration::zero())
                            .await
                            .unwrap();
                        prop_assert_eq!(inserted, !model.contains_key(&key));
                        model.entry(key).or_insert(value);
                    }
                }
            }

            prop_assert_eq!(adapter.size(&ctx).await.unwrap(), model.len());
            prop_assert_eq!(&adapter.data(&ctx).await.unwrap(), &model);
            Ok(())
        })?;
    }

    // The number of live entries never exceeds the LRU capacity.
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((key_strategy(), value_strategy()), 1..200),
        capacity in 1usize..20
    ) {
        let ctx = Context::background();
        let adapter = MemoryAdapter::new(capacity);

        block_on(async {
            for (key, value) in entries {
                adapter.set(&ctx, key, Some(value), Duration::zero()).await.unwrap();
                let size = adapter.size(&ctx).await.unwrap();
                prop_assert!(size <= capacity, "Cache size {} exceeds capacity {}", size, capacity);
            }
            Ok(())
        })?;
    }

    // Without reads, inserting one key past capacity evicts the first key inserted.
    #[test]
    fn prop_lru_eviction_order(
        initial_keys in prop::collection::vec(key_strategy(), 2..12),
        new_key in key_strategy()
    ) {
        let unique_keys = dedup(initial_keys);
        prop_assume!(unique_keys.len() >= 2);
        prop_assume!(!unique_keys.contains(&new_key));

        let ctx = Context::background();
        let adapter = MemoryAdapter::new(unique_keys.len());

        block_on(async {
            for key in &unique_keys {
                adapter.set(&ctx, key.clone(), Some(1u32), Duration::zero()).await.unwrap();
            }
            adapter.set(&ctx, new_key.clone(), Some(2), Duration::zero()).await.unwrap();

            prop_assert_eq!(adapter.size(&ctx).await.unwrap(), unique_keys.len());
            prop_assert!(!adapter.contains(&ctx, &unique_keys[0]).await.unwrap());
            prop_assert!(adapter.contains(&ctx, &new_key).await.unwrap());
            for key in unique_keys.iter().skip(1) {
                prop_assert!(adapter.contains(&ctx, key).await.unwrap(), "Key '{}' should remain", key);
            }
            Ok(())
        })?;
    }

    // A read makes a key the most recently used, so the next key in insertion
    // order is evicted instead.
    #[test]
    fn prop_lru_access_tracking(
        keys in prop::collection::vec(key_strategy(), 3..12),
        new_key in key_strategy()
    ) {
        let unique_keys = dedup(keys);
        prop_assume!(unique_keys.len() >= 3);
        prop_assume!(!unique_keys.contains(&new_key));

        let ctx = Context::background();
        let adapter = MemoryAdapter::new(unique_keys.len());

        block_on(async {
            for key in &unique_keys {
                adapter.set(&ctx, key.clone(), Some(1u32), Duration::zero()).await.unwrap();
            }
            adapter.get(&ctx, &unique_keys[0]).await.unwrap();
            adapter.set(&ctx, new_key.clone(), Some(2), Duration::zero()).await.unwrap();

            prop_assert!(adapter.contains(&ctx, &unique_keys[0]).await.unwrap());
            prop_assert!(!adapter.contains(&ctx, &unique_keys[1]).await.unwrap());
            prop_assert!(adapter.contains(&ctx, &new_key).await.unwrap());
            Ok(())
        })?;
    }

    // Mutating a returned snapshot never leaks back into the cache.
    #[test]
    fn prop_snapshot_isolation(keys in prop::collection::vec(key_strategy(), 1..20)) {
        let ctx = Context::background();
        let adapter = MemoryAdapter::new(0);

        block_on(async {
            for key in &keys {
                adapter.set(&ctx, key.clone(), Some(0u32), Duration::zero()).await.unwrap();
            }

            let mut before = adapter.keys(&ctx).await.unwrap();
            let mut snapshot = before.clone();
            snapshot.push("intruder".to_string());
            let last = snapshot.len() - 1;
            snapshot.swap(0, last);

            let mut after = adapter.keys(&ctx).await.unwrap();
            before.sort();
            after.sort();
            prop_assert_eq!(before, after);
            Ok(())
        })?;
    }
}
