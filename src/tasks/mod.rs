//! Background Tasks Module
//!
//! Contains background tasks that run periodically for the lifetime of an adapter.
//!
//! # Tasks
//! - Sweeper: Replays LRU touches and removes expired entries at a fixed interval

mod sweeper;

pub use sweeper::{spawn_sweeper, Maintain};
