//! Error types for the cache
//!
//! Provides unified error handling using thiserror. A cache miss is never an
//! error: lookups return `Ok(None)` for absent or expired keys.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache adapters and the facade.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Invalid configuration or argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure reported by a non-memory backend (I/O, serialization, ...)
    #[error("Backend failure: {0}")]
    Backend(String),

    /// A compute callback passed to a `get_or_set_func*` call failed
    #[error("Loader failed: {0}")]
    Loader(#[from] anyhow::Error),

    /// The call context was cancelled before the operation completed
    #[error("Operation cancelled")]
    Cancelled,
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
