//! Configuration Module
//!
//! Handles loading and validating cache configuration from environment variables.

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CacheError, Result};

/// Default interval between two sweeps of the memory adapter.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of expired keys deleted per write-lock acquisition.
pub const DEFAULT_SWEEP_BATCH_SIZE: usize = 1000;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of live entries, 0 disables LRU eviction
    pub lru_capacity: usize,
    /// Interval between periodic sweeps
    #[serde(with = "duration_ms")]
    pub sweep_interval: Duration,
    /// Expired keys deleted per lock acquisition during a sweep
    pub sweep_batch_size: usize,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_LRU_CAPACITY` - LRU capacity (default: 0, unbounded)
    /// - `CACHE_SWEEP_INTERVAL_MS` - Sweep interval in milliseconds (default: 1000)
    /// - `CACHE_SWEEP_BATCH_SIZE` - Keys deleted per sweep batch (default: 1000)
    pub fn from_env() -> Self {
        Self {
            lru_capacity: env::var("CACHE_LRU_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            sweep_interval: env::var("CACHE_SWEEP_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_SWEEP_INTERVAL),
            sweep_batch_size: env::var("CACHE_SWEEP_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SWEEP_BATCH_SIZE),
        }
    }

    /// Sets the LRU capacity.
    pub fn with_lru_capacity(mut self, capacity: usize) -> Self {
        self.lru_capacity = capacity;
        self
    }

    /// Sets the sweep interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    // == Validate ==
    /// Rejects settings the sweeper cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(CacheError::InvalidArgument(
                "sweep_interval must be greater than zero".to_string(),
            ));
        }
        if self.sweep_batch_size == 0 {
            return Err(CacheError::InvalidArgument(
                "sweep_batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            lru_capacity: 0,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.lru_capacity, 0);
        assert_eq!(config.sweep_interval, Duration::from_secs(1));
        assert_eq!(config.sweep_batch_size, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_LRU_CAPACITY");
        env::remove_var("CACHE_SWEEP_INTERVAL_MS");
        env::remove_var("CACHE_SWEEP_BATCH_SIZE");

        let config = CacheConfig::from_env();
        assert_eq!(config.lru_capacity, 0);
        assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
        assert_eq!(config.sweep_batch_size, DEFAULT_SWEEP_BATCH_SIZE);
    }

    #[test]
    fn test_config_validate_rejects_zero_interval() {
        let config = CacheConfig::default().with_sweep_interval(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(CacheError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_config_validate_rejects_zero_batch() {
        let config = CacheConfig {
            sweep_batch_size: 0,
            ..CacheConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"lru_capacity":64,"sweep_interval":250}"#).unwrap();
        assert_eq!(config.lru_capacity, 64);
        assert_eq!(config.sweep_interval, Duration::from_millis(250));
        assert_eq!(config.sweep_batch_size, DEFAULT_SWEEP_BATCH_SIZE);
    }
}
