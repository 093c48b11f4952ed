//! Configuration Module
//!
//! Construction-time settings for the memory and durable caches, loadable from
//! environment variables or embedded in an application's own configuration.

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::EvictionPolicy;

/// Default TTL for the memory cache (5 minutes)
pub const DEFAULT_MEMORY_TTL: Duration = Duration::from_secs(5 * 60);

/// Default TTL for the durable cache (24 hours)
pub const DEFAULT_DURABLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Default maximum number of memory cache entries
pub const DEFAULT_MAX_SIZE: usize = 100;

/// Default slot prefix for durable storage
pub const DEFAULT_PREFIX: &str = "app_cache_";

/// Default interval between durable cleanup sweeps (10 minutes)
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

// == Memory Cache Config ==
/// Bounded memory cache configuration.
///
/// Fixed at construction; the cache never changes these afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL applied when `set` is called without an explicit one
    #[serde(rename = "ttl_secs", with = "duration_secs")]
    pub ttl: Duration,
    /// Maximum number of live entries
    pub max_size: usize,
    /// Eviction policy used once `max_size` is reached
    pub strategy: EvictionPolicy,
}

impl CacheConfig {
    /// Loads memory cache settings from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_SECS` - Default TTL in seconds (default: 300)
    /// - `CACHE_MAX_SIZE` - Maximum entries (default: 100)
    /// - `CACHE_STRATEGY` - `lru` or `fifo` (default: lru)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl: env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.ttl),
            max_size: env::var("CACHE_MAX_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_size),
            strategy: env::var("CACHE_STRATEGY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.strategy),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_MEMORY_TTL,
            max_size: DEFAULT_MAX_SIZE,
            strategy: EvictionPolicy::Lru,
        }
    }
}

// == Durable Cache Config ==
/// Durable cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DurableConfig {
    /// TTL applied when `set` is called without an explicit one
    #[serde(rename = "ttl_secs", with = "duration_secs")]
    pub ttl: Duration,
    /// Slot name prefix; the only isolation between durable caches
    pub prefix: String,
    /// Gzip records before writing them, when the build supports it
    pub compress: bool,
    /// Interval for the background sweep task
    #[serde(rename = "cleanup_interval_secs", with = "duration_secs")]
    pub cleanup_interval: Duration,
}

impl DurableConfig {
    /// Loads durable cache settings from environment variables.
    ///
    /// # Environment Variables
    /// - `DURABLE_CACHE_TTL_SECS` - Default TTL in seconds (default: 86400)
    /// - `DURABLE_CACHE_PREFIX` - Slot prefix (default: `app_cache_`)
    /// - `DURABLE_CACHE_COMPRESS` - `true`/`false` (default: false)
    /// - `DURABLE_CLEANUP_INTERVAL_SECS` - Sweep interval (default: 600)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ttl: env::var("DURABLE_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.ttl),
            prefix: env::var("DURABLE_CACHE_PREFIX")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.prefix),
            compress: env::var("DURABLE_CACHE_COMPRESS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.compress),
            cleanup_interval: env::var("DURABLE_CLEANUP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_interval),
        }
    }
}

impl Default for DurableConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_DURABLE_TTL,
            prefix: DEFAULT_PREFIX.to_string(),
            compress: false,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

/// Serde adapter reading durations as whole seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(300));
        assert_eq!(config.max_size, 100);
        assert_eq!(config.strategy, EvictionPolicy::Lru);
    }

    #[test]
    fn test_durable_config_default() {
        let config = DurableConfig::default();
        assert_eq!(config.ttl, Duration::from_secs(86_400));
        assert_eq!(config.prefix, "app_cache_");
        assert!(!config.compress);
        assert_eq!(config.cleanup_interval, Duration::from_secs(600));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_TTL_SECS");
        env::remove_var("CACHE_MAX_SIZE");
        env::remove_var("CACHE_STRATEGY");
        env::remove_var("DURABLE_CACHE_TTL_SECS");
        env::remove_var("DURABLE_CACHE_PREFIX");
        env::remove_var("DURABLE_CACHE_COMPRESS");
        env::remove_var("DURABLE_CLEANUP_INTERVAL_SECS");

        assert_eq!(CacheConfig::from_env(), CacheConfig::default());
        assert_eq!(DurableConfig::from_env(), DurableConfig::default());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let json = r#"{"max_size": 2, "strategy": "fifo"}"#;
        let config: CacheConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_size, 2);
        assert_eq!(config.strategy, EvictionPolicy::Fifo);
        assert_eq!(config.ttl, DEFAULT_MEMORY_TTL);

        let json = r#"{"ttl_secs": 60, "prefix": "session_", "compress": true}"#;
        let config: DurableConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.ttl, Duration::from_secs(60));
        assert_eq!(config.prefix, "session_");
        assert!(config.compress);
    }
}
