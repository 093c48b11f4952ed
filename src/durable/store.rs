//! Durable Cache Module
//!
//! Key-value cache persisted through a [`StorageBackend`], one slot per key.
//! Every operation round-trips through storage; there is no in-memory index.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DurableConfig;
use crate::durable::codec;
use crate::durable::StorageBackend;
use crate::error::{CacheError, Result, StorageError};

// == Persisted Record ==
/// Shape of a stored slot before optional compression.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedRecord<T> {
    data: T,
    /// Creation time, epoch milliseconds
    timestamp: i64,
    /// Expiry time, epoch milliseconds
    #[serde(rename = "expiresAt")]
    expires_at: i64,
}

impl<T> PersistedRecord<T> {
    fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

// == Durable Cache ==
/// Persistent cache with optional compression.
///
/// Durability is best-effort: write and read failures are logged and never
/// reach the caller. No size bound is enforced; expired slots are removed
/// lazily on read and by [`DurableCache::cleanup`] sweeps.
#[derive(Debug, Clone)]
pub struct DurableCache {
    storage: Arc<dyn StorageBackend>,
    prefix: String,
    default_ttl: Duration,
    cleanup_interval: Duration,
    /// Resolved once at construction
    compress: bool,
}

impl DurableCache {
    // == Constructor ==
    /// Creates a durable cache over `storage`.
    ///
    /// Fails if the prefix is empty or the default TTL or cleanup interval is
    /// zero. Requesting
    /// compression in a build without it logs a warning and stores plain
    /// records.
    pub fn new(config: DurableConfig, storage: Arc<dyn StorageBackend>) -> Result<Self> {
        if config.prefix.is_empty() {
            return Err(CacheError::InvalidConfig(
                "durable cache prefix must not be empty".to_string(),
            ));
        }
        if config.ttl.is_zero() {
            return Err(CacheError::InvalidConfig(
                "default ttl must be greater than zero".to_string(),
            ));
        }
        if config.cleanup_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "cleanup interval must be greater than zero".to_string(),
            ));
        }

        let compress = config.compress && codec::compression_available();
        if config.compress && !compress {
            warn!(
                prefix = %config.prefix,
                "Compression requested but not available; storing uncompressed records"
            );
        }

        info!(prefix = %config.prefix, compress, "Durable cache initialized");

        Ok(Self {
            storage,
            prefix: config.prefix,
            default_ttl: config.ttl,
            cleanup_interval: config.cleanup_interval,
            compress,
        })
    }

    fn slot(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    // == Set ==
    /// Stores `value` under `key`.
    ///
    /// Returns whether the write landed. Failures are logged, never raised,
    /// and a zero TTL is a no-op.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> bool {
        let ttl = ttl.unwrap_or(self.default_ttl);
        if ttl.is_zero() {
            debug!(key, "Skipping durable write with zero TTL");
            return false;
        }

        match self.write_record(key, value, ttl) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "Failed to write durable cache entry");
                false
            }
        }
    }

    fn write_record<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> std::result::Result<(), StorageError> {
        let timestamp = now_ms();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let record = PersistedRecord {
            data: value,
            timestamp,
            expires_at: timestamp.saturating_add(ttl_ms),
        };

        let serialized = serde_json::to_vec(&record)?;
        let payload = if self.compress {
            codec::compress(&serialized)?
        } else {
            serialized
        };

        self.storage.write(&self.slot(key), &payload)
    }

    // == Get ==
    /// Reads a live value.
    ///
    /// Expired or unparseable slots are deleted and read as absent. A live
    /// record whose data does not fit `T` is left in place, as is a
    /// compressed slot read by a build without compression support.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let slot = self.slot(key);
        let raw = match self.storage.read(&slot) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read durable cache entry");
                return None;
            }
        };

        let record: PersistedRecord<serde_json::Value> =
            match serde_json::from_slice(&codec::decode_payload(&raw)) {
                Ok(record) => record,
                Err(_) if codec::needs_compression(&raw) => {
                    warn!(key, "Compressed durable cache entry is unreadable in this build");
                    return None;
                }
                Err(e) => {
                    warn!(key, error = %e, "Discarding corrupt durable cache entry");
                    self.remove_slot(&slot);
                    return None;
                }
            };

        if record.is_expired_at(now_ms()) {
            debug!(key, "Durable cache entry expired");
            self.remove_slot(&slot);
            return None;
        }

        match serde_json::from_value(record.data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Durable cache entry has unexpected shape");
                None
            }
        }
    }

    // == Delete ==
    /// Removes `key`; returns whether a slot existed.
    pub fn delete(&self, key: &str) -> bool {
        self.remove_slot(&self.slot(key))
    }

    // == Clear ==
    /// Removes every slot under this cache's prefix, including ones written
    /// by other instances sharing it. Returns the number removed.
    pub fn clear(&self) -> usize {
        self.prefixed_slots()
            .into_iter()
            .filter(|slot| self.remove_slot(slot))
            .count()
    }

    // == Keys ==
    /// Keys of live entries under this prefix, prefix stripped.
    pub fn keys(&self) -> Vec<String> {
        let now = now_ms();
        self.prefixed_slots()
            .into_iter()
            .filter(|slot| matches!(self.inspect(slot, now), SlotState::Live))
            .filter_map(|slot| slot.strip_prefix(&self.prefix).map(str::to_string))
            .collect()
    }

    // == Cleanup ==
    /// Sweeps every prefixed slot, removing expired and corrupt ones.
    ///
    /// Returns the number of slots removed.
    pub fn cleanup(&self) -> usize {
        let now = now_ms();
        let removed = self
            .prefixed_slots()
            .into_iter()
            .filter(|slot| match self.inspect(slot, now) {
                SlotState::Expired | SlotState::Corrupt => self.remove_slot(slot),
                SlotState::Live | SlotState::Unreadable | SlotState::Missing => false,
            })
            .count();

        if removed > 0 {
            info!(prefix = %self.prefix, removed, "Durable cache cleanup");
        }
        removed
    }

    fn inspect(&self, slot: &str, now: i64) -> SlotState {
        let raw = match self.storage.read(slot) {
            Ok(Some(raw)) => raw,
            Ok(None) => return SlotState::Missing,
            Err(e) => {
                warn!(slot, error = %e, "Failed to read durable slot");
                return SlotState::Missing;
            }
        };

        match serde_json::from_slice::<PersistedRecord<IgnoredAny>>(&codec::decode_payload(&raw)) {
            Ok(record) if record.is_expired_at(now) => SlotState::Expired,
            Ok(_) => SlotState::Live,
            Err(_) if codec::needs_compression(&raw) => SlotState::Unreadable,
            Err(_) => SlotState::Corrupt,
        }
    }

    fn prefixed_slots(&self) -> Vec<String> {
        match self.storage.slots() {
            Ok(slots) => slots
                .into_iter()
                .filter(|slot| slot.starts_with(&self.prefix))
                .collect(),
            Err(e) => {
                warn!(prefix = %self.prefix, error = %e, "Failed to list durable slots");
                Vec::new()
            }
        }
    }

    fn remove_slot(&self, slot: &str) -> bool {
        match self.storage.remove(slot) {
            Ok(removed) => removed,
            Err(e) => {
                warn!(slot, error = %e, "Failed to remove durable slot");
                false
            }
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether records are compressed before being written.
    pub fn is_compressed(&self) -> bool {
        self.compress
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Period of the background sweep started by
    /// [`spawn_durable_cleanup_task`](crate::tasks::spawn_durable_cleanup_task).
    pub fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }
}

enum SlotState {
    Live,
    Expired,
    Corrupt,
    /// Compressed, and this build cannot inflate it
    Unreadable,
    Missing,
}
