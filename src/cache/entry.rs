//! Cache Entry Module
//!
//! Defines the expiring entry stored by the memory cache.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A value wrapped with its creation time and absolute expiry.
///
/// Times come from `tokio::time::Instant`, which is a plain monotonic clock
/// outside a runtime and follows the mocked clock under `tokio::time::pause`.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion (or last overwrite) time
    pub created_at: Instant,
    /// `created_at + ttl`
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry expiring `ttl` from now.
    pub fn new(value: V, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time reaches
    /// `expires_at`, so a TTL that has fully elapsed never serves a value.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Expiry check against an explicit instant, used by sweeps so every entry
    /// in one pass is judged against the same clock reading.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining TTL, `Duration::ZERO` once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}
