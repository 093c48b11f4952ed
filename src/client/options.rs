//! Per-call request options and request key derivation.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::models::Method;

// == Request Options ==
/// Options for a single logical call.
///
/// Every field takes part in the request key, so two calls are identical
/// for deduplication and caching only when all options match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestOptions {
    /// Read from and write to the memory cache (GET only)
    pub cache: bool,
    /// TTL used when caching the response
    #[serde(serialize_with = "as_millis")]
    pub cache_ttl: Duration,
    /// Per-attempt timeout
    #[serde(serialize_with = "as_millis")]
    pub timeout: Duration,
    /// Additional attempts after the first failure
    pub retries: u32,
    /// Fixed wait between attempts
    #[serde(serialize_with = "as_millis")]
    pub retry_delay: Duration,
    /// Share one in-flight call between identical concurrent requests
    pub deduplicate: bool,
    pub headers: BTreeMap<String, String>,
    /// JSON request body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            cache: true,
            cache_ttl: Duration::from_secs(5 * 60),
            timeout: Duration::from_secs(10),
            retries: 3,
            retry_delay: Duration::from_secs(1),
            deduplicate: true,
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_deduplicate(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

// == Request Key ==
/// Deterministic identity of a call: `METHOD:endpoint:options-json`.
pub fn request_key(
    method: Method,
    endpoint: &str,
    options: &RequestOptions,
) -> serde_json::Result<String> {
    Ok(format!(
        "{}:{}:{}",
        method,
        endpoint,
        serde_json::to_string(options)?
    ))
}

/// Whether `key` was built by [`request_key`] for exactly this method and
/// endpoint, under any options.
///
/// Endpoints may contain `:`, so a prefix match alone is not enough: the
/// remainder must be the options object and nothing else.
pub(crate) fn key_matches(key: &str, method: Method, endpoint: &str) -> bool {
    key.strip_prefix(&format!("{}:{}:", method, endpoint))
        .is_some_and(|options| {
            serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(options).is_ok()
        })
}
