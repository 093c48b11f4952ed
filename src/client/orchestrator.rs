//! Request Orchestrator
//!
//! Shepherds one logical call through the memory cache, the in-flight
//! registry, the retry loop and the per-attempt timeout, and always answers
//! with an [`ApiResponse`] envelope.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, MemoryCache};
use crate::client::options::{key_matches, request_key};
use crate::client::retry::{with_timeout, RetryPolicy};
use crate::client::{RequestOptions, Transport};
use crate::config::CacheConfig;
use crate::error::{CacheError, RequestError, Result};
use crate::models::{ApiResponse, BatchRequest, HttpRequest, HttpResponse, Method};

/// Settled outcome of one real network call, shared by every waiter.
type InFlight = Shared<BoxFuture<'static, std::result::Result<Value, RequestError>>>;

// == Request Client ==
/// Cache-aside, deduplicating, retrying HTTP client.
///
/// Owns one memory cache and one in-flight registry. Clones share both, so a
/// clone handed to a background task coalesces with the original.
#[derive(Clone)]
pub struct RequestClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: String,
    transport: Arc<dyn Transport>,
    cache: Mutex<MemoryCache<Value>>,
    /// At most one entry per request key
    pending: Mutex<HashMap<String, InFlight>>,
}

impl fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestClient")
            .field("base_url", &self.inner.base_url)
            .field("pending", &self.inner.pending.lock().len())
            .finish()
    }
}

impl RequestClient {
    // == Constructor ==
    /// Creates a client for `base_url`.
    ///
    /// Fails if the base URL does not parse or the cache configuration is
    /// invalid.
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        cache_config: CacheConfig,
    ) -> Result<Self> {
        let base_url = base_url.into();
        reqwest::Url::parse(&base_url).map_err(|e| {
            CacheError::InvalidConfig(format!("invalid base url '{}': {}", base_url, e))
        })?;

        info!(
            base_url = %base_url,
            max_size = cache_config.max_size,
            strategy = %cache_config.strategy,
            "Request client initialized"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                base_url: base_url.trim_end_matches('/').to_string(),
                transport,
                cache: Mutex::new(MemoryCache::new(cache_config)?),
                pending: Mutex::new(HashMap::new()),
            }),
        })
    }

    // == Verbs ==
    /// Issues a GET, served from the cache when allowed.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>> {
        self.request(Method::Get, endpoint, options).await
    }

    /// Issues a POST; never cached.
    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>> {
        self.request(Method::Post, endpoint, options).await
    }

    /// Issues a PUT; never cached.
    pub async fn put<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>> {
        self.request(Method::Put, endpoint, options).await
    }

    /// Issues a DELETE; never cached.
    pub async fn delete<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse<T>> {
        self.request(Method::Delete, endpoint, options).await
    }

    /// Runs one logical call.
    ///
    /// The outer `Result` is reserved for malformed calls (empty endpoint,
    /// unparsable URL); every network outcome is reported in the envelope.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        mut options: RequestOptions,
    ) -> Result<ApiResponse<T>> {
        if method.is_mutating() {
            options.cache = false;
        }

        let request = self.build_request(method, endpoint, &options)?;
        let key = request_key(method, &normalize_endpoint(endpoint), &options)
            .map_err(|e| CacheError::InvalidRequest(e.to_string()))?;

        let outcome = self.execute(key, request, options).await;

        Ok(match outcome {
            Ok(value) => match serde_json::from_value::<T>(value) {
                Ok(data) => ApiResponse::ok(data),
                Err(e) => ApiResponse::failure(RequestError::Decode(e.to_string()).to_string()),
            },
            Err(e) => ApiResponse::failure(e.to_string()),
        })
    }

    fn build_request(
        &self,
        method: Method,
        endpoint: &str,
        options: &RequestOptions,
    ) -> Result<HttpRequest> {
        if endpoint.trim().is_empty() {
            return Err(CacheError::InvalidRequest(
                "endpoint must not be empty".to_string(),
            ));
        }

        let url = if is_absolute(endpoint) {
            endpoint.to_string()
        } else {
            format!("{}{}", self.inner.base_url, normalize_endpoint(endpoint))
        };
        reqwest::Url::parse(&url)
            .map_err(|e| CacheError::InvalidRequest(format!("invalid url '{}': {}", url, e)))?;

        let mut request = HttpRequest::new(method, url);
        request.headers = options.headers.clone();
        if let Some(body) = &options.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| CacheError::InvalidRequest(e.to_string()))?;
            request.body = Some(bytes);
            if !request
                .headers
                .keys()
                .any(|name| name.eq_ignore_ascii_case("content-type"))
            {
                request
                    .headers
                    .insert("content-type".to_string(), "application/json".to_string());
            }
        }

        Ok(request)
    }

    async fn execute(
        &self,
        key: String,
        request: HttpRequest,
        options: RequestOptions,
    ) -> std::result::Result<Value, RequestError> {
        let cacheable = options.cache && request.method == Method::Get;

        if cacheable {
            if let Some(value) = self.inner.cache.lock().get(&key) {
                debug!(key = %key, "Cache hit");
                return Ok(value);
            }
        }

        if !options.deduplicate {
            return Arc::clone(&self.inner).fetch(key, request, options, false).await;
        }

        let in_flight = {
            let mut pending = self.inner.pending.lock();
            // A call may have settled and cached between the first lookup
            // and taking the registry lock
            if cacheable {
                if let Some(value) = self.inner.cache.lock().get(&key) {
                    return Ok(value);
                }
            }

            match pending.get(&key) {
                Some(existing) => {
                    debug!(key = %key, "Joining in-flight request");
                    existing.clone()
                }
                None => {
                    // Spawned so the call settles and leaves the registry even
                    // if every waiter is dropped
                    let task = tokio::spawn(
                        Arc::clone(&self.inner).fetch(key.clone(), request, options, true),
                    );
                    let call = task
                        .map(|joined| {
                            joined.unwrap_or_else(|e| {
                                Err(RequestError::Transport(format!("request task failed: {}", e)))
                            })
                        })
                        .boxed()
                        .shared();
                    pending.insert(key, call.clone());
                    call
                }
            }
        };

        in_flight.await
    }

    // == Batch ==
    /// Issues GETs concurrently; results come back in input order once all
    /// have settled.
    pub async fn batch<T: DeserializeOwned>(
        &self,
        requests: Vec<BatchRequest>,
    ) -> Vec<Result<ApiResponse<T>>> {
        let calls = requests.into_iter().map(|request| async move {
            self.get::<T>(&request.endpoint, request.options).await
        });
        join_all(calls).await
    }

    // == Prefetch ==
    /// Warms the cache with GETs using default options.
    ///
    /// Fire-and-forget: each endpoint runs on its own spawned task and the
    /// results are dropped. Must be called from within a tokio runtime.
    pub fn prefetch<I, S>(&self, endpoints: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for endpoint in endpoints {
            let endpoint = endpoint.into();
            let client = self.clone();
            tokio::spawn(async move {
                match client.get::<Value>(&endpoint, RequestOptions::default()).await {
                    Ok(response) if response.success => {
                        debug!(endpoint = %endpoint, "Prefetched");
                    }
                    Ok(response) => {
                        debug!(endpoint = %endpoint, error = ?response.error, "Prefetch failed");
                    }
                    Err(e) => {
                        debug!(endpoint = %endpoint, error = %e, "Prefetch rejected");
                    }
                }
            });
        }
    }

    // == Administration ==
    /// Drops every cached response.
    pub fn clear_cache(&self) {
        self.inner.cache.lock().clear();
    }

    /// Statistics of the underlying memory cache.
    pub fn cache_stats(&self) -> CacheStats {
        let mut cache = self.inner.cache.lock();
        cache.cleanup();
        cache.stats()
    }

    /// Drops cached GET responses for `endpoint` under any options.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&self, endpoint: &str) -> usize {
        let endpoint = normalize_endpoint(endpoint);
        self.inner
            .cache
            .lock()
            .delete_where(|key| key_matches(key, Method::Get, &endpoint))
    }

    /// Number of distinct calls currently in flight.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.lock().len()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }
}

impl ClientInner {
    /// The retry loop for one real call, followed by registry removal and
    /// the cache write.
    async fn fetch(
        self: Arc<Self>,
        key: String,
        request: HttpRequest,
        options: RequestOptions,
        registered: bool,
    ) -> std::result::Result<Value, RequestError> {
        let policy = RetryPolicy::new(options.retries, options.retry_delay);
        let outcome = policy
            .execute(|attempt| {
                let transport = Arc::clone(&self.transport);
                let request = request.clone();
                let timeout = options.timeout;
                async move {
                    debug!(method = %request.method, url = %request.url, attempt = attempt + 1, "Sending request");
                    with_timeout(timeout, async move {
                        let response = transport.send(request).await?;
                        decode_response(response)
                    })
                    .await
                }
            })
            .await;

        if let Err(e) = &outcome {
            warn!(method = %request.method, url = %request.url, error = %e, "Request failed");
        }

        let cacheable = options.cache && request.method == Method::Get;
        let mut pending = self.pending.lock();
        if registered {
            pending.remove(&key);
        }
        if let (true, Ok(value)) = (cacheable, &outcome) {
            if let Err(e) = self
                .cache
                .lock()
                .set(key.clone(), value.clone(), Some(options.cache_ttl))
            {
                warn!(key = %key, error = %e, "Response not cached");
            }
        }
        drop(pending);

        outcome
    }
}

fn is_absolute(endpoint: &str) -> bool {
    endpoint.starts_with("http://") || endpoint.starts_with("https://")
}

/// Relative endpoints with and without a leading `/` name the same URL.
fn normalize_endpoint(endpoint: &str) -> Cow<'_, str> {
    if is_absolute(endpoint) || (endpoint.starts_with('/') && !endpoint.starts_with("//")) {
        Cow::Borrowed(endpoint)
    } else {
        Cow::Owned(format!("/{}", endpoint.trim_start_matches('/')))
    }
}

/// Maps a transport response to a JSON value or a classified failure.
fn decode_response(response: HttpResponse) -> std::result::Result<Value, RequestError> {
    if !response.is_success() {
        let text = String::from_utf8_lossy(&response.body);
        let message: String = text.trim().chars().take(200).collect();
        return Err(RequestError::Status {
            status: response.status,
            message: if message.is_empty() {
                "request failed".to_string()
            } else {
                message
            },
        });
    }

    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(&response.body).map_err(|e| RequestError::Decode(e.to_string()))
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    type Responder =
        Box<dyn Fn(usize, &HttpRequest) -> std::result::Result<HttpResponse, RequestError> + Send + Sync>;

    /// Scripted transport counting every dispatched attempt.
    struct MockTransport {
        calls: AtomicUsize,
        delay: Duration,
        requests: Mutex<Vec<HttpRequest>>,
        responder: Responder,
    }

    impl MockTransport {
        fn new<F>(responder: F) -> Arc<Self>
        where
            F: Fn(usize, &HttpRequest) -> std::result::Result<HttpResponse, RequestError>
                + Send
                + Sync
                + 'static,
        {
            Self::with_delay(Duration::ZERO, responder)
        }

        fn with_delay<F>(delay: Duration, responder: F) -> Arc<Self>
        where
            F: Fn(usize, &HttpRequest) -> std::result::Result<HttpResponse, RequestError>
                + Send
                + Sync
                + 'static,
        {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                requests: Mutex::new(Vec::new()),
                responder: Box::new(responder),
            })
        }

        fn json(body: Value) -> Arc<Self> {
            Self::new(move |_, _| Ok(HttpResponse::new(200, body.to_string())))
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, RequestError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().push(request.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.responder)(call, &request)
        }
    }

    fn client(transport: Arc<MockTransport>) -> RequestClient {
        RequestClient::new("https://api.example.com/v1/", transport, CacheConfig::default()).unwrap()
    }

    fn fast() -> RequestOptions {
        RequestOptions::default().with_retry_delay(Duration::from_millis(10))
    }

    #[test]
    fn test_invalid_base_url() {
        let result = RequestClient::new("not a url", MockTransport::json(json!(1)), CacheConfig::default());
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_empty_endpoint_fails_fast() {
        let transport = MockTransport::json(json!(1));
        let client = client(transport.clone());

        let result = client.get::<Value>("  ", fast()).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_url_joining() {
        let transport = MockTransport::json(json!(null));
        let client = client(transport.clone());

        client.get::<Value>("/users", fast()).await.unwrap();
        client.get::<Value>("https://other.example.com/x", fast()).await.unwrap();

        let requests = transport.requests.lock();
        assert_eq!(requests[0].url, "https://api.example.com/v1/users");
        assert_eq!(requests[1].url, "https://other.example.com/x");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_aside_within_and_after_ttl() {
        let transport = MockTransport::json(json!({"id": 1}));
        let client = client(transport.clone());
        let options = fast().with_cache_ttl(Duration::from_secs(60));

        let first = client.get::<Value>("/users/1", options.clone()).await.unwrap();
        let second = client.get::<Value>("/users/1", options.clone()).await.unwrap();

        assert!(first.success && second.success);
        assert_eq!(second.data, Some(json!({"id": 1})));
        assert_eq!(transport.calls(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;

        client.get::<Value>("/users/1", options).await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_cache_disabled_always_dispatches() {
        let transport = MockTransport::json(json!(1));
        let client = client(transport.clone());

        client.get::<u32>("/n", fast().with_cache(false)).await.unwrap();
        client.get::<u32>("/n", fast().with_cache(false)).await.unwrap();

        assert_eq!(transport.calls(), 2);
        assert_eq!(client.cache_stats().total_entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_identical_requests_are_deduplicated() {
        let transport = MockTransport::with_delay(Duration::from_millis(100), |_, _| {
            Ok(HttpResponse::new(200, r#"{"login":"octo"}"#))
        });
        let client = client(transport.clone());

        let (a, b) = tokio::join!(
            client.get::<Value>("/user", fast().with_cache(false)),
            client.get::<Value>("/user", fast().with_cache(false)),
        );

        assert_eq!(transport.calls(), 1);
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a.success && b.success);
        assert_eq!(a.data, b.data);
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deduplication_can_be_disabled() {
        let transport = MockTransport::with_delay(Duration::from_millis(100), |_, _| {
            Ok(HttpResponse::new(200, "1"))
        });
        let client = client(transport.clone());
        let options = fast().with_deduplicate(false).with_cache(false);

        let (a, b) = tokio::join!(
            client.get::<u32>("/n", options.clone()),
            client.get::<u32>("/n", options.clone()),
        );

        assert!(a.unwrap().success && b.unwrap().success);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dedup_waiters_share_final_failure() {
        let transport = MockTransport::with_delay(Duration::from_millis(50), |_, _| {
            Ok(HttpResponse::new(502, "bad gateway"))
        });
        let client = client(transport.clone());
        let options = fast().with_retries(1);

        let (a, b) = tokio::join!(
            client.get::<Value>("/flaky", options.clone()),
            client.get::<Value>("/flaky", options.clone()),
        );

        // One logical call, two attempts, both waiters see the same error
        assert_eq!(transport.calls(), 2);
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(!a.success && !b.success);
        assert_eq!(a.error, b.error);
        assert_eq!(a.error.as_deref(), Some("HTTP 502: bad gateway"));
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_initiator_does_not_strand_registry() {
        let transport = MockTransport::with_delay(Duration::from_secs(5), |_, _| {
            Ok(HttpResponse::new(200, "1"))
        });
        let client = client(transport.clone());
        let options = fast()
            .with_cache(false)
            .with_retries(0)
            .with_timeout(Duration::from_secs(3));

        // The first caller gives up after 1s; its attempt keeps running
        let abandoned =
            tokio::time::timeout(Duration::from_secs(1), client.get::<u32>("/slow", options.clone()))
                .await;
        assert!(abandoned.is_err());
        assert_eq!(client.pending_requests(), 1);

        // The attempt hits its own 3s deadline and leaves the registry
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(client.pending_requests(), 0);
        assert_eq!(transport.calls(), 1);

        // A later caller dispatches afresh and gets a full timeout window
        let start = Instant::now();
        let later = client.get::<u32>("/slow", options).await.unwrap();

        assert!(!later.success);
        assert_eq!(transport.calls(), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(client.pending_requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_completes_after_initiator_is_dropped() {
        let transport = MockTransport::with_delay(Duration::from_secs(2), |_, _| {
            Ok(HttpResponse::new(200, r#"{"id":7}"#))
        });
        let client = client(transport.clone());

        let initiator = {
            let client = client.clone();
            tokio::spawn(async move { client.get::<Value>("/users/7", fast()).await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        initiator.abort();

        // A joiner still receives the outcome of the real attempt
        let joined = client.get::<Value>("/users/7", fast()).await.unwrap();
        assert_eq!(joined.data, Some(json!({"id": 7})));
        assert_eq!(transport.calls(), 1);
        assert_eq!(client.pending_requests(), 0);
        assert_eq!(client.cache_stats().total_entries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unobserved_call_still_fills_cache() {
        let transport = MockTransport::with_delay(Duration::from_secs(2), |_, _| {
            Ok(HttpResponse::new(200, "\"done\""))
        });
        let client = client(transport.clone());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(500), client.get::<String>("/job", fast())).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(client.pending_requests(), 0);

        let cached = client.get::<String>("/job", fast()).await.unwrap();
        assert_eq!(cached.data.as_deref(), Some("done"));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_ceiling() {
        let transport = MockTransport::new(|_, _| Ok(HttpResponse::new(503, "")));
        let client = client(transport.clone());
        let start = Instant::now();

        let response = client
            .get::<Value>("/down", RequestOptions::default().with_retries(2))
            .await
            .unwrap();

        assert!(!response.success);
        assert_eq!(transport.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_are_retried_until_success() {
        let transport = MockTransport::new(|call, _| {
            if call < 2 {
                Err(RequestError::Transport("connection reset".to_string()))
            } else {
                Ok(HttpResponse::new(200, "\"ok\""))
            }
        });
        let client = client(transport.clone());

        let response = client.get::<String>("/eventually", fast()).await.unwrap();

        assert_eq!(response.data.as_deref(), Some("ok"));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_not_retried() {
        let transport = MockTransport::with_delay(Duration::from_secs(30), |_, _| {
            Ok(HttpResponse::new(200, "1"))
        });
        let client = client(transport.clone());

        let response = client
            .get::<u32>("/slow", fast().with_retries(3).with_timeout(Duration::from_secs(1)))
            .await
            .unwrap();

        assert!(!response.success);
        assert!(response.error.unwrap().contains("timed out"));
        assert_eq!(transport.calls(), 1);
        assert_eq!(client.cache_stats().total_entries, 0);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        for status in [400, 401, 403] {
            let transport = MockTransport::new(move |_, _| Ok(HttpResponse::new(status, "nope")));
            let client = client(transport.clone());

            let response = client.get::<Value>("/secret", fast().with_retries(3)).await.unwrap();

            assert!(!response.success);
            assert_eq!(transport.calls(), 1, "status {} retried", status);
        }
    }

    #[tokio::test]
    async fn test_decode_failure_is_reported() {
        let transport = MockTransport::new(|_, _| Ok(HttpResponse::new(200, "<html>")));
        let client = client(transport.clone());

        let response = client.get::<Value>("/html", fast()).await.unwrap();

        assert!(!response.success);
        assert!(response.error.unwrap().starts_with("Failed to decode response"));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_a_failed_envelope() {
        let transport = MockTransport::json(json!({"id": "abc"}));
        let client = client(transport.clone());

        let response = client.get::<Vec<u32>>("/ids", fast()).await.unwrap();
        assert!(!response.success);
        assert!(response.data.is_none());
    }

    #[tokio::test]
    async fn test_mutating_calls_bypass_cache() {
        let transport = MockTransport::new(|_, request| {
            let body = match request.method {
                Method::Get => "\"read\"",
                _ => "\"written\"",
            };
            Ok(HttpResponse::new(200, body))
        });
        let client = client(transport.clone());

        let read = client.get::<String>("/items", fast()).await.unwrap();
        assert_eq!(read.data.as_deref(), Some("read"));

        let written = client.post::<String>("/items", fast()).await.unwrap();
        assert_eq!(written.data.as_deref(), Some("written"));
        client.put::<String>("/items", fast()).await.unwrap();
        client.delete::<String>("/items", fast()).await.unwrap();
        assert_eq!(transport.calls(), 4);

        // The cached GET is untouched by the writes
        let again = client.get::<String>("/items", fast()).await.unwrap();
        assert_eq!(again.data.as_deref(), Some("read"));
        assert_eq!(transport.calls(), 4);
        assert_eq!(client.cache_stats().total_entries, 1);
    }

    #[tokio::test]
    async fn test_body_and_headers_are_sent() {
        let transport = MockTransport::json(json!({"created": true}));
        let client = client(transport.clone());

        client
            .post::<Value>(
                "/items",
                fast()
                    .with_header("authorization", "Bearer t")
                    .with_body(json!({"name": "widget"})),
            )
            .await
            .unwrap();

        let requests = transport.requests.lock();
        let sent = &requests[0];
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.headers.get("authorization").map(String::as_str), Some("Bearer t"));
        assert_eq!(
            sent.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(sent.body.as_deref(), Some(br#"{"name":"widget"}"#.as_slice()));
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let transport = MockTransport::new(|_, _| Ok(HttpResponse::new(204, "")));
        let client = client(transport);

        let response = client.delete::<Option<u32>>("/items/1", fast()).await.unwrap();
        assert!(response.success);
        assert_eq!(response.data, Some(None));
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let transport = MockTransport::new(|_, request| {
            let last = request.url.rsplit('/').next().unwrap_or_default().to_string();
            Ok(HttpResponse::new(200, json!(last).to_string()))
        });
        let client = client(transport.clone());

        let results = client
            .batch::<String>(vec![
                BatchRequest::new("/c"),
                BatchRequest::new("/a"),
                BatchRequest::with_options("/b", fast().with_cache(false)),
            ])
            .await;

        let data: Vec<String> = results
            .into_iter()
            .map(|r| r.unwrap().data.unwrap())
            .collect();
        assert_eq!(data, vec!["c", "a", "b"]);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_prefetch_warms_cache() {
        let transport = MockTransport::json(json!([1, 2, 3]));
        let client = client(transport.clone());

        client.prefetch(["/list"]);
        for _ in 0..100 {
            if client.cache_stats().total_entries == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let response = client
            .get::<Vec<u32>>("/list", RequestOptions::default())
            .await
            .unwrap();
        assert_eq!(response.data, Some(vec![1, 2, 3]));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_clear_and_invalidate() {
        let transport = MockTransport::json(json!(1));
        let client = client(transport.clone());

        client.get::<u32>("/a", fast()).await.unwrap();
        client.get::<u32>("/a", fast().with_retries(0)).await.unwrap();
        client.get::<u32>("/b", fast()).await.unwrap();
        assert_eq!(client.cache_stats().total_entries, 3);

        assert_eq!(client.invalidate("/a"), 2);
        assert_eq!(client.cache_stats().total_entries, 1);
        assert_eq!(client.invalidate("/a"), 0);

        client.clear_cache();
        assert_eq!(client.cache_stats().total_entries, 0);

        client.get::<u32>("/b", fast()).await.unwrap();
        assert_eq!(transport.calls(), 4);
    }

    #[tokio::test]
    async fn test_invalidate_leaves_similar_endpoints() {
        let transport = MockTransport::json(json!(1));
        let client = client(transport.clone());

        client.get::<u32>("/a", fast()).await.unwrap();
        client.get::<u32>("/a:b", fast()).await.unwrap();

        assert_eq!(client.invalidate("/a"), 1);
        assert_eq!(client.cache_stats().total_entries, 1);

        client.get::<u32>("/a:b", fast()).await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_leading_slash_is_the_same_endpoint() {
        let transport = MockTransport::json(json!(1));
        let client = client(transport.clone());

        client.get::<u32>("/users", fast()).await.unwrap();
        client.get::<u32>("users", fast()).await.unwrap();
        assert_eq!(transport.calls(), 1);

        assert_eq!(client.invalidate("users"), 1);
        assert_eq!(client.cache_stats().total_entries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leading_slash_variants_are_deduplicated() {
        let transport = MockTransport::with_delay(Duration::from_millis(100), |_, _| {
            Ok(HttpResponse::new(200, "1"))
        });
        let client = client(transport.clone());

        let (a, b) = tokio::join!(
            client.get::<u32>("/users", fast().with_cache(false)),
            client.get::<u32>("users", fast().with_cache(false)),
        );

        assert!(a.unwrap().success && b.unwrap().success);
        assert_eq!(transport.calls(), 1);
    }
}
