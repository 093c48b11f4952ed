//! Transport seam
//!
//! The orchestrator never talks to the network itself; it hands resolved
//! requests to a [`Transport`]. Cancellation is by dropping the returned
//! future, which is what the per-attempt timeout does.

use async_trait::async_trait;
use tracing::debug;

use crate::error::RequestError;
use crate::models::{HttpRequest, HttpResponse, Method};

/// Sends one HTTP request.
///
/// Implementations return `Ok` for any response that reached the server,
/// whatever its status, and `Err(RequestError::Transport)` for
/// connection-level failures.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError>;
}

// == Reqwest Transport ==
/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client (proxies, TLS roots, default headers).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RequestError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| RequestError::Transport(e.to_string()))?
            .to_vec();

        debug!(url = %request.url, status, bytes = body.len(), "Transport response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
