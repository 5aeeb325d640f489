//! Outbound image fetching.
//!
//! The orchestrator talks to the network only through the [`Fetcher`]
//! trait so request handling can be driven by an in-memory fetcher in
//! tests. [`HttpFetcher`] is the production implementation on `reqwest`.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

use crate::config::FetchConfig;
use crate::constants::HOP_BY_HOP_HEADERS;

/// Request headers never replayed to an upstream, on top of the hop-by-hop
/// set. Bodies are decoded as images, so the upstream must not compress them.
const NON_FORWARDABLE_HEADERS: &[&str] = &["host", "content-length", "accept-encoding"];

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Request to '{url}' failed: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to read body from '{url}': {message}")]
    Body { url: String, message: String },
}

/// A complete upstream response, body fully buffered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl FetchedResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url`, sending `headers` along.
    ///
    /// Non-2xx responses are returned as `Ok`; only failures to obtain a
    /// response at all are errors.
    async fn fetch(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<FetchedResponse, FetchError>;
}

/// Fetcher backed by a shared `reqwest` client
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS setup).
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<FetchedResponse, FetchError> {
        let target = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let mut request = self.client.get(target);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        let body = response.bytes().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!(url = %url, status = status, bytes = body.len(), "Upstream fetch completed");

        Ok(FetchedResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}

/// Inbound headers that may be replayed to an upstream fetch
pub fn forwardable_headers<I, K, V>(headers: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    headers
        .into_iter()
        .filter(|(name, _)| {
            !NON_FORWARDABLE_HEADERS
                .iter()
                .chain(HOP_BY_HOP_HEADERS)
                .any(|blocked| name.as_ref().eq_ignore_ascii_case(blocked))
        })
        .map(|(name, value)| (name.as_ref().to_string(), value.as_ref().to_string()))
        .collect()
}
