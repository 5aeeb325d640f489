//! Responses produced by the image proxy.
//!
//! The orchestrator returns a [`ProxyResponse`] instead of writing to the
//! Pingora session directly, which keeps request handling testable without
//! a live server. The service writes it out.

use bytes::Bytes;

use crate::constants::{CACHE_CONTROL, HOP_BY_HOP_HEADERS};
use crate::encoder::EncodedImage;
use crate::fetch::FetchedResponse;

/// `content-length` is recomputed when the body is written
fn is_replayable(name: &str) -> bool {
    !name.eq_ignore_ascii_case("content-length")
        && !HOP_BY_HOP_HEADERS
            .iter()
            .any(|hop| name.eq_ignore_ascii_case(hop))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ProxyResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// 302 to `location`
    pub fn redirect(location: &str) -> Self {
        Self::new(302).with_header("Location", location)
    }

    /// 403 with an empty body
    pub fn forbidden() -> Self {
        Self::new(403)
    }

    /// Error status with nothing to fall back on
    pub fn empty_error(status: u16) -> Self {
        Self::new(status)
    }

    /// 200 with the transformed image and long-lived caching
    pub fn image(encoded: EncodedImage) -> Self {
        Self {
            status: 200,
            headers: vec![
                ("Content-Type".to_string(), encoded.content_type.to_string()),
                ("Cache-Control".to_string(), CACHE_CONTROL.to_string()),
            ],
            body: Bytes::from(encoded.data),
        }
    }

    /// Upstream status, headers and body forwarded as-is
    pub fn passthrough(upstream: FetchedResponse) -> Self {
        let status = upstream.status;
        Self::fallback(status, upstream)
    }

    /// `status` with the original upstream bytes and headers
    pub fn fallback(status: u16, upstream: FetchedResponse) -> Self {
        Self {
            status,
            headers: replayable_headers(upstream.headers),
            body: upstream.body,
        }
    }

    /// JSON body, used by the service endpoints
    pub fn json(status: u16, body: String) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Bytes::from(body),
        }
    }

    /// Prometheus text exposition
    pub fn prometheus(body: String) -> Self {
        Self {
            status: 200,
            headers: vec![(
                "Content-Type".to_string(),
                "text/plain; version=0.0.4".to_string(),
            )],
            body: Bytes::from(body),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// First header value with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn replayable_headers(headers: Vec<(String, String)>) -> Vec<(String, String)> {
    headers
        .into_iter()
        .filter(|(name, _)| is_replayable(name))
        .collect()
}
