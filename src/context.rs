// Request context - per-request state carried through the pipeline

use std::time::Instant;
use uuid::Uuid;

use crate::fetch::forwardable_headers;

/// Information about one inbound request that pipeline steps need
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    forwarded_headers: Vec<(String, String)>,
    started: Instant,
}

impl RequestContext {
    /// Create a context from the inbound headers.
    /// Generates a request ID (UUID v4) and keeps only the headers that may be
    /// replayed to upstream fetches.
    pub fn new<I, K, V>(inbound_headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self {
            request_id: Uuid::new_v4().to_string(),
            forwarded_headers: forwardable_headers(inbound_headers),
            started: Instant::now(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Headers sent along with primary and secondary fetches
    pub fn forwarded_headers(&self) -> &[(String, String)] {
        &self.forwarded_headers
    }

    /// Milliseconds since the context was created
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}
