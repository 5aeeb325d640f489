// Pingora service - answers every request locally from the image proxy

use async_trait::async_trait;
use pingora_core::upstreams::peer::HttpPeer;
use pingora_core::Result;
use pingora_http::ResponseHeader;
use pingora_proxy::{ProxyHttp, Session};
use std::sync::Arc;
use std::time::Instant;

use crate::constants::{HEALTH_PATH, METRICS_PATH};

use super::handler::ImageProxy;
use super::helpers::extract_headers;
use super::response::ProxyResponse;

/// EdgepixService implements the Pingora ProxyHttp trait.
/// Requests never reach an upstream peer: `request_filter` writes the
/// response itself.
pub struct EdgepixService {
    proxy: Arc<ImageProxy>,
    start_time: Instant,
}

impl EdgepixService {
    pub fn new(proxy: Arc<ImageProxy>) -> Self {
        Self {
            proxy,
            start_time: Instant::now(),
        }
    }

    /// Build the response for a path and query without touching a session
    pub async fn respond(
        &self,
        path: &str,
        query: Option<&str>,
        headers: Vec<(String, String)>,
    ) -> ProxyResponse {
        match path {
            HEALTH_PATH => handle_health(self.start_time),
            METRICS_PATH => ProxyResponse::prometheus(self.proxy.metrics().export_prometheus()),
            _ => self.proxy.handle(query, headers).await,
        }
    }
}

/// Health status with uptime and version information
pub fn handle_health(start_time: Instant) -> ProxyResponse {
    let body = serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": start_time.elapsed().as_secs()
    })
    .to_string();

    ProxyResponse::json(200, body)
}

async fn write_response(session: &mut Session, response: ProxyResponse) -> Result<()> {
    let mut header = ResponseHeader::build(response.status, Some(response.headers.len() + 1))?;
    for (name, value) in response.headers {
        header.append_header(name, value)?;
    }
    header.insert_header("Content-Length", response.body.len().to_string())?;

    session
        .write_response_header(Box::new(header), false)
        .await?;
    session
        .write_response_body(Some(response.body), true)
        .await?;
    Ok(())
}

#[async_trait]
impl ProxyHttp for EdgepixService {
    type CTX = ();

    fn new_ctx(&self) -> Self::CTX {}

    async fn upstream_peer(
        &self,
        _session: &mut Session,
        _ctx: &mut Self::CTX,
    ) -> Result<Box<HttpPeer>> {
        Err(pingora_core::Error::explain(
            pingora_core::ErrorType::InternalError,
            "Requests are answered in request_filter",
        ))
    }

    async fn request_filter(&self, session: &mut Session, _ctx: &mut Self::CTX) -> Result<bool> {
        let req = session.req_header();
        let path = req.uri.path().to_string();
        let query = req.uri.query().map(str::to_string);
        let headers = extract_headers(req);

        let response = self.respond(&path, query.as_deref(), headers).await;
        write_response(session, response).await?;

        // Response already sent
        Ok(true)
    }
}
