//! Request orchestration.
//!
//! One call to [`ImageProxy::handle`] takes a request from its query string
//! to a finished [`ProxyResponse`]:
//!
//! 1. no `url`: 302 to the configured redirect target
//! 2. `url` not allowed: 403, empty body
//! 3. fetch the source; a non-2xx answer is passed through unchanged
//! 4. decode, run the pipeline step by step, encode
//! 5. on a processing failure: 415 (engine fault) or 500, with the
//!    original bytes and headers as the body
//!
//! Every image handle created along the way is released before `handle`
//! returns, on success and failure alike.

use std::sync::Arc;

use tracing::{debug, error, info, info_span, Instrument};

use crate::access::AllowList;
use crate::config::Config;
use crate::context::RequestContext;
use crate::dispatch::Dispatcher;
use crate::encoder::{self, EncodedImage};
use crate::engine::ImageEngine;
use crate::error::ProcessingError;
use crate::fetch::Fetcher;
use crate::metrics::Metrics;
use crate::pipeline::Pipeline;

use super::request::ImageRequest;
use super::response::ProxyResponse;

/// The image proxy, shared by all requests
pub struct ImageProxy {
    config: Arc<Config>,
    allow_list: AllowList,
    engine: Arc<ImageEngine>,
    fetcher: Arc<dyn Fetcher>,
    metrics: Arc<Metrics>,
}

impl ImageProxy {
    pub fn new(
        config: Arc<Config>,
        engine: Arc<ImageEngine>,
        fetcher: Arc<dyn Fetcher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let allow_list = AllowList::from_config(&config.access);
        Self {
            config,
            allow_list,
            engine,
            fetcher,
            metrics,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &ImageEngine {
        &self.engine
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Handle one image request.
    pub async fn handle<I, K, V>(&self, query: Option<&str>, headers: I) -> ProxyResponse
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.metrics.increment_request_count();
        let ctx = RequestContext::new(headers);
        let span = info_span!("request", request_id = %ctx.request_id());

        let response = self.process(&ctx, query).instrument(span).await;

        self.metrics.increment_status_count(response.status);
        self.metrics.add_bytes_sent(response.body.len() as u64);
        self.metrics.record_duration(ctx.elapsed_ms());
        response
    }

    async fn process(&self, ctx: &RequestContext, query: Option<&str>) -> ProxyResponse {
        let request = match ImageRequest::from_query(query) {
            Some(request) => request,
            None => {
                debug!("No source url, redirecting");
                return ProxyResponse::redirect(&self.config.redirect_url);
            }
        };

        if !self.allow_list.is_allowed(&request.source_url) {
            info!(url = %request.source_url, "Source host not allowed");
            return ProxyResponse::forbidden();
        }

        let upstream = match self
            .fetcher
            .fetch(&request.source_url, ctx.forwarded_headers())
            .await
        {
            Ok(upstream) => upstream,
            Err(e) => {
                error!(url = %request.source_url, error = %e, "Source fetch failed");
                return ProxyResponse::empty_error(500);
            }
        };

        if !upstream.is_success() {
            info!(
                url = %request.source_url,
                status = upstream.status,
                "Passing through upstream response"
            );
            return ProxyResponse::passthrough(upstream);
        }
        debug!(bytes = upstream.body.len(), "Source fetched");

        match self.transform(ctx, &request, &upstream.body).await {
            Ok(encoded) => {
                info!(
                    format = %encoded.format,
                    bytes = encoded.data.len(),
                    "Image transformed"
                );
                ProxyResponse::image(encoded)
            }
            Err(e) => {
                let status = e.status_code();
                self.metrics.increment_fault(e.fault_class());
                error!(
                    url = %request.source_url,
                    fault_class = e.fault_class(),
                    status = status,
                    error = %e,
                    "Image processing failed, returning original bytes"
                );
                ProxyResponse::fallback(status, upstream)
            }
        }
    }

    /// Decode, run the pipeline and encode
    async fn transform(
        &self,
        ctx: &RequestContext,
        request: &ImageRequest,
        source: &[u8],
    ) -> Result<EncodedImage, ProcessingError> {
        let mut current = self.engine.decode(source)?;
        debug!(width = current.width(), height = current.height(), "Source decoded");

        let pipeline = Pipeline::parse(&request.action);
        let dispatcher = Dispatcher::new(
            &self.engine,
            &self.allow_list,
            self.fetcher.as_ref(),
            &self.metrics,
        );

        for step in &pipeline {
            current = dispatcher.apply(ctx, current, step).await?;
        }
        debug!(steps = pipeline.len(), "Pipeline applied");

        let encoded = encoder::encode(&self.engine, &current, request.format, request.quality);
        current.release();
        debug!(live_handles = self.engine.live_handles(), "Handles released");

        Ok(encoded?)
    }
}
