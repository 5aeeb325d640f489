//! Operation dispatch.
//!
//! Runs one parsed pipeline step against the current image. Single-image
//! operations go straight to the engine. Multi-image operations first fetch
//! a secondary image named by their first parameter. When that URL is not
//! allowed or its fetch fails, the step is skipped and the current image
//! is returned unchanged.

use thiserror::Error;
use tracing::{debug, warn};

use crate::access::AllowList;
use crate::context::RequestContext;
use crate::engine::{EngineError, ImageEngine, ImageHandle, Operation, OperationKind, Outcome};
use crate::fetch::Fetcher;
use crate::metrics::Metrics;
use crate::pipeline::OperationDescriptor;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// No operation with this name exists
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl DispatchError {
    /// Engine failures are runtime faults; unknown operations are not
    pub fn is_runtime_fault(&self) -> bool {
        matches!(self, DispatchError::Engine(_))
    }
}

/// Why a multi-image step was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingUrl,
    Disallowed,
    FetchFailed,
    UpstreamStatus,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::MissingUrl => "missing_url",
            SkipReason::Disallowed => "disallowed",
            SkipReason::FetchFailed => "fetch_failed",
            SkipReason::UpstreamStatus => "upstream_status",
        }
    }
}

/// Executes pipeline steps for one request
pub struct Dispatcher<'a> {
    engine: &'a ImageEngine,
    allow_list: &'a AllowList,
    fetcher: &'a dyn Fetcher,
    metrics: &'a Metrics,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        engine: &'a ImageEngine,
        allow_list: &'a AllowList,
        fetcher: &'a dyn Fetcher,
        metrics: &'a Metrics,
    ) -> Self {
        Self {
            engine,
            allow_list,
            fetcher,
            metrics,
        }
    }

    /// Apply `step` to `current` and return the resulting image.
    ///
    /// A replaced input handle is released before returning. On error the
    /// current handle is dropped, which releases it.
    pub async fn apply(
        &self,
        ctx: &RequestContext,
        current: ImageHandle,
        step: &OperationDescriptor,
    ) -> Result<ImageHandle, DispatchError> {
        let op = Operation::from_name(&step.name)
            .ok_or_else(|| DispatchError::UnknownOperation(step.name.clone()))?;

        match op.kind() {
            OperationKind::SingleImage => self.apply_single(op, current, &step.raw_params),
            OperationKind::MultiImage => self.apply_multi(ctx, op, current, &step.raw_params).await,
        }
    }

    fn apply_single(
        &self,
        op: Operation,
        mut current: ImageHandle,
        params: &[String],
    ) -> Result<ImageHandle, DispatchError> {
        let outcome = self.engine.apply(op, &mut current, params)?;
        self.metrics.increment_step(op.name());

        match outcome {
            Outcome::Replaced(next) => {
                debug!(operation = op.name(), width = next.width(), height = next.height(), "Step replaced image");
                current.release();
                Ok(next)
            }
            Outcome::InPlace => {
                debug!(operation = op.name(), "Step modified image in place");
                Ok(current)
            }
        }
    }

    async fn apply_multi(
        &self,
        ctx: &RequestContext,
        op: Operation,
        mut current: ImageHandle,
        params: &[String],
    ) -> Result<ImageHandle, DispatchError> {
        // Known limitation: the URL is used as split from the parameter
        // list, so a secondary URL containing ',' is cut short.
        let url = match params.first().map(|u| u.trim()).filter(|u| !u.is_empty()) {
            Some(url) => url,
            None => return Ok(self.skip(op, "", SkipReason::MissingUrl, current)),
        };

        if !self.allow_list.is_allowed(url) {
            return Ok(self.skip(op, url, SkipReason::Disallowed, current));
        }

        let response = match self.fetcher.fetch(url, ctx.forwarded_headers()).await {
            Ok(response) => response,
            Err(e) => {
                debug!(operation = op.name(), error = %e, "Secondary fetch failed");
                return Ok(self.skip(op, url, SkipReason::FetchFailed, current));
            }
        };

        if !response.is_success() {
            debug!(operation = op.name(), status = response.status, "Secondary fetch returned non-success");
            return Ok(self.skip(op, url, SkipReason::UpstreamStatus, current));
        }

        let overlay = self.engine.decode(&response.body)?;
        self.engine
            .composite(op, &mut current, &overlay, &params[1..])?;
        overlay.release();
        self.metrics.increment_step(op.name());

        debug!(operation = op.name(), url = %url, "Composited secondary image");
        Ok(current)
    }

    fn skip(
        &self,
        op: Operation,
        url: &str,
        reason: SkipReason,
        current: ImageHandle,
    ) -> ImageHandle {
        warn!(
            operation = op.name(),
            url = %url,
            reason = reason.as_str(),
            "Skipping multi-image step"
        );
        self.metrics.increment_skipped_step(reason.as_str());
        current
    }
}
