//! Image engine
//!
//! The pixel-level boundary of the proxy. The orchestrator only sees:
//! - [`ImageEngine::decode`] producing an owned [`ImageHandle`]
//! - [`ImageEngine::apply`] for single-image operations
//! - [`ImageEngine::composite`] for operations taking a second image
//! - [`ImageEngine::encode_jpeg`] and [`ImageEngine::encode_lossless`]
//!
//! One engine is created at startup and shared by all requests. It holds
//! no per-request state beyond the handle counters.

pub mod codec;
pub mod composite;
pub mod error;
pub mod handle;
pub mod limits;
pub mod operations;
pub mod transform;

use image::RgbaImage;
use std::collections::HashSet;
use std::sync::Arc;

pub use composite::BlendMode;
pub use error::EngineError;
pub use handle::{HandleTracker, ImageHandle};
pub use limits::ImageLimits;
pub use operations::{Operation, OperationKind, Outcome};

#[derive(Debug, Default)]
pub struct ImageEngine {
    tracker: Arc<HandleTracker>,
    limits: ImageLimits,
}

impl ImageEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ImageLimits) -> Self {
        Self {
            tracker: Arc::default(),
            limits,
        }
    }

    /// Check the operation table before serving traffic.
    ///
    /// Returns the number of registered operations.
    pub fn verify_capabilities(&self) -> Result<usize, EngineError> {
        let mut seen = HashSet::new();
        for (name, op) in Operation::names().zip(Operation::all()) {
            if !seen.insert(name) {
                return Err(EngineError::operation(name, "registered twice"));
            }
            if Operation::from_name(name) != Some(op) || op.name() != name {
                return Err(EngineError::operation(name, "name does not resolve to itself"));
            }
        }

        tracing::info!(
            operations = ?Operation::names().collect::<Vec<_>>(),
            "Image engine capabilities verified"
        );
        Ok(seen.len())
    }

    pub fn decode(&self, data: &[u8]) -> Result<ImageHandle, EngineError> {
        let pixels = codec::decode_rgba(data, &self.limits)?;
        Ok(self.adopt(pixels))
    }

    /// Wrap pixels produced outside the engine in a tracked handle.
    pub fn adopt(&self, pixels: RgbaImage) -> ImageHandle {
        ImageHandle::new(pixels, Arc::clone(&self.tracker))
    }

    pub fn apply(
        &self,
        op: Operation,
        image: &mut ImageHandle,
        params: &[String],
    ) -> Result<Outcome, EngineError> {
        transform::apply_single(op, image, params, &self.tracker, &self.limits)
    }

    /// Composite `overlay` into `base` in place.
    pub fn composite(
        &self,
        op: Operation,
        base: &mut ImageHandle,
        overlay: &ImageHandle,
        params: &[String],
    ) -> Result<(), EngineError> {
        composite::apply_composite(op, base, overlay, params)
    }

    pub fn encode_jpeg(&self, image: &ImageHandle, quality: u8) -> Result<Vec<u8>, EngineError> {
        codec::encode_jpeg(image.pixels(), quality)
    }

    /// Lossless PNG bytes
    pub fn encode_lossless(&self, image: &ImageHandle) -> Result<Vec<u8>, EngineError> {
        codec::encode_png(image.pixels())
    }

    pub fn live_handles(&self) -> u64 {
        self.tracker.live()
    }

    pub fn tracker(&self) -> &Arc<HandleTracker> {
        &self.tracker
    }

    pub fn limits(&self) -> &ImageLimits {
        &self.limits
    }
}
