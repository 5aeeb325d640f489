//! Owned image handles with guaranteed, exactly-once release.
//!
//! A handle is created by [`ImageEngine::decode`](super::ImageEngine::decode)
//! or by an operation that allocates a new image. It is released either
//! explicitly with [`ImageHandle::release`] or implicitly when dropped, so
//! early returns and `?` paths never leak. The `released` flag keeps the
//! release idempotent; the shared [`HandleTracker`] makes the bookkeeping
//! observable.

use image::RgbaImage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide counters of handle allocations and releases
#[derive(Debug, Default)]
pub struct HandleTracker {
    allocated: AtomicU64,
    released: AtomicU64,
}

impl HandleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocated(&self) -> u64 {
        self.allocated.load(Ordering::Acquire)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Acquire)
    }

    /// Handles allocated but not yet released
    pub fn live(&self) -> u64 {
        self.allocated().saturating_sub(self.released())
    }

    fn on_allocate(&self) {
        self.allocated.fetch_add(1, Ordering::AcqRel);
    }

    fn on_release(&self) {
        self.released.fetch_add(1, Ordering::AcqRel);
    }
}

/// Decoded RGBA pixels owned by exactly one request
pub struct ImageHandle {
    pixels: RgbaImage,
    tracker: Arc<HandleTracker>,
    released: bool,
}

impl ImageHandle {
    pub(crate) fn new(pixels: RgbaImage, tracker: Arc<HandleTracker>) -> Self {
        tracker.on_allocate();
        Self {
            pixels,
            tracker,
            released: false,
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Release the handle now instead of at end of scope.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.pixels = RgbaImage::new(0, 0);
            self.tracker.on_release();
        }
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl std::fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHandle")
            .field("dimensions", &self.pixels.dimensions())
            .field("released", &self.released)
            .finish()
    }
}
