//! Output format selection and encoding.
//!
//! - `jpeg` / `jpg`: engine JPEG encoder at the requested quality
//! - `png`: engine lossless encoder, quality ignored
//! - `webp`, `avif`: the optimizer at the requested quality
//!
//! Names are matched case-insensitively. Anything else falls back to the
//! default WebP output, labelled `image/webp`.

pub mod optimizer;

use std::fmt;
use thiserror::Error;

use crate::engine::{EngineError, ImageEngine, ImageHandle};

pub use optimizer::{optimize, OptimizeError, OptimizeTarget};

/// Delivery format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
}

impl OutputFormat {
    /// Recognized format name, or `None`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(OutputFormat::Jpeg),
            "png" => Some(OutputFormat::Png),
            "webp" => Some(OutputFormat::WebP),
            "avif" => Some(OutputFormat::Avif),
            _ => None,
        }
    }

    /// Resolve a requested name, falling back to WebP for unknown names.
    pub fn resolve(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            tracing::warn!(
                format = %name,
                fallback = "webp",
                "Unrecognized output format, using default"
            );
            OutputFormat::WebP
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
            OutputFormat::Avif => "avif",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
            OutputFormat::Avif => "image/avif",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub content_type: &'static str,
}

impl EncodedImage {
    pub fn new(data: Vec<u8>, format: OutputFormat) -> Self {
        Self {
            data,
            format,
            content_type: format.content_type(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Optimize(#[from] OptimizeError),
}

/// Encode `image` into `format` at `quality` (0..=100).
pub fn encode(
    engine: &ImageEngine,
    image: &ImageHandle,
    format: OutputFormat,
    quality: u8,
) -> Result<EncodedImage, EncodeError> {
    let data = match format {
        OutputFormat::Jpeg => engine.encode_jpeg(image, quality)?,
        OutputFormat::Png => engine.encode_lossless(image)?,
        OutputFormat::WebP => optimize(image.pixels(), OptimizeTarget::WebP, quality)?,
        OutputFormat::Avif => optimize(image.pixels(), OptimizeTarget::Avif, quality)?,
    };

    Ok(EncodedImage::new(data, format))
}
