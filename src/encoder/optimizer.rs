//! Output optimizer for the lossy delivery formats.
//!
//! Takes the final RGBA pixels and produces lossy WebP (libwebp via the
//! `webp` crate) or AVIF (`ravif`). Failures here are not engine faults:
//! the proxy reports them as 500, not 415.

use imgref::Img;
use rgb::FromSlice;
use thiserror::Error;

use image::RgbaImage;

use crate::constants::DEFAULT_AVIF_SPEED;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizeTarget {
    WebP,
    Avif,
}

impl OptimizeTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizeTarget::WebP => "webp",
            OptimizeTarget::Avif => "avif",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Optimizer failed to produce {target}: {message}")]
pub struct OptimizeError {
    pub target: &'static str,
    pub message: String,
}

/// Re-encode `pixels` for delivery at the given quality (1..=100).
pub fn optimize(
    pixels: &RgbaImage,
    target: OptimizeTarget,
    quality: u8,
) -> Result<Vec<u8>, OptimizeError> {
    let quality = quality.clamp(1, 100);
    match target {
        OptimizeTarget::WebP => encode_webp(pixels, quality),
        OptimizeTarget::Avif => encode_avif(pixels, quality),
    }
}

fn encode_webp(pixels: &RgbaImage, quality: u8) -> Result<Vec<u8>, OptimizeError> {
    let encoder = webp::Encoder::from_rgba(pixels.as_raw(), pixels.width(), pixels.height());
    let memory = encoder
        .encode_simple(false, quality as f32)
        .map_err(|e| OptimizeError {
            target: OptimizeTarget::WebP.as_str(),
            message: format!("{:?}", e),
        })?;
    Ok(memory.to_vec())
}

fn encode_avif(pixels: &RgbaImage, quality: u8) -> Result<Vec<u8>, OptimizeError> {
    let buffer = Img::new(
        pixels.as_raw().as_rgba(),
        pixels.width() as usize,
        pixels.height() as usize,
    );

    let encoded = ravif::Encoder::new()
        .with_quality(quality as f32)
        .with_speed(DEFAULT_AVIF_SPEED)
        .encode_rgba(buffer)
        .map_err(|e| OptimizeError {
            target: OptimizeTarget::Avif.as_str(),
            message: e.to_string(),
        })?;

    Ok(encoded.avif_file)
}
