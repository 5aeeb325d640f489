//! Decoding and the engine's own encoders (JPEG and lossless PNG).

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::io::{Limits, Reader as ImageReader};
use image::{ColorType, ImageEncoder as _, RgbaImage};
use std::io::Cursor;

use super::error::EngineError;
use super::limits::ImageLimits;

fn reader(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, EngineError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| EngineError::decode(e.to_string()))
}

/// Decode any supported container into RGBA pixels.
///
/// The header is read first so oversized sources are rejected before the
/// pixel buffer is allocated.
pub(crate) fn decode_rgba(data: &[u8], limits: &ImageLimits) -> Result<RgbaImage, EngineError> {
    let (width, height) = reader(data)?
        .into_dimensions()
        .map_err(|e| EngineError::decode(e.to_string()))?;
    limits
        .check("decode", width, height)
        .map_err(|e| EngineError::decode(e.to_string()))?;

    let mut decoder_limits = Limits::default();
    decoder_limits.max_image_width = Some(limits.max_width);
    decoder_limits.max_image_height = Some(limits.max_height);

    let mut reader = reader(data)?;
    reader.limits(decoder_limits);
    let image = reader
        .decode()
        .map_err(|e| EngineError::decode(e.to_string()))?;
    Ok(image.to_rgba8())
}

/// JPEG has no alpha channel; quality is clamped to 1..=100
pub(crate) fn encode_jpeg(pixels: &RgbaImage, quality: u8) -> Result<Vec<u8>, EngineError> {
    let rgb = rgba_to_rgb(pixels.as_raw());

    let mut output = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut output, quality.clamp(1, 100))
        .write_image(&rgb, pixels.width(), pixels.height(), ColorType::Rgb8)
        .map_err(|e| EngineError::encode("jpeg", e.to_string()))?;

    Ok(output.into_inner())
}

pub(crate) fn encode_png(pixels: &RgbaImage) -> Result<Vec<u8>, EngineError> {
    let mut output = Cursor::new(Vec::new());
    PngEncoder::new(&mut output)
        .write_image(pixels.as_raw(), pixels.width(), pixels.height(), ColorType::Rgba8)
        .map_err(|e| EngineError::encode("png", e.to_string()))?;

    Ok(output.into_inner())
}

/// Drop the alpha channel
fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect()
}
