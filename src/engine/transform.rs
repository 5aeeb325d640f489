//! Single-image operations.
//!
//! Geometry-changing operations (resize, crop, rotate) and the filters
//! built on `image::imageops` allocate a new image and return
//! [`Outcome::Replaced`]. Flips, grayscale and invert rewrite the pixels in
//! place and return [`Outcome::InPlace`].

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::{imageops, RgbaImage};
use std::num::NonZeroU32;
use std::sync::Arc;

use super::error::EngineError;
use super::handle::{HandleTracker, ImageHandle};
use super::limits::ImageLimits;
use super::operations::{Operation, Outcome, Params};

pub(crate) fn apply_single(
    op: Operation,
    image: &mut ImageHandle,
    raw: &[String],
    tracker: &Arc<HandleTracker>,
    limits: &ImageLimits,
) -> Result<Outcome, EngineError> {
    let params = Params::new(op, raw);
    let replaced = |pixels: RgbaImage| Outcome::Replaced(ImageHandle::new(pixels, Arc::clone(tracker)));

    match op {
        Operation::Resize => {
            let width: u32 = params.required(0, "width")?;
            let height: u32 = params.required(1, "height")?;
            let filter: u8 = params.optional(2, "sampling filter", 5)?;
            limits.check(op.name(), width, height)?;
            resize(image.pixels(), width, height, filter).map(replaced)
        }
        Operation::Crop => {
            let x1: u32 = params.required(0, "x1")?;
            let y1: u32 = params.required(1, "y1")?;
            let x2: u32 = params.required(2, "x2")?;
            let y2: u32 = params.required(3, "y2")?;
            crop(image.pixels(), x1, y1, x2, y2).map(replaced)
        }
        Operation::FlipH => {
            imageops::flip_horizontal_in_place(image.pixels_mut());
            Ok(Outcome::InPlace)
        }
        Operation::FlipV => {
            imageops::flip_vertical_in_place(image.pixels_mut());
            Ok(Outcome::InPlace)
        }
        Operation::Rotate => {
            let degrees: i64 = params.required(0, "angle")?;
            match degrees.rem_euclid(360) {
                0 => Ok(Outcome::InPlace),
                90 => Ok(replaced(imageops::rotate90(image.pixels()))),
                180 => Ok(replaced(imageops::rotate180(image.pixels()))),
                270 => Ok(replaced(imageops::rotate270(image.pixels()))),
                _ => Err(EngineError::invalid_param(
                    op.name(),
                    format!("angle {} is not a multiple of 90", degrees),
                )),
            }
        }
        Operation::Grayscale => {
            grayscale_in_place(image.pixels_mut());
            Ok(Outcome::InPlace)
        }
        Operation::Invert => {
            imageops::invert(image.pixels_mut());
            Ok(Outcome::InPlace)
        }
        Operation::GaussianBlur => {
            let radius: f32 = params.required(0, "radius")?;
            if !radius.is_finite() || radius < 0.0 {
                return Err(EngineError::invalid_param(
                    op.name(),
                    format!("radius {} must be a non-negative number", radius),
                ));
            }
            if radius == 0.0 {
                return Ok(Outcome::InPlace);
            }
            Ok(replaced(imageops::blur(image.pixels(), radius)))
        }
        Operation::Sharpen => {
            const KERNEL: [f32; 9] = [0.0, -1.0, 0.0, -1.0, 5.0, -1.0, 0.0, -1.0, 0.0];
            Ok(replaced(imageops::filter3x3(image.pixels(), &KERNEL)))
        }
        Operation::AdjustBrightness => {
            let delta: i32 = params.required(0, "brightness")?;
            Ok(replaced(imageops::brighten(image.pixels(), delta)))
        }
        Operation::AdjustContrast => {
            let amount: f32 = params.required(0, "contrast")?;
            Ok(replaced(imageops::contrast(image.pixels(), amount)))
        }
        Operation::HueRotate => {
            let degrees: i32 = params.required(0, "degrees")?;
            Ok(replaced(imageops::huerotate(image.pixels(), degrees)))
        }
        Operation::Watermark | Operation::Blend => Err(EngineError::operation(
            op.name(),
            "requires a second image",
        )),
    }
}

/// Map the numeric sampling filter (1..=5) to a resize algorithm
fn resize_alg(filter: u8) -> Option<ResizeAlg> {
    match filter {
        1 => Some(ResizeAlg::Nearest),
        2 => Some(ResizeAlg::Convolution(FilterType::Bilinear)),
        3 => Some(ResizeAlg::Convolution(FilterType::CatmullRom)),
        4 => Some(ResizeAlg::Convolution(FilterType::Mitchell)),
        5 => Some(ResizeAlg::Convolution(FilterType::Lanczos3)),
        _ => None,
    }
}

/// Resize using fast-image-resize
fn resize(src: &RgbaImage, target_w: u32, target_h: u32, filter: u8) -> Result<RgbaImage, EngineError> {
    let op = Operation::Resize.name();
    let alg = resize_alg(filter).ok_or_else(|| {
        EngineError::invalid_param(op, format!("sampling filter {} must be 1-5", filter))
    })?;

    let src_width =
        NonZeroU32::new(src.width()).ok_or_else(|| EngineError::operation(op, "source width is 0"))?;
    let src_height = NonZeroU32::new(src.height())
        .ok_or_else(|| EngineError::operation(op, "source height is 0"))?;
    let dst_width = NonZeroU32::new(target_w)
        .ok_or_else(|| EngineError::invalid_param(op, "width must be greater than 0"))?;
    let dst_height = NonZeroU32::new(target_h)
        .ok_or_else(|| EngineError::invalid_param(op, "height must be greater than 0"))?;

    let src_image = Image::from_vec_u8(src_width, src_height, src.as_raw().clone(), PixelType::U8x4)
        .map_err(|e| EngineError::operation(op, format!("invalid source buffer: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    Resizer::new(alg)
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| EngineError::operation(op, format!("{:?}", e)))?;

    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| EngineError::operation(op, "output buffer size mismatch"))
}

fn crop(src: &RgbaImage, x1: u32, y1: u32, x2: u32, y2: u32) -> Result<RgbaImage, EngineError> {
    let op = Operation::Crop.name();
    if x2 <= x1 || y2 <= y1 {
        return Err(EngineError::invalid_param(
            op,
            format!("empty region ({},{})-({},{})", x1, y1, x2, y2),
        ));
    }
    if x2 > src.width() || y2 > src.height() {
        return Err(EngineError::invalid_param(
            op,
            format!(
                "region ({},{})-({},{}) exceeds {}x{} image",
                x1,
                y1,
                x2,
                y2,
                src.width(),
                src.height()
            ),
        ));
    }

    Ok(imageops::crop_imm(src, x1, y1, x2 - x1, y2 - y1).to_image())
}

/// Rec. 601 luma, alpha preserved
fn grayscale_in_place(pixels: &mut RgbaImage) {
    for pixel in pixels.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let luma = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round() as u8;
        pixel.0 = [luma, luma, luma, a];
    }
}
