//! Two-image operations: watermark and blend.
//!
//! Both write into the primary image in place. The overlay is placed at an
//! offset (watermark) or at the origin (blend), clipped to the primary's
//! bounds, and mixed using the overlay's alpha channel.

use image::{Rgba, RgbaImage};

use super::error::EngineError;
use super::handle::ImageHandle;
use super::operations::{Operation, Params};

/// Per-channel blend modes, operating on normalized [0, 1] values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Over,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    Difference,
    Exclusion,
    Plus,
    HardLight,
    SoftLight,
}

impl BlendMode {
    pub fn from_name(name: &str) -> Option<Self> {
        let mode = match name.to_ascii_lowercase().as_str() {
            "over" => BlendMode::Over,
            "multiply" => BlendMode::Multiply,
            "screen" => BlendMode::Screen,
            "overlay" => BlendMode::Overlay,
            "darken" => BlendMode::Darken,
            "lighten" => BlendMode::Lighten,
            "difference" => BlendMode::Difference,
            "exclusion" => BlendMode::Exclusion,
            "plus" => BlendMode::Plus,
            "hard_light" => BlendMode::HardLight,
            "soft_light" => BlendMode::SoftLight,
            _ => return None,
        };
        Some(mode)
    }

    fn mix(self, base: f32, top: f32) -> f32 {
        match self {
            BlendMode::Over => top,
            BlendMode::Multiply => base * top,
            BlendMode::Screen => 1.0 - (1.0 - base) * (1.0 - top),
            BlendMode::Overlay => BlendMode::HardLight.mix(top, base),
            BlendMode::Darken => base.min(top),
            BlendMode::Lighten => base.max(top),
            BlendMode::Difference => (base - top).abs(),
            BlendMode::Exclusion => base + top - 2.0 * base * top,
            BlendMode::Plus => (base + top).min(1.0),
            BlendMode::HardLight => {
                if top <= 0.5 {
                    2.0 * base * top
                } else {
                    1.0 - 2.0 * (1.0 - base) * (1.0 - top)
                }
            }
            BlendMode::SoftLight => (1.0 - 2.0 * top) * base * base + 2.0 * top * base,
        }
    }
}

pub(crate) fn apply_composite(
    op: Operation,
    base: &mut ImageHandle,
    overlay: &ImageHandle,
    raw: &[String],
) -> Result<(), EngineError> {
    let params = Params::new(op, raw);

    match op {
        Operation::Watermark => {
            let x: i64 = params.optional(0, "x", 0)?;
            let y: i64 = params.optional(1, "y", 0)?;
            composite_at(base.pixels_mut(), overlay.pixels(), x, y, BlendMode::Over);
            Ok(())
        }
        Operation::Blend => {
            let name = params.optional_str(0, "over");
            let mode = BlendMode::from_name(name).ok_or_else(|| {
                EngineError::invalid_param(op.name(), format!("unknown blend mode '{}'", name))
            })?;
            composite_at(base.pixels_mut(), overlay.pixels(), 0, 0, mode);
            Ok(())
        }
        _ => Err(EngineError::operation(
            op.name(),
            "does not take a second image",
        )),
    }
}

/// Mix `top` onto `target` with its top-left corner at (`x`, `y`).
fn composite_at(target: &mut RgbaImage, top: &RgbaImage, x: i64, y: i64, mode: BlendMode) {
    let target_w = target.width() as i64;
    let target_h = target.height() as i64;

    // Visible region, clamped to target bounds
    let x_start = x.max(0);
    let y_start = y.max(0);
    let x_end = x.saturating_add(top.width() as i64).min(target_w);
    let y_end = y.saturating_add(top.height() as i64).min(target_h);

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let src = top.get_pixel((tx - x) as u32, (ty - y) as u32);
            let dst = target.get_pixel_mut(tx as u32, ty as u32);
            *dst = mix_pixel(*dst, *src, mode);
        }
    }
}

fn mix_pixel(base: Rgba<u8>, top: Rgba<u8>, mode: BlendMode) -> Rgba<u8> {
    let alpha = top[3] as f32 / 255.0;
    if alpha == 0.0 {
        return base;
    }

    let mut out = [0u8; 4];
    for channel in 0..3 {
        let b = base[channel] as f32 / 255.0;
        let t = top[channel] as f32 / 255.0;
        let mixed = mode.mix(b, t).clamp(0.0, 1.0);
        out[channel] = to_u8(b + (mixed - b) * alpha);
    }
    let base_alpha = base[3] as f32 / 255.0;
    out[3] = to_u8(alpha + base_alpha * (1.0 - alpha));

    Rgba(out)
}

fn to_u8(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
