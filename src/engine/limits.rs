//! Dimension limits for decoded sources and resize targets.

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use crate::constants::{DEFAULT_MAX_HEIGHT, DEFAULT_MAX_PIXELS, DEFAULT_MAX_WIDTH};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageLimits {
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    /// Upper bound on width * height
    #[serde(default = "default_max_pixels")]
    pub max_pixels: u64,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_width: default_max_width(),
            max_height: default_max_height(),
            max_pixels: default_max_pixels(),
        }
    }
}

fn default_max_width() -> u32 {
    DEFAULT_MAX_WIDTH
}

fn default_max_height() -> u32 {
    DEFAULT_MAX_HEIGHT
}

fn default_max_pixels() -> u64 {
    DEFAULT_MAX_PIXELS
}

impl ImageLimits {
    /// Reject dimensions above the configured bounds before anything is allocated.
    pub fn check(&self, operation: &str, width: u32, height: u32) -> Result<(), EngineError> {
        if width > self.max_width {
            return Err(EngineError::invalid_param(
                operation,
                format!("width {} exceeds maximum {}", width, self.max_width),
            ));
        }
        if height > self.max_height {
            return Err(EngineError::invalid_param(
                operation,
                format!("height {} exceeds maximum {}", height, self.max_height),
            ));
        }
        let pixels = u64::from(width) * u64::from(height);
        if pixels > self.max_pixels {
            return Err(EngineError::invalid_param(
                operation,
                format!("{} pixels exceeds maximum {}", pixels, self.max_pixels),
            ));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_width == 0 || self.max_height == 0 || self.max_pixels == 0 {
            return Err("limits must be greater than 0".to_string());
        }
        Ok(())
    }
}
