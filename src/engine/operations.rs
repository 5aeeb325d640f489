//! Closed table of pipeline operations.
//!
//! Operation names from the `action` parameter are resolved through
//! [`Operation::from_name`]; anything not in the table is rejected at
//! dispatch time instead of being looked up dynamically.

use std::fmt;
use std::str::FromStr;

use super::error::EngineError;
use super::handle::ImageHandle;

/// Whether an operation needs a second, fetched image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Operates on the current image and scalar parameters only
    SingleImage,
    /// First raw parameter is the URL of a second image composited onto the first
    MultiImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Resize,
    Crop,
    FlipH,
    FlipV,
    Rotate,
    Grayscale,
    Invert,
    GaussianBlur,
    Sharpen,
    AdjustBrightness,
    AdjustContrast,
    HueRotate,
    Watermark,
    Blend,
}

const OPERATIONS: &[(&str, Operation)] = &[
    ("resize", Operation::Resize),
    ("crop", Operation::Crop),
    ("fliph", Operation::FlipH),
    ("flipv", Operation::FlipV),
    ("rotate", Operation::Rotate),
    ("grayscale", Operation::Grayscale),
    ("invert", Operation::Invert),
    ("gaussian_blur", Operation::GaussianBlur),
    ("sharpen", Operation::Sharpen),
    ("adjust_brightness", Operation::AdjustBrightness),
    ("adjust_contrast", Operation::AdjustContrast),
    ("hue_rotate", Operation::HueRotate),
    ("watermark", Operation::Watermark),
    ("blend", Operation::Blend),
];

impl Operation {
    /// Look up an operation by its pipeline name (case-sensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        OPERATIONS
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, op)| *op)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Resize => "resize",
            Operation::Crop => "crop",
            Operation::FlipH => "fliph",
            Operation::FlipV => "flipv",
            Operation::Rotate => "rotate",
            Operation::Grayscale => "grayscale",
            Operation::Invert => "invert",
            Operation::GaussianBlur => "gaussian_blur",
            Operation::Sharpen => "sharpen",
            Operation::AdjustBrightness => "adjust_brightness",
            Operation::AdjustContrast => "adjust_contrast",
            Operation::HueRotate => "hue_rotate",
            Operation::Watermark => "watermark",
            Operation::Blend => "blend",
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Watermark | Operation::Blend => OperationKind::MultiImage,
            _ => OperationKind::SingleImage,
        }
    }

    /// Every operation in table order
    pub fn all() -> impl Iterator<Item = Operation> {
        OPERATIONS.iter().map(|(_, op)| *op)
    }

    /// Every registered name in table order
    pub fn names() -> impl Iterator<Item = &'static str> {
        OPERATIONS.iter().map(|(name, _)| *name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::from_name(s).ok_or_else(|| format!("unknown operation: {}", s))
    }
}

/// Result of a single-image operation
#[derive(Debug)]
pub enum Outcome {
    /// The operation allocated a new image; the input should be released
    Replaced(ImageHandle),
    /// The input image was modified in place (or left untouched)
    InPlace,
}

/// Positional view over an operation's raw parameters
pub(crate) struct Params<'a> {
    operation: Operation,
    raw: &'a [String],
}

impl<'a> Params<'a> {
    pub(crate) fn new(operation: Operation, raw: &'a [String]) -> Self {
        Self { operation, raw }
    }

    fn get(&self, index: usize) -> Option<&'a str> {
        self.raw
            .get(index)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub(crate) fn required<T: FromStr>(&self, index: usize, label: &str) -> Result<T, EngineError> {
        let value = self.get(index).ok_or_else(|| {
            EngineError::invalid_param(self.operation.name(), format!("missing {}", label))
        })?;
        self.parse(value, label)
    }

    pub(crate) fn optional<T: FromStr>(
        &self,
        index: usize,
        label: &str,
        default: T,
    ) -> Result<T, EngineError> {
        match self.get(index) {
            Some(value) => self.parse(value, label),
            None => Ok(default),
        }
    }

    pub(crate) fn optional_str(&self, index: usize, default: &'a str) -> &'a str {
        self.get(index).unwrap_or(default)
    }

    fn parse<T: FromStr>(&self, value: &str, label: &str) -> Result<T, EngineError> {
        value.parse().map_err(|_| {
            EngineError::invalid_param(
                self.operation.name(),
                format!("{} '{}' is not valid", label, value),
            )
        })
    }
}
