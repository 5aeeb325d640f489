//! Image request parameters.

use crate::constants::{DEFAULT_OUTPUT_FORMAT, DEFAULT_QUALITY};
use crate::encoder::OutputFormat;

use super::helpers::parse_query;

/// Parameters of one image request, fixed once parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub source_url: String,
    pub action: String,
    pub format: OutputFormat,
    pub quality: u8,
}

impl ImageRequest {
    /// Parse the request query string.
    ///
    /// Returns `None` when `url` is absent or empty; the caller redirects
    /// instead of treating it as an error.
    pub fn from_query(query: Option<&str>) -> Option<Self> {
        let mut params = parse_query(query.unwrap_or(""));

        let source_url = params.remove("url").filter(|u| !u.trim().is_empty())?;
        let action = params.remove("action").unwrap_or_default();
        let format = params
            .remove("format")
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string());
        let quality = params
            .remove("quality")
            .map(|q| parse_quality(&q))
            .unwrap_or(DEFAULT_QUALITY);

        Some(Self {
            source_url,
            action,
            format: OutputFormat::resolve(&format),
            quality,
        })
    }
}

/// Integer quality clamped to 0..=100, default when unparsable
fn parse_quality(raw: &str) -> u8 {
    match raw.trim().parse::<i64>() {
        Ok(value) => value.clamp(0, 100) as u8,
        Err(_) => DEFAULT_QUALITY,
    }
}
