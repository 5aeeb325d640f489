//! Engine error types
//!
//! Every variant is a runtime fault of the image engine. The proxy maps
//! these to 415 (Unsupported Media Type), unlike failures outside the
//! engine which surface as 500.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Bytes could not be decoded into an image
    #[error("Failed to decode image: {message}")]
    Decode { message: String },

    /// Pixels could not be encoded to the requested format
    #[error("Failed to encode to {format}: {message}")]
    Encode { format: String, message: String },

    /// An operation parameter was missing or not parsable
    #[error("Invalid parameter for '{operation}': {message}")]
    InvalidParameter { operation: String, message: String },

    /// An operation failed while processing pixels
    #[error("Operation '{operation}' failed: {message}")]
    Operation { operation: String, message: String },
}

impl EngineError {
    pub fn decode(message: impl Into<String>) -> Self {
        EngineError::Decode {
            message: message.into(),
        }
    }

    pub fn encode(format: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Encode {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn invalid_param(operation: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Operation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Short label used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Decode { .. } => "decode",
            EngineError::Encode { .. } => "encode",
            EngineError::InvalidParameter { .. } => "invalid_parameter",
            EngineError::Operation { .. } => "operation",
        }
    }
}
