// Error types module

use std::fmt;
use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::encoder::{EncodeError, OptimizeError};
use crate::engine::EngineError;

/// Startup errors of the service
#[derive(Debug, Clone)]
pub enum ProxyError {
    /// Configuration errors (invalid YAML, missing env vars, bad values)
    Config(String),

    /// Image engine failed its startup capability check
    Engine(String),

    /// Server construction or HTTP client setup failed
    Server(String),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ProxyError::Engine(msg) => write!(f, "Engine error: {}", msg),
            ProxyError::Server(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for ProxyError {}

impl From<EngineError> for ProxyError {
    fn from(err: EngineError) -> Self {
        ProxyError::Engine(err.to_string())
    }
}

/// A failure between decoding the primary image and encoding the result.
///
/// Runtime faults of the engine map to 415, everything else to 500.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessingError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Optimize(#[from] OptimizeError),
}

impl From<EncodeError> for ProcessingError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::Engine(e) => ProcessingError::Engine(e),
            EncodeError::Optimize(e) => ProcessingError::Optimize(e),
        }
    }
}

impl ProcessingError {
    pub fn is_runtime_fault(&self) -> bool {
        match self {
            ProcessingError::Engine(_) => true,
            ProcessingError::Dispatch(e) => e.is_runtime_fault(),
            ProcessingError::Optimize(_) => false,
        }
    }

    pub fn status_code(&self) -> u16 {
        if self.is_runtime_fault() {
            415
        } else {
            500
        }
    }

    /// Label for logs and the faults metric
    pub fn fault_class(&self) -> &'static str {
        match self {
            ProcessingError::Engine(e) | ProcessingError::Dispatch(DispatchError::Engine(e)) => {
                e.kind()
            }
            ProcessingError::Dispatch(DispatchError::UnknownOperation(_)) => "unknown_operation",
            ProcessingError::Optimize(_) => "optimize",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_error_display() {
        assert_eq!(
            ProxyError::Config("port must be non-zero".to_string()).to_string(),
            "Configuration error: port must be non-zero"
        );
        assert_eq!(
            ProxyError::Server("bind failed".to_string()).to_string(),
            "Server error: bind failed"
        );
    }

    #[test]
    fn test_engine_error_converts_to_proxy_error() {
        let err: ProxyError = EngineError::operation("resize", "registered twice").into();
        assert!(matches!(err, ProxyError::Engine(msg) if msg.contains("registered twice")));
    }

    #[test]
    fn test_engine_faults_are_415() {
        let err = ProcessingError::from(EngineError::decode("bad magic"));
        assert!(err.is_runtime_fault());
        assert_eq!(err.status_code(), 415);
        assert_eq!(err.fault_class(), "decode");

        let err = ProcessingError::from(DispatchError::Engine(EngineError::invalid_param(
            "crop", "x1 missing",
        )));
        assert_eq!(err.status_code(), 415);
        assert_eq!(err.fault_class(), "invalid_parameter");
    }

    #[test]
    fn test_unknown_operation_is_500() {
        let err = ProcessingError::from(DispatchError::UnknownOperation("sparkle".to_string()));
        assert!(!err.is_runtime_fault());
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.fault_class(), "unknown_operation");
    }

    #[test]
    fn test_optimizer_failure_is_500() {
        let err = ProcessingError::from(EncodeError::Optimize(OptimizeError {
            target: "webp",
            message: "out of memory".to_string(),
        }));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.fault_class(), "optimize");
    }

    #[test]
    fn test_encode_engine_failure_is_415() {
        let err = ProcessingError::from(EncodeError::Engine(EngineError::encode("jpeg", "io")));
        assert_eq!(err.status_code(), 415);
        assert_eq!(err.fault_class(), "encode");
    }
}
