// Edgepix image transformation proxy library

pub mod access;
pub mod config;
pub mod constants;
pub mod context;
pub mod dispatch;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod proxy;
