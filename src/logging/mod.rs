// Logging module for structured logging using the tracing crate

use std::error::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize the tracing subscriber for structured logging
///
/// Output goes to stdout, as JSON lines or human-readable text depending on
/// `config.format`. `RUST_LOG`, when set, takes precedence over
/// `config.level`.
///
/// # Errors
///
/// Returns an error if the level filter is invalid or a global subscriber
/// is already installed.
///
/// # Examples
///
/// ```
/// use edgepix::config::LoggingConfig;
/// use edgepix::logging::init_subscriber;
///
/// init_subscriber(&LoggingConfig::default()).expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), Box<dyn Error>> {
    let filter = build_filter(config)?;

    match config.format {
        LogFormat::Json => Registry::default()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .try_init()?,
        LogFormat::Pretty => Registry::default()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?,
    }

    Ok(())
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, Box<dyn Error>> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.level)?),
    }
}
