// crates/pocopi-cli/src/logging.rs
// ============================================================================
// Module: Diagnostic Logging
// Description: `tracing` subscriber setup from the `[logging]` section.
// Purpose: Route diagnostics to stderr as pretty text or JSON lines.
// Dependencies: pocopi-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! `RUST_LOG` overrides the configured filter when set. Diagnostics always go
//! to stderr so stdout stays reserved for command output.

use std::io;

use pocopi_config::LogFormat;
use pocopi_config::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Logging setup failures.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Filter directive could not be parsed.
    #[error("invalid logging.level {level}: {error}")]
    Filter {
        /// Rejected directive.
        level: String,
        /// Parser message.
        error: String,
    },
    /// A global subscriber was already installed.
    #[error("logging already initialized: {0}")]
    Init(String),
}

/// Builds the filter from `RUST_LOG` or the configured level.
fn filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(config.level.trim()).map_err(|err| LoggingError::Filter {
        level: config.level.clone(),
        error: err.to_string(),
    })
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns [`LoggingError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = filter(config)?;
    let (pretty, json) = match config.format {
        LogFormat::Pretty => (Some(fmt::layer().with_writer(io::stderr)), None),
        LogFormat::Json => (None, Some(fmt::layer().json().with_writer(io::stderr))),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(pretty)
        .with(json)
        .try_init()
        .map_err(|err| LoggingError::Init(err.to_string()))
}
