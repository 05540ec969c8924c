//! # Structured Logging
//!
//! Tracing subscriber setup. All log output goes to stderr: in stdio mode
//! stdout carries the MCP protocol stream and must stay clean.

use tracing_subscriber::{fmt, EnvFilter};

use crate::errors::{Error, Result};

/// Initialize the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` when set, falling back to the given
/// default level (e.g. `"info"`). Returns an error if a subscriber was
/// already installed.
pub fn init_logging(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| Error::config_with_source("failed to initialize logging", e))?;

    Ok(())
}
