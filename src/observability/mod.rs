//! # Observability
//!
//! Structured logging for meshlens via the tracing ecosystem.

pub mod logging;

pub use logging::init_logging;
