//! # Error Types
//!
//! Crate-wide error types for meshlens using `thiserror`.
//!
//! Tool handlers return these errors to the dispatcher, which converts them
//! into MCP error envelopes; the error's `Display` output is the text a
//! caller sees, so messages carry the underlying cause verbatim.

/// Custom result type for meshlens operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for meshlens
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors (kubeconfig resolution, CLI settings)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Kubernetes API errors with query context
    #[error("{context}: {source}")]
    Kube {
        context: String,
        #[source]
        source: kube::Error,
    },

    /// I/O errors with additional context
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Subprocess failures (non-zero exit from the inspection CLI)
    #[error("istioctl command failed: {status}, output: {output}")]
    CommandFailed { status: String, output: String },

    /// Timeout errors
    #[error("Operation timed out: {operation} after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// Invalid or missing tool arguments; the message is surfaced verbatim
    /// in the error envelope, so it must stand on its own.
    #[error("{message}")]
    InvalidArgument { message: String },

    /// Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a Kubernetes API error with query context
    pub fn kube<S: Into<String>>(context: S, source: kube::Error) -> Self {
        Self::Kube { context: context.into(), source }
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(context: S, source: std::io::Error) -> Self {
        Self::Io { context: context.into(), source }
    }

    /// Create an invalid-argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }
}
