//! MCP Error Types

use crate::mcp::protocol::{error_codes, JsonRpcError};
use thiserror::Error;

/// Protocol-level errors: malformed requests, unknown methods, and the
/// like. Tool-level failures never use this type; they surface as error
/// envelopes inside a successful JSON-RPC response.
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Unsupported protocol version: {client} (supported: {})", supported.join(", "))]
    UnsupportedProtocolVersion { client: String, supported: Vec<String> },
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::ParseError(_) => error_codes::PARSE_ERROR,
            McpError::InvalidRequest(_) | McpError::UnsupportedProtocolVersion { .. } => {
                error_codes::INVALID_REQUEST
            }
            McpError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            McpError::InternalError(_) | McpError::SerializationError(_) => {
                error_codes::INTERNAL_ERROR
            }
        }
    }

    /// Convert to JsonRpcError
    pub fn to_json_rpc_error(&self) -> JsonRpcError {
        let data = match self {
            McpError::UnsupportedProtocolVersion { supported, .. } => {
                Some(serde_json::json!({ "supportedVersions": supported }))
            }
            _ => None,
        };
        JsonRpcError { code: self.error_code(), message: self.to_string(), data }
    }
}

impl From<McpError> for JsonRpcError {
    fn from(error: McpError) -> Self {
        error.to_json_rpc_error()
    }
}
