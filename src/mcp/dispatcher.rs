//! Request Dispatcher
//!
//! Resolves an operation name against the current catalog, validates the
//! caller's arguments, invokes the bound handler against the live backend,
//! and wraps the outcome in the uniform result envelope. Unknown names and
//! missing required parameters are caller errors: they come back as error
//! envelopes without ever touching the backend.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::errors::{Error, Result};
use crate::mcp::catalog::ToolDescriptor;
use crate::mcp::protocol::{Tool, ToolCallResult};
use crate::mcp::server::McpServer;

/// Validated, defaulted string arguments handed to a handler.
///
/// The dispatcher has already rejected missing required parameters and
/// filled in declared defaults, so `require_string` only fails if a handler
/// asks for a parameter the descriptor never declared.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    values: HashMap<String, String>,
}

impl ToolArgs {
    /// A required string parameter; absent or empty is an error whose
    /// message is surfaced verbatim to the caller.
    pub fn require_string(&self, name: &str) -> Result<&str> {
        match self.values.get(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(Error::invalid_argument(format!("{} is required", name))),
        }
    }

    /// An optional string parameter; empty string when absent.
    pub fn optional_string(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }
}

/// Extract and validate arguments per the descriptor's parameter list.
///
/// The first missing required parameter in declaration order wins; its
/// message is the whole envelope text.
fn build_args(descriptor: &ToolDescriptor, raw: &Value) -> std::result::Result<ToolArgs, String> {
    let mut values = HashMap::new();
    for param in &descriptor.parameters {
        let provided = raw.get(param.name).and_then(Value::as_str).unwrap_or("");
        if provided.is_empty() {
            if param.required {
                return Err(param
                    .missing_message
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{} is required", param.name)));
            }
            if let Some(default) = param.default {
                values.insert(param.name.to_string(), default.to_string());
            }
        } else {
            values.insert(param.name.to_string(), provided.to_string());
        }
    }
    Ok(ToolArgs { values })
}

/// The read-path entry point shared by every transport binding.
#[derive(Clone)]
pub struct Dispatcher {
    server: Arc<McpServer>,
}

impl Dispatcher {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }

    /// Invoke one operation and return its result envelope.
    ///
    /// The catalog and backend are snapshotted together before any work
    /// happens: a concurrent reload never changes the backend out from
    /// under an in-flight invocation.
    pub async fn invoke(&self, name: &str, arguments: &Value) -> ToolCallResult {
        let (catalog, backend) = self.server.snapshot().await;

        let Some(descriptor) = catalog.find(name) else {
            return ToolCallResult::error(format!("operation {} not found", name));
        };

        let args = match build_args(descriptor, arguments) {
            Ok(args) => args,
            Err(message) => return ToolCallResult::error(message),
        };

        debug!(operation = name, "invoking operation");

        match (descriptor.handler)(backend, args).await {
            Ok(content) => ToolCallResult::text(content),
            Err(e) => ToolCallResult::error(e.to_string()),
        }
    }

    /// Tool definitions from the current catalog.
    pub async fn tools(&self) -> Vec<Tool> {
        let (catalog, _backend) = self.server.snapshot().await;
        catalog.tools()
    }
}
