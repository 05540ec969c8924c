//! MCP Request Handler
//!
//! Routes incoming JSON-RPC requests to the tool-serving methods. Tool
//! failures (unknown operation, missing parameter, backend faults) never
//! become JSON-RPC errors; they ride back as error envelopes inside a
//! successful response. JSON-RPC errors are reserved for protocol problems.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error};

use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::error::McpError;
use crate::mcp::protocol::*;
use crate::mcp::server::McpServer;
use crate::{APP_NAME, VERSION};

/// Negotiate MCP protocol version: the highest version we support that is
/// not newer than the client's.
fn negotiate_version(client_version: &str) -> Result<String, McpError> {
    let negotiated = SUPPORTED_VERSIONS.iter().rev().find(|&&v| v <= client_version).copied();

    match negotiated {
        Some(version) => Ok(version.to_string()),
        None => Err(McpError::UnsupportedProtocolVersion {
            client: client_version.to_string(),
            supported: SUPPORTED_VERSIONS.iter().map(|s| s.to_string()).collect(),
        }),
    }
}

pub struct McpHandler {
    dispatcher: Dispatcher,
    initialized: bool,
}

impl McpHandler {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { dispatcher: Dispatcher::new(server), initialized: false }
    }

    /// Handle an incoming JSON-RPC request
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        let method = request.method.clone();
        let id = request.id.clone();

        debug!(method = %method, id = ?id, "Handling MCP request");

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id.clone(), request.params),
            "initialized" | "notifications/initialized" | "notifications/cancelled" => {
                JsonRpcResponse::result(request.id.clone(), serde_json::json!({}))
            }
            "ping" => JsonRpcResponse::result(request.id.clone(), serde_json::json!({})),
            "tools/list" => self.handle_tools_list(request.id.clone()).await,
            "tools/call" => self.handle_tools_call(request.id.clone(), request.params).await,
            _ => self.method_not_found(request.id.clone(), &request.method),
        };

        debug!(
            method = %method,
            id = ?id,
            has_error = response.error.is_some(),
            "Completed MCP request"
        );

        response
    }

    fn handle_initialize(&mut self, id: Option<JsonRpcId>, params: Value) -> JsonRpcResponse {
        let params: InitializeParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                error!(error = %e, "Failed to parse initialize params");
                return self.error_response(
                    id,
                    McpError::InvalidParams(format!("Failed to parse initialize params: {}", e)),
                );
            }
        };

        // Absent version means an old client; negotiate from the floor.
        let client_version = if params.protocol_version.is_empty() {
            SUPPORTED_VERSIONS[0]
        } else {
            &params.protocol_version
        };

        let negotiated_version = match negotiate_version(client_version) {
            Ok(version) => version,
            Err(e) => {
                error!(client_version = %client_version, error = %e, "Protocol version negotiation failed");
                return self.error_response(id, e);
            }
        };

        debug!(
            client_name = %params.client_info.name,
            negotiated_version = %negotiated_version,
            "Protocol version negotiated"
        );

        self.initialized = true;

        let result = InitializeResult {
            protocol_version: negotiated_version,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: Some(false) }),
            },
            server_info: ServerInfo { name: APP_NAME.to_string(), version: VERSION.to_string() },
        };

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::result(id, value),
            Err(e) => self.error_response(id, McpError::SerializationError(e)),
        }
    }

    async fn handle_tools_list(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        debug!("Listing available tools");

        let result = ToolsListResult { tools: self.dispatcher.tools().await, next_cursor: None };

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::result(id, value),
            Err(e) => self.error_response(id, McpError::SerializationError(e)),
        }
    }

    async fn handle_tools_call(&self, id: Option<JsonRpcId>, params: Value) -> JsonRpcResponse {
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                error!(error = %e, "Failed to parse tool call params");
                return self.error_response(
                    id,
                    McpError::InvalidParams(format!("Failed to parse tool call params: {}", e)),
                );
            }
        };

        debug!(tool_name = %params.name, "Executing tool call");

        let arguments = params.arguments.unwrap_or_else(|| serde_json::json!({}));
        let result = self.dispatcher.invoke(&params.name, &arguments).await;

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::result(id, value),
            Err(e) => self.error_response(id, McpError::SerializationError(e)),
        }
    }

    fn method_not_found(&self, id: Option<JsonRpcId>, method: &str) -> JsonRpcResponse {
        error!(method = %method, "Method not found");

        JsonRpcResponse::error(
            id,
            JsonRpcError {
                code: error_codes::METHOD_NOT_FOUND,
                message: format!("Method not found: {}", method),
                data: None,
            },
        )
    }

    fn error_response(&self, id: Option<JsonRpcId>, error: McpError) -> JsonRpcResponse {
        error!(error = %error, "MCP error");
        JsonRpcResponse::error(id, error.to_json_rpc_error())
    }
}
