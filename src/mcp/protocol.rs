//! MCP Protocol Types
//!
//! JSON-RPC 2.0 and MCP message types for the tool-serving surface. Only
//! the tools capability is exposed; the result envelope
//! ([`ToolCallResult`]) is the uniform success/error wrapper every
//! operation returns.

use serde::{Deserialize, Serialize};

/// Protocol versions this server can negotiate, oldest first.
pub const SUPPORTED_VERSIONS: &[&str] =
    &["2024-11-05", "2025-03-26", "2025-06-18", "2025-11-25"];

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<JsonRpcId>,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<JsonRpcId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response carrying an already-serialized result.
    pub fn result(id: Option<JsonRpcId>, result: serde_json::Value) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: Some(result), error: None }
    }

    /// Error response.
    pub fn error(id: Option<JsonRpcId>, error: JsonRpcError) -> Self {
        Self { jsonrpc: "2.0".to_string(), id, result: None, error: Some(error) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum JsonRpcId {
    Number(i64),
    String(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// MCP error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP Initialize Request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: serde_json::Value,
    pub client_info: ClientInfo,
}

/// Client information provided during initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// MCP Initialize Response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// Server information provided during initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// Capabilities advertised by this server: tools only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    pub list_changed: Option<bool>,
}

/// Tool behavioral hints surfaced to clients.
///
/// Every tool this server exposes is read-only and non-destructive; the
/// catalog enforces that invariant when it builds the definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_only_hint: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destructive_hint: Option<bool>,
}

/// MCP Tool Definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Unique identifier; part of the external contract, never renamed.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema describing the argument object.
    pub input_schema: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ToolAnnotations>,
}

/// MCP Tools List Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsListResult {
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// MCP Tool Call Parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

/// MCP Tool Call Result: the uniform result envelope.
///
/// Success envelopes carry the formatted result as their single text item;
/// error envelopes carry the error message the same way. There are no
/// partial results.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ContentBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl ToolCallResult {
    /// Success envelope wrapping formatted result text.
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: vec![ContentBlock::Text { text: content.into() }], is_error: None }
    }

    /// Error envelope wrapping an error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::Text { text: message.into() }],
            is_error: Some(true),
        }
    }

    /// Whether this is an error envelope.
    pub fn is_error(&self) -> bool {
        self.is_error == Some(true)
    }

    /// The single text item's content.
    pub fn text_content(&self) -> &str {
        match self.content.first() {
            Some(ContentBlock::Text { text }) => text,
            None => "",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_serializes_with_is_error_flag() {
        let envelope = ToolCallResult::error("backend unavailable");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0]["type"], "text");
        assert_eq!(value["content"][0]["text"], "backend unavailable");
    }

    #[test]
    fn success_envelope_omits_is_error() {
        let envelope = ToolCallResult::text("Found 0 Gateways in namespace 'default':\n");
        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("isError").is_none());
        assert_eq!(value["content"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn tool_serializes_camel_case() {
        let tool = Tool {
            name: "get-gateways".to_string(),
            description: Some("List gateways".to_string()),
            input_schema: serde_json::json!({"type": "object"}),
            annotations: Some(ToolAnnotations {
                title: Some("Istio: Gateways".to_string()),
                read_only_hint: Some(true),
                destructive_hint: Some(false),
            }),
        };
        let value = serde_json::to_value(&tool).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert_eq!(value["annotations"]["readOnlyHint"], true);
        assert_eq!(value["annotations"]["destructiveHint"], false);
    }

    #[test]
    fn json_rpc_id_accepts_numbers_and_strings() {
        let number: JsonRpcId = serde_json::from_str("7").unwrap();
        assert_eq!(number, JsonRpcId::Number(7));
        let string: JsonRpcId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(string, JsonRpcId::String("abc".to_string()));
    }
}
