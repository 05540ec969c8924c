//! MCP HTTP Transport
//!
//! A single `POST /mcp` endpoint carrying JSON-RPC 2.0, sharing the same
//! handler as the stdio transport. Each request gets a fresh handler:
//! the binding is stateless, which is what remote MCP clients expect.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use tracing::{debug, info};

use crate::mcp::handler::McpHandler;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::mcp::server::McpServer;

/// Build the HTTP router for the MCP endpoint.
pub fn router(server: Arc<McpServer>) -> Router {
    Router::new().route("/mcp", post(mcp_http_handler)).with_state(server)
}

/// POST /mcp
async fn mcp_http_handler(
    State(server): State<Arc<McpServer>>,
    Json(request): Json<JsonRpcRequest>,
) -> Json<JsonRpcResponse> {
    debug!(method = %request.method, "Received MCP HTTP request");
    let mut handler = McpHandler::new(server);
    Json(handler.handle_request(request).await)
}

/// Bind and serve the HTTP transport until the process exits.
pub async fn serve(server: Arc<McpServer>, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(port = port, "HTTP server starting on path /mcp");
    axum::serve(listener, router(server)).await?;
    Ok(())
}
