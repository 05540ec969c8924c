//! # MCP Server Core
//!
//! The tool catalog, request dispatcher, shared server state, and the
//! stdio/HTTP transport bindings.

pub mod catalog;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod http;
pub mod protocol;
pub mod server;

pub use catalog::{Catalog, Handler, ToolDescriptor, ToolParameter};
pub use dispatcher::{Dispatcher, ToolArgs};
pub use error::McpError;
pub use handler::McpHandler;
pub use protocol::{ContentBlock, Tool, ToolAnnotations, ToolCallResult};
pub use server::{McpServer, McpStdioServer};
