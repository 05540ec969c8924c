//! # meshlens
//!
//! A read-only MCP (Model Context Protocol) server for Istio service
//! meshes. It lists Istio custom resources (Virtual Services, Destination
//! Rules, Gateways, security policies, ...) and retrieves Envoy proxy
//! configuration from pods via `istioctl`, exposing each query as a named,
//! schema-described tool.
//!
//! ## Architecture
//!
//! ```text
//! Transport (stdio / HTTP) → Dispatcher → Tool Catalog
//!                                 ↓
//!                          Backend Handle ──→ Kubernetes API (kube)
//!                                 │      └──→ istioctl subprocess
//!                        Kubeconfig Watcher (hot reload)
//! ```
//!
//! The backend handle and the catalog built alongside it swap together
//! under a single lock when the kubeconfig changes; the dispatcher reads
//! the live pair on every invocation. Every tool is read-only: nothing in
//! this crate mutates cluster state.

pub mod cli;
pub mod config;
pub mod errors;
pub mod istio;
pub mod mcp;
pub mod observability;

// Re-export commonly used types
pub use config::Settings;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
