//! # Command Line Interface
//!
//! Flags and startup for the meshlens server.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::config::Settings;
use crate::mcp::catalog::PROFILE_NAMES;
use crate::mcp::{http, McpServer, McpStdioServer};
use crate::{APP_NAME, VERSION};

#[derive(Parser)]
#[command(name = "meshlens")]
#[command(about = "Read-only MCP server for Istio service meshes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "
Read-only MCP server for Istio service meshes.

Provides tools for querying Virtual Services, Destination Rules, Gateways,
security policies, and Envoy proxy configurations.

  # start the stdio server
  meshlens

  # start an HTTP server on port 8080
  meshlens --http-port 8080

  # start with a custom kubeconfig
  meshlens --kubeconfig ~/.kube/config")]
pub struct Cli {
    /// Path to the kubeconfig file to use for authentication
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Start a streamable HTTP server on the specified port (stdio when absent)
    #[arg(long)]
    pub http_port: Option<u16>,

    /// Log level filter (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Catalog profile to use
    #[arg(long, default_value = "full")]
    pub profile: String,
}

/// Parse flags, wire up the server, and serve until EOF or shutdown.
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    crate::observability::init_logging(&cli.log_level)?;

    if !PROFILE_NAMES.contains(&cli.profile.as_str()) {
        anyhow::bail!(
            "invalid profile name: {}, valid names are: {}",
            cli.profile,
            PROFILE_NAMES.join(", ")
        );
    }

    info!(
        app_name = APP_NAME,
        version = VERSION,
        profile = %cli.profile,
        "Starting meshlens MCP server"
    );

    let settings = Settings { kubeconfig: cli.kubeconfig.clone(), http_port: cli.http_port };
    let server = McpServer::new(&settings).await?;

    if let Some(port) = settings.http_port {
        http::serve(server.clone(), port).await?;
    } else {
        let mut stdio = McpStdioServer::new(server.clone());
        stdio.run().await?;
    }

    server.close().await;
    Ok(())
}
