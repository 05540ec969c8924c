//! MCP Server State & Stdio Transport
//!
//! [`McpServer`] owns the one live backend handle and the catalog built
//! alongside it. Both sit behind a single `RwLock` and are swapped together
//! on reload, so a reader never sees a catalog from one backend paired with
//! a different handle. The reconfiguration watcher is the only writer; the
//! dispatcher only ever read-locks.
//!
//! [`McpStdioServer`] is the stdio transport: line-delimited JSON-RPC on
//! stdin/stdout.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::errors::Result;
use crate::istio::watch::{self, WatchGuard};
use crate::istio::IstioBackend;
use crate::mcp::catalog::Catalog;
use crate::mcp::handler::McpHandler;
use crate::mcp::protocol::{error_codes, JsonRpcError, JsonRpcResponse};

struct ServerState {
    backend: Arc<IstioBackend>,
    catalog: Arc<Catalog>,
}

/// Shared server state: the live backend, the catalog, and the kubeconfig
/// watch that triggers reload.
pub struct McpServer {
    kubeconfig: Option<PathBuf>,
    state: RwLock<ServerState>,
    watch: Mutex<Option<WatchGuard>>,
}

impl McpServer {
    /// Load the backend from the configured kubeconfig and install the
    /// change watch. A backend that cannot be constructed is fatal here:
    /// the server must not start half-wired.
    pub async fn new(settings: &Settings) -> Result<Arc<Self>> {
        let backend = IstioBackend::load(settings.kubeconfig.as_deref()).await?;
        let server = Arc::new(Self {
            kubeconfig: settings.kubeconfig.clone(),
            state: RwLock::new(ServerState {
                backend: Arc::new(backend),
                catalog: Arc::new(Catalog::build()),
            }),
            watch: Mutex::new(None),
        });
        Self::install_watch(&server).await;
        Ok(server)
    }

    /// Wrap an already-built backend without installing a watch. Used by
    /// embedders and tests that manage the backend lifecycle themselves.
    pub fn with_backend(backend: IstioBackend) -> Arc<Self> {
        Arc::new(Self {
            kubeconfig: None,
            state: RwLock::new(ServerState {
                backend: Arc::new(backend),
                catalog: Arc::new(Catalog::build()),
            }),
            watch: Mutex::new(None),
        })
    }

    /// The current `(catalog, backend)` pair, taken under one read lock.
    /// Callers hold the returned `Arc`s for the whole invocation so a
    /// concurrent swap cannot change the handle out from under them.
    pub async fn snapshot(&self) -> (Arc<Catalog>, Arc<IstioBackend>) {
        let state = self.state.read().await;
        (state.catalog.clone(), state.backend.clone())
    }

    /// Swap in a new backend and a freshly built catalog atomically.
    pub async fn install_backend(&self, backend: IstioBackend) {
        let catalog = Arc::new(Catalog::build());
        let mut state = self.state.write().await;
        state.backend = Arc::new(backend);
        state.catalog = catalog;
    }

    /// Rebuild the backend from the kubeconfig and swap it in. On failure
    /// the previous backend and its watch stay installed; a working backend
    /// is never torn down for a reload that did not pan out.
    pub async fn reload(self: Arc<Self>) -> Result<()> {
        info!("rebuilding backend from kubeconfig");
        let backend = IstioBackend::load(self.kubeconfig.as_deref()).await?;
        self.install_backend(backend).await;
        Self::install_watch(&self).await;
        Ok(())
    }

    /// Install a watch on the current backend's kubeconfig files. Replacing
    /// the guard closes any previous watch.
    fn install_watch(server: &Arc<Self>) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let paths: Vec<PathBuf> =
                { server.state.read().await.backend.kubeconfig().paths().to_vec() };

            let weak = Arc::downgrade(server);
            let guard = watch::spawn(&paths, move || {
                let weak = weak.clone();
                async move {
                    let Some(server) = weak.upgrade() else {
                        return;
                    };
                    if let Err(e) = server.reload().await {
                        error!(error = %e, "kubeconfig reload failed; keeping previous backend");
                    }
                }
            });

            *server.watch.lock().await = guard;
        })
    }

    /// Close the kubeconfig watch. Called at shutdown.
    pub async fn close(&self) {
        *self.watch.lock().await = None;
        debug!("closed kubeconfig watch");
    }
}

/// Stdio transport: reads line-delimited JSON-RPC from stdin, writes
/// responses to stdout. Exits cleanly on EOF.
pub struct McpStdioServer {
    handler: McpHandler,
}

impl McpStdioServer {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { handler: McpHandler::new(server) }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!("Starting MCP stdio server");

        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let request = match serde_json::from_str(&line) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "failed to parse JSON-RPC request");
                    let response = JsonRpcResponse::error(
                        None,
                        JsonRpcError {
                            code: error_codes::PARSE_ERROR,
                            message: format!("Parse error: {}", e),
                            data: None,
                        },
                    );
                    write_response(&mut stdout, &response).await?;
                    continue;
                }
            };

            let response = self.handler.handle_request(request).await;
            write_response(&mut stdout, &response).await?;
        }

        info!("MCP stdio server shutting down (EOF received)");
        Ok(())
    }
}

async fn write_response(
    stdout: &mut tokio::io::Stdout,
    response: &JsonRpcResponse,
) -> anyhow::Result<()> {
    let json = serde_json::to_string(response)?;
    stdout.write_all(json.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KubeconfigSource;
    use crate::istio::testing::FakeClusterClient;
    use crate::istio::{ProxyConfigClient, ResourceItem, ResourceKind};
    use crate::mcp::dispatcher::Dispatcher;
    use serde_json::json;
    use std::path::Path;

    fn backend_with(fake: FakeClusterClient) -> IstioBackend {
        let kubeconfig = KubeconfigSource::resolve(Some(Path::new("/tmp/kubeconfig"))).unwrap();
        IstioBackend::from_parts(
            Arc::new(fake),
            ProxyConfigClient::new(None).with_binary("echo"),
            kubeconfig,
        )
    }

    #[tokio::test]
    async fn snapshot_returns_consistent_pair() {
        let server = McpServer::with_backend(backend_with(FakeClusterClient::new()));
        let (catalog, _backend) = server.snapshot().await;
        assert!(!catalog.is_empty());
    }

    #[tokio::test]
    async fn invocation_after_swap_uses_new_backend() {
        let old = FakeClusterClient::new().with_custom(
            ResourceKind::VirtualService,
            "default",
            vec![ResourceItem::new("old-vs", json!({}))],
        );
        let server = McpServer::with_backend(backend_with(old));
        let dispatcher = Dispatcher::new(server.clone());

        let before = dispatcher.invoke("get-virtual-services", &json!({})).await;
        assert!(before.text_content().contains("old-vs"));

        let new = FakeClusterClient::new().with_custom(
            ResourceKind::VirtualService,
            "default",
            vec![ResourceItem::new("new-vs", json!({}))],
        );
        server.install_backend(backend_with(new)).await;

        let after = dispatcher.invoke("get-virtual-services", &json!({})).await;
        assert!(after.text_content().contains("new-vs"));
        assert!(!after.text_content().contains("old-vs"));
    }

    #[tokio::test]
    async fn snapshot_taken_before_swap_keeps_old_handle() {
        let old = FakeClusterClient::new().with_custom(
            ResourceKind::VirtualService,
            "default",
            vec![ResourceItem::new("old-vs", json!({}))],
        );
        let server = McpServer::with_backend(backend_with(old));

        let (_catalog, held_backend) = server.snapshot().await;

        server.install_backend(backend_with(FakeClusterClient::new())).await;

        // The invocation that began before the swap still reads the
        // backend it snapshotted; no handle changes mid-invocation.
        let items = held_backend
            .lister()
            .list_custom(ResourceKind::VirtualService, "default")
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "old-vs");
    }
}
