//! Hot-reload behavior: a kubeconfig change swaps the backend wholesale,
//! a failed rebuild keeps the previous backend, and the watch survives a
//! failed reload.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::write_kubeconfig;
use meshlens::istio::IstioBackend;
use meshlens::mcp::McpServer;
use meshlens::Settings;

async fn wait_for_swap(
    server: &Arc<McpServer>,
    old: &Arc<IstioBackend>,
    timeout: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        let (_catalog, backend) = server.snapshot().await;
        if !Arc::ptr_eq(&backend, old) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
async fn kubeconfig_change_swaps_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config");
    write_kubeconfig(&path);

    let settings = Settings { kubeconfig: Some(path.clone()), http_port: None };
    let server = McpServer::new(&settings).await.expect("server should start");
    let (_catalog, original) = server.snapshot().await;

    // Rewrite the kubeconfig; the watcher should rebuild and swap.
    write_kubeconfig(&path);

    assert!(
        wait_for_swap(&server, &original, Duration::from_secs(10)).await,
        "backend was not swapped after a kubeconfig change"
    );

    server.close().await;
}

#[tokio::test]
async fn failed_reload_keeps_previous_backend() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config");
    write_kubeconfig(&path);

    let settings = Settings { kubeconfig: Some(path.clone()), http_port: None };
    let server = McpServer::new(&settings).await.expect("server should start");
    let (_catalog, original) = server.snapshot().await;

    // Unparseable kubeconfig: the rebuild fails and the working backend
    // must stay installed.
    std::fs::write(&path, "{{{{ not a kubeconfig").unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let (_catalog, current) = server.snapshot().await;
    assert!(
        Arc::ptr_eq(&current, &original),
        "a failed reload must not tear down the working backend"
    );

    // The watch survives the failure: restoring a valid config reloads.
    write_kubeconfig(&path);
    assert!(
        wait_for_swap(&server, &original, Duration::from_secs(10)).await,
        "watch did not survive the failed reload"
    );

    server.close().await;
}

#[tokio::test]
async fn startup_fails_on_unreadable_kubeconfig() {
    let dir = tempfile::tempdir().unwrap();
    let settings =
        Settings { kubeconfig: Some(dir.path().join("missing")), http_port: None };
    let err = McpServer::new(&settings).await.err().expect("startup must fail");
    assert!(err.to_string().contains("failed to read kubeconfig"));
}
