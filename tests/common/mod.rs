//! Shared fixtures for integration tests: a fixture-backed cluster client,
//! a stub CLI builder, and a minimal kubeconfig writer.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Endpoints, Pod, Service};
use meshlens::config::KubeconfigSource;
use meshlens::errors::{Error, Result};
use meshlens::istio::{
    ClusterClient, IstioBackend, ProxyConfigClient, ResourceItem, ResourceKind,
};
use meshlens::mcp::McpServer;

type CustomKey = (ResourceKind, String);

/// Fixture-backed cluster client. Unknown queries return empty collections.
#[derive(Default)]
pub struct FakeClusterClient {
    custom: HashMap<CustomKey, Vec<ResourceItem>>,
    custom_errors: HashMap<CustomKey, String>,
    services: HashMap<String, Vec<Service>>,
    pods: HashMap<String, Vec<Pod>>,
    running_pods: Vec<Pod>,
}

impl FakeClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_custom(
        mut self,
        kind: ResourceKind,
        namespace: &str,
        items: Vec<ResourceItem>,
    ) -> Self {
        self.custom.insert((kind, namespace.to_string()), items);
        self
    }

    pub fn with_custom_error(mut self, kind: ResourceKind, namespace: &str, message: &str) -> Self {
        self.custom_errors.insert((kind, namespace.to_string()), message.to_string());
        self
    }

    pub fn with_services(mut self, namespace: &str, services: Vec<Service>) -> Self {
        self.services.insert(namespace.to_string(), services);
        self
    }
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    async fn list_custom(&self, kind: ResourceKind, namespace: &str) -> Result<Vec<ResourceItem>> {
        let key = (kind, namespace.to_string());
        if let Some(message) = self.custom_errors.get(&key) {
            return Err(Error::internal(message.clone()));
        }
        Ok(self.custom.get(&key).cloned().unwrap_or_default())
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>> {
        Ok(self.services.get(namespace).cloned().unwrap_or_default())
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service> {
        self.services
            .get(namespace)
            .and_then(|services| {
                services.iter().find(|s| s.metadata.name.as_deref() == Some(name))
            })
            .cloned()
            .ok_or_else(|| Error::internal(format!("failed to get service {}: not found", name)))
    }

    async fn list_pods(&self, namespace: &str, label_selector: Option<&str>) -> Result<Vec<Pod>> {
        let pods = self.pods.get(namespace).cloned().unwrap_or_default();
        let Some(selector) = label_selector else {
            return Ok(pods);
        };
        let wanted: Vec<(&str, &str)> =
            selector.split(',').filter_map(|pair| pair.split_once('=')).collect();
        Ok(pods
            .into_iter()
            .filter(|pod| {
                let labels = pod.metadata.labels.clone().unwrap_or_default();
                wanted.iter().all(|(k, v)| labels.get(*k).map(String::as_str) == Some(*v))
            })
            .collect())
    }

    async fn list_running_pods_all_namespaces(&self) -> Result<Vec<Pod>> {
        Ok(self.running_pods.clone())
    }

    async fn get_endpoints(&self, _namespace: &str, _name: &str) -> Result<Option<Endpoints>> {
        Ok(None)
    }
}

/// Build a server around a fake cluster client, with `echo` standing in
/// for istioctl so proxy tools succeed and report their argv.
pub fn test_server(fake: FakeClusterClient) -> Arc<McpServer> {
    let kubeconfig = KubeconfigSource::resolve(Some(Path::new("/tmp/kubeconfig"))).unwrap();
    let proxy = ProxyConfigClient::new(None).with_binary("echo");
    McpServer::with_backend(IstioBackend::from_parts(Arc::new(fake), proxy, kubeconfig))
}

/// Write a syntactically valid kubeconfig that never needs a live cluster.
pub fn write_kubeconfig(path: &Path) {
    std::fs::write(
        path,
        "apiVersion: v1
kind: Config
current-context: test
clusters:
- name: test
  cluster:
    server: https://127.0.0.1:6443
    insecure-skip-tls-verify: true
contexts:
- name: test
  context:
    cluster: test
    user: test-user
users:
- name: test-user
  user:
    token: test-token
",
    )
    .unwrap();
}

/// Write an executable stub script standing in for istioctl.
pub fn stub_cli(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}
