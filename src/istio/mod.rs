//! # Istio Backend
//!
//! The cluster-facing side of meshlens: the live backend handle, the cluster
//! client behind it, the istioctl subprocess client, the listing/discovery
//! handlers, and the kubeconfig watcher that drives hot reload.

pub mod client;
pub mod proxy;
pub mod resources;
pub mod watch;
pub mod workloads;

#[cfg(test)]
pub(crate) mod testing;

use std::path::Path;
use std::sync::Arc;

pub use client::{ClusterClient, KubeClusterClient, ResourceItem, ResourceKind};
pub use proxy::{ConfigSection, ProxyConfigClient};

use crate::config::KubeconfigSource;
use crate::errors::Result;

/// The live backend handle: everything tool handlers need to talk to the
/// cluster. Exactly one handle is live at a time; a reload builds a fresh
/// one and replaces it wholesale rather than mutating in place.
pub struct IstioBackend {
    lister: Arc<dyn ClusterClient>,
    proxy: ProxyConfigClient,
    kubeconfig: KubeconfigSource,
}

impl IstioBackend {
    /// Build a backend from an optional explicit kubeconfig path.
    ///
    /// Resolution follows kubectl conventions (see [`KubeconfigSource`]).
    /// Any failure here is fatal to the load: the server must not run with
    /// a partially-constructed backend.
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let kubeconfig = KubeconfigSource::resolve(explicit)?;
        let lister = KubeClusterClient::new(&kubeconfig).await?;
        let proxy = ProxyConfigClient::new(kubeconfig.explicit_path().map(Path::to_path_buf));
        Ok(Self { lister: Arc::new(lister), proxy, kubeconfig })
    }

    /// Assemble a backend from already-built parts. Used by alternative
    /// listers and tests.
    pub fn from_parts(
        lister: Arc<dyn ClusterClient>,
        proxy: ProxyConfigClient,
        kubeconfig: KubeconfigSource,
    ) -> Self {
        Self { lister, proxy, kubeconfig }
    }

    pub fn lister(&self) -> &dyn ClusterClient {
        self.lister.as_ref()
    }

    pub fn proxy(&self) -> &ProxyConfigClient {
        &self.proxy
    }

    pub fn kubeconfig(&self) -> &KubeconfigSource {
        &self.kubeconfig
    }
}
