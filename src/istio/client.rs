//! Cluster access layer.
//!
//! Istio's custom resources are queried through the Kubernetes dynamic API
//! (there is no official typed Istio client for Rust); core resources use
//! the typed `k8s-openapi` bindings. Everything the tool handlers need from
//! the cluster goes through the [`ClusterClient`] trait so the read path can
//! be exercised against fixture data.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Endpoints, Pod, Service};
use kube::api::{Api, ApiResource, DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::GroupVersionKind;
use kube::{Client, Config};
use serde_json::Value;

use crate::config::KubeconfigSource;
use crate::errors::{Error, Result};

/// The fixed set of Istio custom resource kinds served by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    VirtualService,
    DestinationRule,
    Gateway,
    ServiceEntry,
    AuthorizationPolicy,
    PeerAuthentication,
    EnvoyFilter,
    Telemetry,
}

impl ResourceKind {
    /// All kinds, in the order the configuration summary reports them.
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::VirtualService,
        ResourceKind::DestinationRule,
        ResourceKind::Gateway,
        ResourceKind::ServiceEntry,
        ResourceKind::AuthorizationPolicy,
        ResourceKind::PeerAuthentication,
        ResourceKind::EnvoyFilter,
        ResourceKind::Telemetry,
    ];

    pub fn group(&self) -> &'static str {
        match self {
            ResourceKind::VirtualService
            | ResourceKind::DestinationRule
            | ResourceKind::Gateway
            | ResourceKind::ServiceEntry
            | ResourceKind::EnvoyFilter => "networking.istio.io",
            ResourceKind::AuthorizationPolicy | ResourceKind::PeerAuthentication => {
                "security.istio.io"
            }
            ResourceKind::Telemetry => "telemetry.istio.io",
        }
    }

    pub fn version(&self) -> &'static str {
        match self {
            ResourceKind::VirtualService
            | ResourceKind::DestinationRule
            | ResourceKind::Gateway
            | ResourceKind::ServiceEntry
            | ResourceKind::EnvoyFilter => "v1alpha3",
            ResourceKind::AuthorizationPolicy | ResourceKind::PeerAuthentication => "v1beta1",
            ResourceKind::Telemetry => "v1alpha1",
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ResourceKind::VirtualService => "VirtualService",
            ResourceKind::DestinationRule => "DestinationRule",
            ResourceKind::Gateway => "Gateway",
            ResourceKind::ServiceEntry => "ServiceEntry",
            ResourceKind::AuthorizationPolicy => "AuthorizationPolicy",
            ResourceKind::PeerAuthentication => "PeerAuthentication",
            ResourceKind::EnvoyFilter => "EnvoyFilter",
            ResourceKind::Telemetry => "Telemetry",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            ResourceKind::VirtualService => "virtualservices",
            ResourceKind::DestinationRule => "destinationrules",
            ResourceKind::Gateway => "gateways",
            ResourceKind::ServiceEntry => "serviceentries",
            ResourceKind::AuthorizationPolicy => "authorizationpolicies",
            ResourceKind::PeerAuthentication => "peerauthentications",
            ResourceKind::EnvoyFilter => "envoyfilters",
            ResourceKind::Telemetry => "telemetries",
        }
    }

    /// Header label for listing output, e.g. "Found 2 Virtual Services ..."
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::VirtualService => "Virtual Services",
            ResourceKind::DestinationRule => "Destination Rules",
            ResourceKind::Gateway => "Gateways",
            ResourceKind::ServiceEntry => "Service Entries",
            ResourceKind::AuthorizationPolicy => "Authorization Policies",
            ResourceKind::PeerAuthentication => "Peer Authentications",
            ResourceKind::EnvoyFilter => "Envoy Filters",
            ResourceKind::Telemetry => "Telemetry configurations",
        }
    }

    /// Label used by the configuration summary lines.
    pub fn summary_label(&self) -> &'static str {
        match self {
            ResourceKind::Telemetry => "Telemetry Configurations",
            other => other.display_name(),
        }
    }

    /// Lowercase label for error contexts, e.g. "failed to list gateways".
    pub fn error_label(&self) -> &'static str {
        match self {
            ResourceKind::VirtualService => "virtual services",
            ResourceKind::DestinationRule => "destination rules",
            ResourceKind::Gateway => "gateways",
            ResourceKind::ServiceEntry => "service entries",
            ResourceKind::AuthorizationPolicy => "authorization policies",
            ResourceKind::PeerAuthentication => "peer authentications",
            ResourceKind::EnvoyFilter => "envoy filters",
            ResourceKind::Telemetry => "telemetries",
        }
    }

    fn api_resource(&self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(self.group(), self.version(), self.kind_name());
        ApiResource::from_gvk_with_plural(&gvk, self.plural())
    }
}

/// One listed custom resource: its name plus the raw `spec` document the
/// formatters pull notable fields from.
#[derive(Debug, Clone)]
pub struct ResourceItem {
    pub name: String,
    pub spec: Value,
}

impl ResourceItem {
    pub fn new(name: impl Into<String>, spec: Value) -> Self {
        Self { name: name.into(), spec }
    }
}

/// Read-only cluster queries used by the tool handlers.
///
/// Item ordering is whatever the backend returns; callers must not assume
/// any particular order.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List one Istio custom resource kind in a namespace.
    async fn list_custom(&self, kind: ResourceKind, namespace: &str) -> Result<Vec<ResourceItem>>;

    /// List Kubernetes services in a namespace.
    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>>;

    /// Fetch a single Kubernetes service.
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service>;

    /// List pods in a namespace, optionally filtered by label selector.
    async fn list_pods(&self, namespace: &str, label_selector: Option<&str>) -> Result<Vec<Pod>>;

    /// List running pods across every namespace (server-side phase filter).
    async fn list_running_pods_all_namespaces(&self) -> Result<Vec<Pod>>;

    /// Fetch the endpoints object backing a service, if it exists.
    async fn get_endpoints(&self, namespace: &str, name: &str) -> Result<Option<Endpoints>>;
}

/// Production [`ClusterClient`] backed by a `kube` client.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Build a client from the resolved kubeconfig source, merging every
    /// contributing file in precedence order. Fails if any file cannot be
    /// read or the merged configuration yields no usable context.
    pub async fn new(source: &KubeconfigSource) -> Result<Self> {
        let mut merged = Kubeconfig::default();
        for path in source.paths() {
            let piece = Kubeconfig::read_from(path).map_err(|e| {
                Error::config_with_source(
                    format!("failed to read kubeconfig {}", path.display()),
                    Box::new(e),
                )
            })?;
            merged = merged.merge(piece).map_err(|e| {
                Error::config_with_source(
                    format!("failed to merge kubeconfig {}", path.display()),
                    Box::new(e),
                )
            })?;
        }

        let config = Config::from_custom_kubeconfig(merged, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                Error::config_with_source("failed to build client configuration", Box::new(e))
            })?;
        let client = Client::try_from(config)
            .map_err(|e| Error::kube("failed to create kubernetes client", e))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn list_custom(&self, kind: ResourceKind, namespace: &str) -> Result<Vec<ResourceItem>> {
        let ar = kind.api_resource();
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::kube(format!("failed to list {}", kind.error_label()), e))?;

        Ok(list
            .items
            .into_iter()
            .map(|obj| ResourceItem {
                name: obj.metadata.name.unwrap_or_default(),
                spec: obj.data.get("spec").cloned().unwrap_or(Value::Null),
            })
            .collect())
    }

    async fn list_services(&self, namespace: &str) -> Result<Vec<Service>> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::kube("failed to list services", e))?;
        Ok(list.items)
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(|e| Error::kube(format!("failed to get service {}", name), e))
    }

    async fn list_pods(&self, namespace: &str, label_selector: Option<&str>) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        let list =
            api.list(&params).await.map_err(|e| Error::kube("failed to list pods", e))?;
        Ok(list.items)
    }

    async fn list_running_pods_all_namespaces(&self) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let params = ListParams::default().fields("status.phase=Running");
        let list = api.list(&params).await.map_err(|e| {
            Error::kube("failed to list running pods for Istio sidecar discovery", e)
        })?;
        Ok(list.items)
    }

    async fn get_endpoints(&self, namespace: &str, name: &str) -> Result<Option<Endpoints>> {
        let api: Api<Endpoints> = Api::namespaced(self.client.clone(), namespace);
        match api.get_opt(name).await {
            Ok(endpoints) => Ok(endpoints),
            Err(e) => Err(Error::kube(format!("failed to get endpoints {}", name), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_kind_api_coordinates() {
        assert_eq!(ResourceKind::VirtualService.group(), "networking.istio.io");
        assert_eq!(ResourceKind::VirtualService.version(), "v1alpha3");
        assert_eq!(ResourceKind::VirtualService.plural(), "virtualservices");
        assert_eq!(ResourceKind::AuthorizationPolicy.group(), "security.istio.io");
        assert_eq!(ResourceKind::AuthorizationPolicy.version(), "v1beta1");
        assert_eq!(ResourceKind::Telemetry.group(), "telemetry.istio.io");
        assert_eq!(ResourceKind::Telemetry.version(), "v1alpha1");
        assert_eq!(ResourceKind::ServiceEntry.plural(), "serviceentries");
    }

    #[test]
    fn display_names_match_listing_headers() {
        assert_eq!(ResourceKind::VirtualService.display_name(), "Virtual Services");
        assert_eq!(ResourceKind::Telemetry.display_name(), "Telemetry configurations");
        assert_eq!(ResourceKind::Telemetry.summary_label(), "Telemetry Configurations");
        assert_eq!(ResourceKind::Gateway.summary_label(), "Gateways");
    }
}
