//! In-crate test fixtures: a [`ClusterClient`] backed by canned data.
//!
//! Only available in test builds.

use std::collections::HashMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Container, Endpoints, Pod, PodCondition, PodSpec, PodStatus, Service, ServicePort,
    ServiceSpec, ServiceStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::errors::{Error, Result};
use crate::istio::client::{ClusterClient, ResourceItem, ResourceKind};

type CustomKey = (ResourceKind, String);

/// Fixture-backed cluster client. Unknown queries return empty collections;
/// errors are injected per (kind, namespace) pair.
#[derive(Default)]
pub(crate) struct FakeClusterClient {
    custom: HashMap<CustomKey, Vec<ResourceItem>>,
    custom_errors: HashMap<CustomKey, String>,
    services: HashMap<String, Vec<Service>>,
    pods: HashMap<String, Vec<Pod>>,
    running_pods: Vec<Pod>,
    endpoints: HashMap<(String, String), Endpoints>,
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

    pub fn with_pods(mut self, namespace: &str, pods: Vec<Pod>) -> Self {
        self.pods.insert(namespace.to_string(), pods);
        self
    }

    pub fn with_running_pods(mut self, pods: Vec<Pod>) -> Self {
        self.running_pods = pods;
        self
    }

    pub fn with_endpoints(mut self, namespace: &str, name: &str, endpoints: Endpoints) -> Self {
        self.endpoints.insert((namespace.to_string(), name.to_string()), endpoints);
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
            .ok_or_else(|| {
                Error::internal(format!("failed to get service {}: services \"{}\" not found", name, name))
            })
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

    async fn get_endpoints(&self, namespace: &str, name: &str) -> Result<Option<Endpoints>> {
        Ok(self.endpoints.get(&(namespace.to_string(), name.to_string())).cloned())
    }
}

/// Build a pod fixture with the given containers and runtime state.
pub(crate) fn pod_fixture(
    name: &str,
    namespace: &str,
    phase: &str,
    ready: bool,
    containers: &[&str],
    labels: &[(&str, &str)],
) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(
                labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            ),
            ..Default::default()
        },
        spec: Some(PodSpec {
            node_name: Some("node-1".to_string()),
            containers: containers
                .iter()
                .map(|c| Container { name: c.to_string(), ..Default::default() })
                .collect(),
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            pod_ip: Some("10.0.0.7".to_string()),
            conditions: Some(vec![PodCondition {
                type_: "Ready".to_string(),
                status: if ready { "True" } else { "False" }.to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
    }
}

/// Build a service fixture of the given type.
pub(crate) fn service_fixture(
    name: &str,
    type_: &str,
    cluster_ip: &str,
    selector: &[(&str, &str)],
) -> Service {
    Service {
        metadata: ObjectMeta { name: Some(name.to_string()), ..Default::default() },
        spec: Some(ServiceSpec {
            type_: Some(type_.to_string()),
            cluster_ip: Some(cluster_ip.to_string()),
            selector: if selector.is_empty() {
                None
            } else {
                Some(selector.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
            },
            ports: Some(vec![ServicePort { port: 80, ..Default::default() }]),
            ..Default::default()
        }),
        status: Some(ServiceStatus::default()),
    }
}
