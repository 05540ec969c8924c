//! Service and pod discovery handlers.
//!
//! These back the service → pod → proxy-command workflow: discover services,
//! find the pods behind one, then feed the pod names to the
//! proxy-introspection tools.

use k8s_openapi::api::core::v1::Pod;

use crate::errors::Result;
use crate::istio::client::ClusterClient;

/// Container name Istio injects as the sidecar proxy.
const ISTIO_PROXY_CONTAINER: &str = "istio-proxy";

/// Handler entry point for `get-services`.
pub async fn get_services(lister: &dyn ClusterClient, namespace: &str) -> Result<String> {
    let services = lister.list_services(namespace).await?;

    let mut result = format!("Services in namespace '{}':\n\n", namespace);
    result.push_str(&format!("Found {} services:\n\n", services.len()));

    if services.is_empty() {
        result.push_str("No services found in this namespace.\n");
        return Ok(result);
    }

    let mut cluster_ip = Vec::new();
    let mut node_port = Vec::new();
    let mut load_balancer = Vec::new();
    let mut headless = Vec::new();

    for service in &services {
        let name = service.metadata.name.as_deref().unwrap_or_default();
        let line = format!("{:<30}", name);
        let spec = service.spec.clone().unwrap_or_default();
        let ip = spec.cluster_ip.as_deref().unwrap_or_default();

        match spec.type_.as_deref() {
            Some("NodePort") => node_port.push(format!("{} (NodePort: {})", line, ip)),
            Some("LoadBalancer") => {
                let external = service
                    .status
                    .as_ref()
                    .and_then(|s| s.load_balancer.as_ref())
                    .and_then(|lb| lb.ingress.as_ref())
                    .and_then(|ingress| ingress.first())
                    .and_then(|entry| entry.ip.clone().or_else(|| entry.hostname.clone()))
                    .unwrap_or_else(|| "<pending>".to_string());
                load_balancer.push(format!("{} (LoadBalancer: {})", line, external));
            }
            _ => {
                if ip == "None" {
                    headless.push(format!("{} (Headless)", line));
                } else {
                    cluster_ip.push(format!("{} (ClusterIP: {})", line, ip));
                }
            }
        }
    }

    for (label, group) in [
        ("ClusterIP Services:", &cluster_ip),
        ("NodePort Services:", &node_port),
        ("LoadBalancer Services:", &load_balancer),
        ("Headless Services:", &headless),
    ] {
        if group.is_empty() {
            continue;
        }
        result.push_str(&format!(" {}\n", label));
        for entry in group {
            result.push_str(&format!("   {}\n", entry));
        }
        result.push('\n');
    }

    result.push_str(
        "Next step: Use 'get-pods-by-service' to find pods backing any of these services\n",
    );
    result.push_str(&format!(
        "   Example: get-pods-by-service --namespace {} --service <service-name>\n",
        namespace
    ));

    Ok(result)
}

/// Handler entry point for `get-pods-by-service`.
pub async fn get_pods_by_service(
    lister: &dyn ClusterClient,
    namespace: &str,
    service_name: &str,
) -> Result<String> {
    let service = lister.get_service(namespace, service_name).await?;

    let mut result =
        format!("Pods backing service '{}' in namespace '{}':\n\n", service_name, namespace);

    let selector = service.spec.as_ref().and_then(|s| s.selector.clone());
    let Some(selector) = selector else {
        result.push_str(&format!(
            "  Service '{}' has no selector - this is likely:\n",
            service_name
        ));
        result.push_str("   - A headless service with manual endpoints\n");
        result.push_str("   - An external service (ExternalName type)\n");
        result.push_str("   - A service with manually configured endpoints\n\n");

        // Show whatever endpoints were configured by hand, if any.
        if let Some(endpoints) = lister.get_endpoints(namespace, service_name).await? {
            let subsets = endpoints.subsets.unwrap_or_default();
            if !subsets.is_empty() {
                result.push_str(" Configured endpoints:\n");
                for subset in &subsets {
                    for address in subset.addresses.as_deref().unwrap_or_default() {
                        match address.target_ref.as_ref().filter(|r| r.kind.as_deref() == Some("Pod"))
                        {
                            Some(target) => result.push_str(&format!(
                                "   - Pod: {} (IP: {})\n",
                                target.name.as_deref().unwrap_or_default(),
                                address.ip
                            )),
                            None => result.push_str(&format!("   - IP: {}\n", address.ip)),
                        }
                    }
                }
            }
        }
        return Ok(result);
    };

    // Sorted for deterministic output; label selector semantics are unordered.
    let mut selector_parts: Vec<String> =
        selector.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    selector_parts.sort();
    let label_selector = selector_parts.join(",");

    let pods = lister.list_pods(namespace, Some(&label_selector)).await?;

    let (running, non_running): (Vec<&Pod>, Vec<&Pod>) =
        pods.iter().partition(|pod| pod_phase(pod) == "Running");

    result.push_str(&format!(" Service selector: {}\n", label_selector));
    result.push_str(&format!(
        " Total pods found: {} ({} running, {} not running)\n\n",
        pods.len(),
        running.len(),
        non_running.len()
    ));

    if !running.is_empty() {
        result.push_str(&format!(
            " Running pods ({}) - Ready for proxy commands:\n",
            running.len()
        ));
        for pod in &running {
            let name = pod.metadata.name.as_deref().unwrap_or_default();
            let ready = if is_pod_ready(pod) { "[ready]" } else { "[not-ready]" };
            let mesh = if has_istio_sidecar(pod) { "[sidecar]" } else { "[no-sidecar]" };
            result.push_str(&format!("   {} {} {}\n", ready, mesh, name));

            let ip = pod.status.as_ref().and_then(|s| s.pod_ip.as_deref()).unwrap_or_default();
            let node = pod.spec.as_ref().and_then(|s| s.node_name.as_deref()).unwrap_or_default();
            result.push_str(&format!("      IP: {:<15} Node: {}\n", ip, node));

            let app_containers: Vec<&str> = pod
                .spec
                .as_ref()
                .map(|s| {
                    s.containers
                        .iter()
                        .map(|c| c.name.as_str())
                        .filter(|name| *name != ISTIO_PROXY_CONTAINER)
                        .collect()
                })
                .unwrap_or_default();
            result.push_str(&format!("      Containers: {}\n", app_containers.join(", ")));

            if has_istio_sidecar(pod) {
                result.push_str("      Istio mesh: ENABLED\n");
            } else {
                result.push_str("      Istio mesh: NOT ENABLED\n");
            }
            result.push('\n');
        }
    }

    if !non_running.is_empty() {
        result.push_str(&format!(" Non-running pods ({}):\n", non_running.len()));
        for pod in &non_running {
            result.push_str(&format!(
                "   - {} (Status: {})\n",
                pod.metadata.name.as_deref().unwrap_or_default(),
                pod_phase(pod)
            ));
        }
        result.push('\n');
    }

    if running.is_empty() {
        result.push_str(" No running pods found backing this service!\n");
        result.push_str(" This could mean:\n");
        result.push_str("   - The deployment is scaled to 0 replicas\n");
        result.push_str("   - Pods are failing to start\n");
        result.push_str("   - Label selector mismatch between service and pods\n\n");
        return Ok(result);
    }

    result.push_str("Next steps - Use these pod names with proxy commands:\n");
    if let Some(example) = running.first().and_then(|pod| pod.metadata.name.as_deref()) {
        for command in
            ["get-proxy-status", "get-proxy-clusters", "get-proxy-listeners", "get-proxy-routes"]
        {
            result.push_str(&format!(
                "   {} --namespace {} --pod {}\n",
                command, namespace, example
            ));
        }
    }

    Ok(result)
}

/// Handler entry point for `discover-istio-namespaces`.
///
/// Ranks namespaces by how many running pods carry an Istio sidecar, so a
/// caller knows where mesh activity is concentrated.
pub async fn discover_istio_namespaces(lister: &dyn ClusterClient) -> Result<String> {
    let pods = lister.list_running_pods_all_namespaces().await?;

    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for pod in &pods {
        if pod_phase(pod) != "Running" {
            continue;
        }
        if has_istio_sidecar(pod) {
            let namespace = pod.metadata.namespace.clone().unwrap_or_default();
            *counts.entry(namespace).or_default() += 1;
        }
    }

    if counts.is_empty() {
        return Ok("No namespaces with Istio sidecars found".to_string());
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut result = format!("Found {} namespaces with Istio sidecars:\n\n", ranked.len());
    result.push_str("Rank | Namespace | Sidecar Count | Recommendation\n");
    result.push_str("-----|-----------|---------------|----------------\n");

    for (rank, (namespace, count)) in ranked.iter().enumerate() {
        let recommendation = match rank {
            0 => "BEST - Most Istio-injected workloads",
            1..=2 => "Good - High Istio adoption",
            3..=4 => "Moderate - Some Istio usage",
            _ => "Low - Minimal Istio usage",
        };
        result.push_str(&format!(
            "{:>4} | {:<9} | {:>13} | {}\n",
            rank + 1,
            namespace,
            count,
            recommendation
        ));
    }

    result.push_str(
        "\nRecommendation: Start with the top-ranked namespace for Istio operations as it likely contains the most Istio configuration and traffic.",
    );

    Ok(result)
}

fn pod_phase(pod: &Pod) -> &str {
    pod.status.as_ref().and_then(|s| s.phase.as_deref()).unwrap_or_default()
}

fn is_pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .map(|conditions| {
            conditions.iter().any(|c| c.type_ == "Ready" && c.status == "True")
        })
        .unwrap_or(false)
}

fn has_istio_sidecar(pod: &Pod) -> bool {
    pod.spec
        .as_ref()
        .map(|s| s.containers.iter().any(|c| c.name == ISTIO_PROXY_CONTAINER))
        .unwrap_or(false)
}
