//! Resource-listing handlers and their text formatters.
//!
//! Each listing renders a count header followed by one block per item with
//! a small fixed set of notable spec fields. Item order is whatever the
//! backend returned; no client-side sorting happens here. Lists render as
//! `[a, b]` and label maps as `{k=v}` with sorted keys, so output for a
//! given backend response is deterministic.

use serde_json::Value;
use tracing::warn;

use crate::errors::Result;
use crate::istio::client::{ClusterClient, ResourceItem, ResourceKind};

/// List one resource kind and render the standard listing text.
pub async fn list_and_format(
    lister: &dyn ClusterClient,
    kind: ResourceKind,
    namespace: &str,
) -> Result<String> {
    let items = lister.list_custom(kind, namespace).await?;
    Ok(format_listing(kind, namespace, &items))
}

/// Render the listing for an already-fetched collection.
pub fn format_listing(kind: ResourceKind, namespace: &str, items: &[ResourceItem]) -> String {
    let mut result =
        format!("Found {} {} in namespace '{}':\n", items.len(), kind.display_name(), namespace);
    for item in items {
        result.push_str(&format!("- {}\n", item.name));
        result.push_str(&item_details(kind, &item.spec));
    }
    result
}

fn item_details(kind: ResourceKind, spec: &Value) -> String {
    match kind {
        ResourceKind::VirtualService => virtual_service_details(spec),
        ResourceKind::DestinationRule => destination_rule_details(spec),
        ResourceKind::Gateway => gateway_details(spec),
        ResourceKind::ServiceEntry => service_entry_details(spec),
        ResourceKind::AuthorizationPolicy => authorization_policy_details(spec),
        ResourceKind::PeerAuthentication => peer_authentication_details(spec),
        ResourceKind::EnvoyFilter => envoy_filter_details(spec),
        ResourceKind::Telemetry => telemetry_details(spec),
    }
}

fn virtual_service_details(spec: &Value) -> String {
    let mut out = String::new();
    let hosts = string_list(spec, &["hosts"]);
    if !hosts.is_empty() {
        out.push_str(&format!("  Hosts: {}\n", render_list(&hosts)));
    }
    let gateways = string_list(spec, &["gateways"]);
    if !gateways.is_empty() {
        out.push_str(&format!("  Gateways: {}\n", render_list(&gateways)));
    }
    let http = array_len(spec, "http");
    if http > 0 {
        out.push_str(&format!("  HTTP Routes: {}\n", http));
    }
    let tcp = array_len(spec, "tcp");
    if tcp > 0 {
        out.push_str(&format!("  TCP Routes: {}\n", tcp));
    }
    let tls = array_len(spec, "tls");
    if tls > 0 {
        out.push_str(&format!("  TLS Routes: {}\n", tls));
    }
    out.push('\n');
    out
}

fn destination_rule_details(spec: &Value) -> String {
    match spec.get("host").and_then(Value::as_str) {
        Some(host) if !host.is_empty() => format!("  Host: {}\n", host),
        _ => String::new(),
    }
}

fn gateway_details(spec: &Value) -> String {
    let selector = label_pairs(spec, &["selector"]);
    if selector.is_empty() {
        String::new()
    } else {
        format!("  Selector: {}\n", render_labels(&selector))
    }
}

fn service_entry_details(spec: &Value) -> String {
    let mut out = String::new();
    let hosts = string_list(spec, &["hosts"]);
    if !hosts.is_empty() {
        out.push_str(&format!("  Hosts: {}\n", render_list(&hosts)));
    }
    if let Some(location) = spec.get("location").and_then(Value::as_str) {
        out.push_str(&format!("  Location: {}\n", location));
    }
    out
}

fn authorization_policy_details(spec: &Value) -> String {
    let mut out = String::new();
    let selector = label_pairs(spec, &["selector", "matchLabels"]);
    if !selector.is_empty() {
        out.push_str(&format!("  Selector: {}\n", render_labels(&selector)));
    }
    out.push_str(&format!("  Action: {}\n", authorization_action(spec)));
    out
}

fn peer_authentication_details(spec: &Value) -> String {
    let mut out = String::new();
    let selector = label_pairs(spec, &["selector", "matchLabels"]);
    if !selector.is_empty() {
        out.push_str(&format!("  Selector: {}\n", render_labels(&selector)));
    }
    if let Some(mtls) = spec.get("mtls") {
        let mode = mtls.get("mode").and_then(Value::as_str).unwrap_or("UNSET");
        out.push_str(&format!("  mTLS Mode: {}\n", mode));
    }
    out
}

fn envoy_filter_details(spec: &Value) -> String {
    let labels = label_pairs(spec, &["workloadSelector", "labels"]);
    if labels.is_empty() {
        String::new()
    } else {
        format!("  Workload Selector: {}\n", render_labels(&labels))
    }
}

fn telemetry_details(spec: &Value) -> String {
    let selector = label_pairs(spec, &["selector", "matchLabels"]);
    if selector.is_empty() {
        String::new()
    } else {
        format!("  Selector: {}\n", render_labels(&selector))
    }
}

/// The action an authorization policy takes; the field defaults to ALLOW
/// when unset, matching the CRD default.
fn authorization_action(spec: &Value) -> &str {
    spec.get("action").and_then(Value::as_str).unwrap_or("ALLOW")
}

// -----------------------------------------------------------------------------
// Configuration summary
// -----------------------------------------------------------------------------

/// Outcome of one sub-query of the configuration summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Counted(usize),
    Skipped(String),
}

/// Per-kind outcome of the configuration summary aggregation.
#[derive(Debug, Clone)]
pub struct KindSummary {
    pub kind: ResourceKind,
    pub outcome: SummaryOutcome,
}

/// Count every resource kind in a namespace, recording failures as
/// `Skipped` outcomes instead of aborting. The summary is best-effort.
pub async fn summarize_config(lister: &dyn ClusterClient, namespace: &str) -> Vec<KindSummary> {
    let mut summaries = Vec::with_capacity(ResourceKind::ALL.len());
    for kind in ResourceKind::ALL {
        let outcome = match lister.list_custom(kind, namespace).await {
            Ok(items) => SummaryOutcome::Counted(items.len()),
            Err(e) => SummaryOutcome::Skipped(e.to_string()),
        };
        summaries.push(KindSummary { kind, outcome });
    }
    summaries
}

/// Render the summary. Skipped kinds are logged and their line omitted.
pub fn render_config_summary(namespace: &str, summaries: &[KindSummary]) -> String {
    let mut result = format!("Istio Configuration Summary for namespace '{}':\n\n", namespace);
    for summary in summaries {
        match &summary.outcome {
            SummaryOutcome::Counted(count) => {
                result.push_str(&format!("{}: {}\n", summary.kind.summary_label(), count));
            }
            SummaryOutcome::Skipped(reason) => {
                warn!(
                    kind = summary.kind.kind_name(),
                    namespace = %namespace,
                    reason = %reason,
                    "Skipping resource kind in configuration summary"
                );
            }
        }
    }
    result
}

/// Handler entry point for `get-istio-config`.
pub async fn config_summary(lister: &dyn ClusterClient, namespace: &str) -> Result<String> {
    let summaries = summarize_config(lister, namespace).await;
    Ok(render_config_summary(namespace, &summaries))
}

// -----------------------------------------------------------------------------
// External dependency check
// -----------------------------------------------------------------------------

/// Handler entry point for `check-external-dependency-availability`.
///
/// Unlike the configuration summary, every listing here is mandatory: a
/// verdict built on partial data would be misleading, so any query failure
/// aborts the whole check.
pub async fn check_external_dependency(
    lister: &dyn ClusterClient,
    service_name: &str,
    external_host: &str,
    namespace: &str,
) -> Result<String> {
    let mut result = format!(
        "External Dependency Check for service '{}' -> '{}' in namespace '{}':\n\n",
        service_name, external_host, namespace
    );

    let service_entries = lister.list_custom(ResourceKind::ServiceEntry, namespace).await?;
    let mut service_entry = service_entries
        .iter()
        .find(|se| string_list(&se.spec, &["hosts"]).iter().any(|h| h == external_host))
        .map(|se| {
            format!("[OK] Service Entry: '{}' found in namespace '{}'", se.name, namespace)
        });

    if service_entry.is_none() {
        // Global external dependencies are commonly registered in istio-system.
        let global = lister.list_custom(ResourceKind::ServiceEntry, "istio-system").await?;
        service_entry = global
            .iter()
            .find(|se| string_list(&se.spec, &["hosts"]).iter().any(|h| h == external_host))
            .map(|se| {
                format!("[OK] Service Entry: '{}' found in namespace 'istio-system' (global)", se.name)
            });
    }

    let service_entry_found = service_entry.is_some();
    let service_entry_details = service_entry
        .unwrap_or_else(|| "[MISSING] Service Entry: Not found for external host".to_string());

    let virtual_services = lister.list_custom(ResourceKind::VirtualService, namespace).await?;
    let virtual_service = virtual_services
        .iter()
        .find(|vs| string_list(&vs.spec, &["hosts"]).iter().any(|h| h == external_host))
        .map(|vs| format!("[OK] Virtual Service: '{}' found with routing rules", vs.name));
    let virtual_service_found = virtual_service.is_some();
    let virtual_service_details = virtual_service.unwrap_or_else(|| {
        "[WARNING] Virtual Service: No specific routing rules found (may use default routing)"
            .to_string()
    });

    let destination_rules = lister.list_custom(ResourceKind::DestinationRule, namespace).await?;
    let destination_rule = destination_rules
        .iter()
        .find(|dr| dr.spec.get("host").and_then(Value::as_str) == Some(external_host))
        .map(|dr| format!("[OK] Destination Rule: '{}' found with traffic policies", dr.name));
    let destination_rule_found = destination_rule.is_some();
    let destination_rule_details = destination_rule.unwrap_or_else(|| {
        "[WARNING] Destination Rule: No specific traffic policies found (may use default policies)"
            .to_string()
    });

    let policies = lister.list_custom(ResourceKind::AuthorizationPolicy, namespace).await?;
    let authorization_policy = policies
        .iter()
        .find(|ap| authorization_action(&ap.spec) == "ALLOW")
        .map(|ap| format!("[OK] Authorization Policy: '{}' found (ALLOW action)", ap.name));
    let authorization_policy_details = authorization_policy.unwrap_or_else(|| {
        "[WARNING] Authorization Policy: No explicit ALLOW policies found (may use default allow)"
            .to_string()
    });

    result.push_str(&service_entry_details);
    result.push('\n');
    result.push_str(&virtual_service_details);
    result.push('\n');
    result.push_str(&destination_rule_details);
    result.push('\n');
    result.push_str(&authorization_policy_details);
    result.push_str("\n\n");

    if service_entry_found {
        result.push_str(&format!(
            "[RESULT] External dependency '{}' is available for service '{}'\n",
            external_host, service_name
        ));
        result.push_str(
            "   The Service Entry exists, which means the external service is registered in the mesh.\n",
        );
        if virtual_service_found || destination_rule_found {
            result.push_str("   Additional routing and traffic policies are configured.\n");
        }
    } else {
        result.push_str(&format!(
            "[RESULT] External dependency '{}' is NOT available for service '{}'\n",
            external_host, service_name
        ));
        result.push_str(&format!(
            "   You need to create a Service Entry for '{}' before the service can access it.\n",
            external_host
        ));
        result.push_str(&format!(
            "   Consider creating it in namespace '{}' or globally in 'istio-system'.\n",
            namespace
        ));
    }

    Ok(result)
}

// -----------------------------------------------------------------------------
// Spec field extraction
// -----------------------------------------------------------------------------

/// Follow `path` into the spec and collect an array of strings.
fn string_list(spec: &Value, path: &[&str]) -> Vec<String> {
    let mut current = spec;
    for key in path {
        match current.get(key) {
            Some(next) => current = next,
            None => return Vec::new(),
        }
    }
    current
        .as_array()
        .map(|values| {
            values.iter().filter_map(Value::as_str).map(str::to_string).collect()
        })
        .unwrap_or_default()
}

/// Follow `path` into the spec and collect a string-to-string map as
/// sorted key/value pairs.
fn label_pairs(spec: &Value, path: &[&str]) -> Vec<(String, String)> {
    let mut current = spec;
    for key in path {
        match current.get(key) {
            Some(next) => current = next,
            None => return Vec::new(),
        }
    }
    let mut pairs: Vec<(String, String)> = current
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default();
    pairs.sort();
    pairs
}

fn array_len(spec: &Value, key: &str) -> usize {
    spec.get(key).and_then(Value::as_array).map(|a| a.len()).unwrap_or(0)
}

fn render_list(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

fn render_labels(pairs: &[(String, String)]) -> String {
    let rendered: Vec<String> = pairs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{{{}}}", rendered.join(", "))
}
