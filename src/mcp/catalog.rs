//! Tool Catalog
//!
//! The fixed, ordered set of read-only operations this server exposes.
//! Descriptors are built once per catalog and never mutated; a backend
//! reload rebuilds the whole catalog rather than editing it in place.
//! Handlers receive the live backend handle from the dispatcher at each
//! invocation, so a descriptor never holds a stale client.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::json;

use crate::errors::Result;
use crate::istio::{resources, workloads, ConfigSection, IstioBackend, ResourceKind};
use crate::mcp::dispatcher::ToolArgs;
use crate::mcp::protocol::{Tool, ToolAnnotations};

pub type HandlerFuture = BoxFuture<'static, Result<String>>;

/// Bound handler: `(live backend, validated arguments) -> formatted text`.
pub type Handler = Arc<dyn Fn(Arc<IstioBackend>, ToolArgs) -> HandlerFuture + Send + Sync>;

/// One declared tool parameter. Only flat string parameters exist in this
/// catalog; `default` is applied by the dispatcher when the caller omits
/// the value, and `missing_message` overrides the standard
/// `"<name> is required"` error text.
pub struct ToolParameter {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub default: Option<&'static str>,
    pub missing_message: Option<&'static str>,
}

impl ToolParameter {
    fn optional(name: &'static str, description: &'static str) -> Self {
        Self { name, description, required: false, default: None, missing_message: None }
    }

    fn optional_with_default(
        name: &'static str,
        description: &'static str,
        default: &'static str,
    ) -> Self {
        Self { name, description, required: false, default: Some(default), missing_message: None }
    }

    fn required(name: &'static str, description: &'static str) -> Self {
        Self { name, description, required: true, default: None, missing_message: None }
    }

    fn required_with_message(
        name: &'static str,
        description: &'static str,
        missing_message: &'static str,
    ) -> Self {
        Self { name, description, required: true, default: None, missing_message: Some(missing_message) }
    }
}

/// Immutable metadata plus the bound handler for one operation.
pub struct ToolDescriptor {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ToolParameter>,
    pub handler: Handler,
}

impl ToolDescriptor {
    /// Render the MCP tool definition: generated JSON schema plus the
    /// read-only / non-destructive annotations every descriptor carries.
    pub fn tool(&self) -> Tool {
        let mut properties = serde_json::Map::new();
        let mut required: Vec<&str> = Vec::new();
        for param in &self.parameters {
            properties.insert(
                param.name.to_string(),
                json!({"type": "string", "description": param.description}),
            );
            if param.required {
                required.push(param.name);
            }
        }
        let mut schema = json!({"type": "object", "properties": properties});
        if !required.is_empty() {
            schema["required"] = json!(required);
        }

        Tool {
            name: self.name.to_string(),
            description: Some(self.description.to_string()),
            input_schema: schema,
            annotations: Some(ToolAnnotations {
                title: Some(self.title.to_string()),
                read_only_hint: Some(true),
                destructive_hint: Some(false),
            }),
        }
    }
}

/// Available catalog profiles. Only the full profile exists today; the
/// flag is kept so adding restricted profiles stays a non-breaking change.
pub const PROFILE_NAMES: &[&str] = &["full"];

/// The catalog: category groups concatenated in a fixed order
/// (networking, security, configuration, proxy introspection), indexed by
/// exact tool name.
pub struct Catalog {
    descriptors: Vec<ToolDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl Catalog {
    /// Build the full catalog. Deterministic: the same descriptors in the
    /// same order on every call. No descriptor is omitted based on backend
    /// capability; unsupported operations fail at invocation instead.
    pub fn build() -> Self {
        let descriptors: Vec<ToolDescriptor> = networking_tools()
            .into_iter()
            .chain(security_tools())
            .chain(configuration_tools())
            .chain(proxy_tools())
            .collect();

        let mut index = HashMap::with_capacity(descriptors.len());
        for (position, descriptor) in descriptors.iter().enumerate() {
            let previous = index.insert(descriptor.name, position);
            debug_assert!(previous.is_none(), "duplicate tool name: {}", descriptor.name);
        }

        Self { descriptors, index }
    }

    /// Exact, case-sensitive lookup by name.
    pub fn find(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&position| &self.descriptors[position])
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// MCP tool definitions, in catalog order.
    pub fn tools(&self) -> Vec<Tool> {
        self.descriptors.iter().map(ToolDescriptor::tool).collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

// -----------------------------------------------------------------------------
// Handler constructors
// -----------------------------------------------------------------------------

fn listing_handler(kind: ResourceKind) -> Handler {
    Arc::new(move |backend, args| {
        Box::pin(async move {
            let namespace = args.optional_string("namespace").to_string();
            resources::list_and_format(backend.lister(), kind, &namespace).await
        })
    })
}

fn proxy_config_handler(section: ConfigSection) -> Handler {
    Arc::new(move |backend, args| {
        Box::pin(async move {
            let namespace = args.optional_string("namespace").to_string();
            let pod = args.require_string("pod")?.to_string();
            backend.proxy().proxy_config(section, &namespace, &pod).await
        })
    })
}

// -----------------------------------------------------------------------------
// Category groups
// -----------------------------------------------------------------------------

fn networking_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "get-virtual-services",
            title: "Istio: Virtual Services",
            description: "Get Istio Virtual Services configuration from any namespace. Virtual Services define routing rules for services in the Istio service mesh, including traffic splitting, fault injection, and retry policies. Use this to inspect traffic routing configuration across namespaces.",
            parameters: vec![ToolParameter::optional_with_default(
                "namespace",
                "Namespace to query (defaults to 'default'). Istio services can span multiple namespaces.",
                "default",
            )],
            handler: listing_handler(ResourceKind::VirtualService),
        },
        ToolDescriptor {
            name: "get-destination-rules",
            title: "Istio: Destination Rules",
            description: "Get Istio Destination Rules from any namespace. Destination Rules define policies for traffic to services, including load balancing, connection pooling, and outlier detection. Essential for understanding service mesh traffic policies.",
            parameters: vec![ToolParameter::optional_with_default(
                "namespace",
                "Namespace to query (defaults to 'default'). Check multiple namespaces for complete Istio configuration.",
                "default",
            )],
            handler: listing_handler(ResourceKind::DestinationRule),
        },
        ToolDescriptor {
            name: "get-gateways",
            title: "Istio: Gateways",
            description: "Get Istio Gateways from any namespace. Gateways configure load balancers for incoming traffic to the service mesh. Use this to inspect ingress/egress configuration and external access patterns.",
            parameters: vec![ToolParameter::optional_with_default(
                "namespace",
                "Namespace to query (defaults to 'default'). Gateway configurations may exist in ingress or dedicated namespaces.",
                "default",
            )],
            handler: listing_handler(ResourceKind::Gateway),
        },
        ToolDescriptor {
            name: "get-service-entries",
            title: "Istio: Service Entries",
            description: "Get Istio Service Entries from any namespace. Service Entries allow adding external services to the service mesh registry. Use this to inspect external service configurations and mesh expansion settings.",
            parameters: vec![ToolParameter::optional_with_default(
                "namespace",
                "Namespace to query (defaults to 'default'). External service configurations may be centralized in specific namespaces.",
                "default",
            )],
            handler: listing_handler(ResourceKind::ServiceEntry),
        },
    ]
}

fn security_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "get-authorization-policies",
            title: "Istio: Authorization Policies",
            description: "Get Istio Authorization Policies from any namespace. Authorization Policies control access to services in the Istio service mesh, defining who can access what resources. Use this to inspect security policies and access control configurations across namespaces.",
            parameters: vec![ToolParameter::optional_with_default(
                "namespace",
                "Namespace to query (defaults to 'default'). Security policies may be defined in multiple namespaces for different service boundaries.",
                "default",
            )],
            handler: listing_handler(ResourceKind::AuthorizationPolicy),
        },
        ToolDescriptor {
            name: "get-peer-authentications",
            title: "Istio: Peer Authentications",
            description: "Get Istio Peer Authentications from any namespace. Peer Authentication policies define mutual TLS settings and authentication requirements for service-to-service communication. Use this to inspect mTLS configuration and security posture.",
            parameters: vec![ToolParameter::optional_with_default(
                "namespace",
                "Namespace to query (defaults to 'default'). Authentication policies may be namespace-specific or inherited from mesh-wide settings.",
                "default",
            )],
            handler: listing_handler(ResourceKind::PeerAuthentication),
        },
    ]
}

fn configuration_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "discover-istio-namespaces",
            title: "Istio: Namespace Discovery",
            description: "Discover namespaces that have pods with Istio sidecars and rank them by injection density. This tool helps identify the most probable best namespace for Istio operations by analyzing which namespaces have the most Istio-injected workloads. Use this to prioritize which namespaces to investigate first for Istio configuration and traffic analysis.",
            parameters: vec![],
            handler: Arc::new(|backend, _args| {
                Box::pin(async move { workloads::discover_istio_namespaces(backend.lister()).await })
            }),
        },
        ToolDescriptor {
            name: "get-envoy-filters",
            title: "Istio: Envoy Filters",
            description: "Get Istio Envoy Filters from any namespace. Envoy Filters allow custom configuration of Envoy proxy behavior, including custom filters, listeners, and clusters. Use this to inspect advanced Istio service mesh configurations.",
            parameters: vec![ToolParameter::optional_with_default(
                "namespace",
                "Namespace to query (defaults to 'default'). Custom Envoy configurations may be applied to specific namespaces or workloads.",
                "default",
            )],
            handler: listing_handler(ResourceKind::EnvoyFilter),
        },
        ToolDescriptor {
            name: "get-telemetry",
            title: "Istio: Telemetry",
            description: "Get Istio Telemetry configurations from any namespace. Telemetry policies define observability settings including metrics, tracing, and logging for the service mesh. Use this to inspect monitoring and observability configurations.",
            parameters: vec![ToolParameter::optional_with_default(
                "namespace",
                "Namespace to query (defaults to 'default'). Telemetry policies may be namespace-specific or inherited from mesh-wide settings.",
                "default",
            )],
            handler: listing_handler(ResourceKind::Telemetry),
        },
        ToolDescriptor {
            name: "get-istio-config",
            title: "Istio: Configuration Summary",
            description: "Get comprehensive Istio configuration summary for any namespace. This provides an overview of all Istio resources including Virtual Services, Destination Rules, Gateways, Security Policies, and more. Use this for complete Istio service mesh configuration analysis.",
            parameters: vec![ToolParameter::optional_with_default(
                "namespace",
                "Namespace to query (defaults to 'default'). Provides complete Istio configuration overview for the specified namespace.",
                "default",
            )],
            handler: Arc::new(|backend, args| {
                Box::pin(async move {
                    let namespace = args.optional_string("namespace").to_string();
                    resources::config_summary(backend.lister(), &namespace).await
                })
            }),
        },
        ToolDescriptor {
            name: "check-external-dependency-availability",
            title: "Istio: External Dependency Check",
            description: "Check if an external dependency (like RDS, S3, etc.) is properly configured and accessible for a specific service. This tool validates that all required Istio resources (Service Entries, Virtual Services, Destination Rules, Authorization Policies) exist and are properly configured to allow the service to access the external dependency.",
            parameters: vec![
                ToolParameter::required(
                    "service-name",
                    "Name of the service that needs to access the external dependency",
                ),
                ToolParameter::required(
                    "external-host",
                    "External hostname to check (e.g., 'rds.amazonaws.com', 's3.amazonaws.com')",
                ),
                ToolParameter::optional_with_default(
                    "namespace",
                    "Namespace of the service (defaults to 'default'). The tool will check for Istio resources in this namespace and globally.",
                    "default",
                ),
            ],
            handler: Arc::new(|backend, args| {
                Box::pin(async move {
                    let service_name = args.require_string("service-name")?.to_string();
                    let external_host = args.require_string("external-host")?.to_string();
                    let namespace = args.optional_string("namespace").to_string();
                    resources::check_external_dependency(
                        backend.lister(),
                        &service_name,
                        &external_host,
                        &namespace,
                    )
                    .await
                })
            }),
        },
        ToolDescriptor {
            name: "get-services",
            title: "Kubernetes: Service Discovery",
            description: "List all Kubernetes services in a namespace. This is the first step in the workflow to find pods for proxy commands: 1) Use this tool to discover available services, 2) Then use 'get-pods-by-service' to find the specific pods backing a service, 3) Finally use proxy commands (get-proxy-clusters, get-proxy-status, etc.) with the discovered pod names. Perfect for understanding the service landscape before diving into Istio proxy configuration.",
            parameters: vec![ToolParameter::optional_with_default(
                "namespace",
                "Namespace to list services from (defaults to 'default'). Services are the entry points to your applications.",
                "default",
            )],
            handler: Arc::new(|backend, args| {
                Box::pin(async move {
                    let namespace = args.optional_string("namespace").to_string();
                    workloads::get_services(backend.lister(), &namespace).await
                })
            }),
        },
        ToolDescriptor {
            name: "get-pods-by-service",
            title: "Kubernetes: Service Pod Discovery",
            description: "Find all pods backing a specific Kubernetes service - essential for the proxy command workflow. After discovering services with 'get-services', use this tool to find the exact pod names you need for Istio proxy commands. Shows running vs non-running pods, Istio sidecar status, and provides ready-to-use pod names for proxy debugging commands like get-proxy-clusters, get-proxy-status, get-proxy-listeners, etc. This is step 2 in the service-to-pod-to-proxy command workflow.",
            parameters: vec![
                ToolParameter::optional_with_default(
                    "namespace",
                    "Namespace containing the service (defaults to 'default')",
                    "default",
                ),
                ToolParameter::required_with_message(
                    "service",
                    "Service name to find backing pods for (use 'get-services' first to discover available services)",
                    "service name is required - use 'get-services' first to discover available services",
                ),
            ],
            handler: Arc::new(|backend, args| {
                Box::pin(async move {
                    let namespace = args.optional_string("namespace").to_string();
                    let service = args.require_string("service")?.to_string();
                    workloads::get_pods_by_service(backend.lister(), &namespace, &service).await
                })
            }),
        },
    ]
}

fn proxy_tools() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: "get-proxy-clusters",
            title: "Istio: Proxy Clusters",
            description: "Get Envoy cluster configuration from any Istio proxy pod. Clusters represent upstream services and their load balancing settings. Use this for debugging service connectivity and load balancing issues in the Istio service mesh.",
            parameters: vec![
                ToolParameter::optional_with_default(
                    "namespace",
                    "Namespace of the pod (defaults to 'default'). Istio proxies can be in any namespace where services are deployed.",
                    "default",
                ),
                ToolParameter::required("pod", "Pod name containing the Istio proxy (sidecar)"),
            ],
            handler: proxy_config_handler(ConfigSection::Clusters),
        },
        ToolDescriptor {
            name: "get-proxy-listeners",
            title: "Istio: Proxy Listeners",
            description: "Get Envoy listener configuration from any Istio proxy pod. Listeners define how the proxy accepts incoming connections. Use this for debugging network connectivity and port binding issues in the service mesh.",
            parameters: vec![
                ToolParameter::optional_with_default(
                    "namespace",
                    "Namespace of the pod (defaults to 'default'). Check the namespace where your service pods are deployed.",
                    "default",
                ),
                ToolParameter::required("pod", "Pod name containing the Istio proxy (sidecar)"),
            ],
            handler: proxy_config_handler(ConfigSection::Listeners),
        },
        ToolDescriptor {
            name: "get-proxy-routes",
            title: "Istio: Proxy Routes",
            description: "Get Envoy route configuration from any Istio proxy pod. Routes define how requests are matched and routed to clusters. Use this for debugging traffic routing and Virtual Service configuration issues.",
            parameters: vec![
                ToolParameter::optional_with_default(
                    "namespace",
                    "Namespace of the pod (defaults to 'default'). Route configurations reflect Virtual Service rules applied to the pod.",
                    "default",
                ),
                ToolParameter::required("pod", "Pod name containing the Istio proxy (sidecar)"),
            ],
            handler: proxy_config_handler(ConfigSection::Routes),
        },
        ToolDescriptor {
            name: "get-proxy-endpoints",
            title: "Istio: Proxy Endpoints",
            description: "Get Envoy endpoint configuration from any Istio proxy pod. Endpoints represent the actual instances of upstream services. Use this for debugging service discovery and endpoint health issues.",
            parameters: vec![
                ToolParameter::optional_with_default(
                    "namespace",
                    "Namespace of the pod (defaults to 'default'). Endpoint configurations show service discovery results.",
                    "default",
                ),
                ToolParameter::required("pod", "Pod name containing the Istio proxy (sidecar)"),
            ],
            handler: proxy_config_handler(ConfigSection::Endpoints),
        },
        ToolDescriptor {
            name: "get-proxy-bootstrap",
            title: "Istio: Proxy Bootstrap",
            description: "Get Envoy bootstrap configuration from any Istio proxy pod. Bootstrap config contains the initial proxy configuration including admin interface settings. Use this for debugging proxy startup and configuration issues.",
            parameters: vec![
                ToolParameter::optional_with_default(
                    "namespace",
                    "Namespace of the pod (defaults to 'default'). Bootstrap config is generated during proxy initialization.",
                    "default",
                ),
                ToolParameter::required("pod", "Pod name containing the Istio proxy (sidecar)"),
            ],
            handler: proxy_config_handler(ConfigSection::Bootstrap),
        },
        ToolDescriptor {
            name: "get-proxy-config-dump",
            title: "Istio: Proxy Config Dump",
            description: "Get full Envoy configuration dump from any Istio proxy pod. This provides complete proxy configuration including all listeners, clusters, routes, and endpoints. Use this for comprehensive Istio proxy debugging and troubleshooting.",
            parameters: vec![
                ToolParameter::optional_with_default(
                    "namespace",
                    "Namespace of the pod (defaults to 'default'). Full config dump shows complete proxy state.",
                    "default",
                ),
                ToolParameter::required("pod", "Pod name containing the Istio proxy (sidecar)"),
            ],
            handler: proxy_config_handler(ConfigSection::All),
        },
        ToolDescriptor {
            name: "get-proxy-status",
            title: "Istio: Proxy Status",
            description: "Get proxy status information for all Istio proxies or a specific pod. Shows proxy sync status, configuration version, and connectivity health. Use this to monitor Istio service mesh health and configuration distribution.",
            parameters: vec![
                ToolParameter::optional(
                    "namespace",
                    "Namespace of the pod (optional). If specified, shows status for proxies in that namespace only.",
                ),
                ToolParameter::optional(
                    "pod",
                    "Pod name (optional, if not provided shows all proxies). Use this to check specific proxy sync status.",
                ),
            ],
            handler: Arc::new(|backend, args| {
                Box::pin(async move {
                    let namespace = args.optional_string("namespace").to_string();
                    let pod = args.optional_string("pod").to_string();
                    if !pod.is_empty() && !namespace.is_empty() {
                        backend.proxy().status_for_pod(&namespace, &pod).await
                    } else {
                        backend.proxy().status_all().await
                    }
                })
            }),
        },
        ToolDescriptor {
            name: "get-istio-analyze",
            title: "Istio: Configuration Analysis",
            description: "Analyze Istio configuration and report potential issues, misconfigurations, and best practice violations. This tool runs 'istioctl analyze' to provide comprehensive analysis of your Istio service mesh configuration.",
            parameters: vec![ToolParameter::optional(
                "namespace",
                "Namespace to analyze (optional). If specified, analyzes only the specified namespace. If not provided, analyzes the entire cluster.",
            )],
            handler: Arc::new(|backend, args| {
                Box::pin(async move {
                    let namespace = args.optional_string("namespace").to_string();
                    let scope = if namespace.is_empty() { None } else { Some(namespace.as_str()) };
                    backend.proxy().analyze(scope).await
                })
            }),
        },
    ]
}
