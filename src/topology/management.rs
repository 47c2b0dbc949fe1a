//! GitOps management-cluster topology
//!
//! A management cluster runs the GitOps controller and registers the clusters
//! it deploys into as labelled Secrets in its controller namespace. Each
//! Secret's `server` URL is resolved to an IPv4 address (or the `in-cluster`
//! sentinel), and the result is cached once per process:
//!
//! ```text
//! mgmt-a -> {10.0.1.10, 10.0.2.10}
//! mgmt-b -> {in-cluster}
//! ```
//!
//! A workload cluster is matched to its management cluster by comparing the
//! live InternalIPs of its control-plane nodes with those sets.

use std::collections::{BTreeMap, BTreeSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use url::{Host, Url};

#[cfg(test)]
use mockall::automock;

use crate::cluster::{ClusterRegistry, NodeInfo, ResourceClient};
use crate::models::ResourceKind;

/// Marker for a managed cluster addressed from inside the management cluster
pub const IN_CLUSTER: &str = "in-cluster";

pub const DEFAULT_GITOPS_NAMESPACE: &str = "argocd";
pub const DEFAULT_CLUSTER_SECRET_SELECTOR: &str = "argocd.argoproj.io/secret-type=cluster";

/// Secret data key holding the managed cluster's API server URL
const SERVER_KEY: &str = "server";

const IN_CLUSTER_HOST: &str = "kubernetes.default.svc";
const IN_CLUSTER_SUFFIX: &str = ".default.svc";

/// Labels whose presence marks a control-plane node
const CONTROL_PLANE_LABELS: &[&str] = &[
    "node-role.kubernetes.io/master",
    "node-role.kubernetes.io/control-plane",
];
const LEGACY_ROLE_LABEL: &str = "kubernetes.io/role";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyOptions {
    pub gitops_namespace: String,
    pub cluster_secret_selector: String,
    /// Longest a lookup waits for the cache build to finish
    pub readiness_wait: Duration,
    /// Per-cluster bound on the namespace probe and the secret list
    pub probe_timeout: Duration,
}

impl Default for TopologyOptions {
    fn default() -> Self {
        Self {
            gitops_namespace: DEFAULT_GITOPS_NAMESPACE.to_string(),
            cluster_secret_selector: DEFAULT_CLUSTER_SECRET_SELECTOR.to_string(),
            readiness_wait: Duration::from_secs(35),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Forward DNS for API server hostnames
#[cfg_attr(test, automock)]
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// First IPv4 address for `host`, if any
    async fn lookup_ipv4(&self, host: &str) -> Option<Ipv4Addr>;
}

/// `HostResolver` using the system resolver
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostResolver for SystemResolver {
    async fn lookup_ipv4(&self, host: &str) -> Option<Ipv4Addr> {
        match tokio::net::lookup_host((host, 0)).await {
            Ok(addrs) => addrs
                .filter_map(|addr| match addr.ip() {
                    IpAddr::V4(ip) => Some(ip),
                    IpAddr::V6(_) => None,
                })
                .next(),
            Err(e) => {
                tracing::warn!(host = %host, "DNS lookup failed: {}", e);
                None
            }
        }
    }
}

#[derive(Debug, Default)]
struct TopologyState {
    initialized: bool,
    clusters: BTreeMap<String, BTreeSet<String>>,
}

/// Write-once cache of management clusters and the API servers they manage
pub struct ManagementTopology {
    registry: Arc<dyn ClusterRegistry>,
    resolver: Arc<dyn HostResolver>,
    options: TopologyOptions,
    state: RwLock<TopologyState>,
    started: AtomicBool,
    ready: watch::Sender<bool>,
}

impl ManagementTopology {
    pub fn new(registry: Arc<dyn ClusterRegistry>, options: TopologyOptions) -> Arc<Self> {
        Self::with_resolver(registry, Arc::new(SystemResolver), options)
    }

    pub fn with_resolver(
        registry: Arc<dyn ClusterRegistry>,
        resolver: Arc<dyn HostResolver>,
        options: TopologyOptions,
    ) -> Arc<Self> {
        let (ready, _) = watch::channel(false);
        Arc::new(Self {
            registry,
            resolver,
            options,
            state: RwLock::new(TopologyState::default()),
            started: AtomicBool::new(false),
            ready,
        })
    }

    /// Start the build in the background unless it already started
    ///
    /// Must be called from within a Tokio runtime. Returns the build task
    /// only to the caller that started it.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.started.swap(true, Ordering::SeqCst) {
            return None;
        }
        let this = Arc::clone(self);
        Some(tokio::spawn(async move { this.build().await }))
    }

    /// Whether the build has completed
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait, at most `readiness_wait`, for the build to complete
    ///
    /// Returns immediately once it has.
    pub async fn wait_ready(&self) -> bool {
        let mut rx = self.ready.subscribe();
        match tokio::time::timeout(self.options.readiness_wait, rx.wait_for(|ready| *ready)).await
        {
            Ok(Ok(_)) => true,
            _ => false,
        }
    }

    /// The management cluster responsible for `workload`, if any
    ///
    /// Starts the build if nobody has, then waits for it within the readiness
    /// bound. When multiple management clusters claim the workload, the first
    /// by name wins.
    pub async fn find_management_cluster(self: &Arc<Self>, workload: &str) -> Option<String> {
        self.start();
        if !self.wait_ready().await {
            tracing::warn!(
                workload = %workload,
                waited = ?self.options.readiness_wait,
                "Management topology not ready"
            );
            return None;
        }

        if self.state.read().await.clusters.is_empty() {
            tracing::debug!(workload = %workload, "No management clusters known");
            return None;
        }

        let workload_ips = self.control_plane_ips(workload).await;
        if workload_ips.is_empty() {
            tracing::warn!(workload = %workload, "No control-plane IPs for workload cluster");
            return None;
        }
        let state = self.state.read().await;
        for (management, managed) in &state.clusters {
            if let Some(ip) = workload_ips.iter().find(|ip| managed.contains(*ip)) {
                tracing::debug!(
                    workload = %workload,
                    management = %management,
                    ip = %ip,
                    "Matched management cluster"
                );
                return Some(management.clone());
            }
            if management == workload && managed.contains(IN_CLUSTER) {
                tracing::debug!(workload = %workload, "Cluster manages itself in-cluster");
                return Some(management.clone());
            }
        }

        tracing::debug!(
            workload = %workload,
            ips = ?workload_ips,
            "No management cluster found"
        );
        None
    }

    /// The built cache, once ready: management cluster -> sorted managed hosts
    pub async fn snapshot(self: &Arc<Self>) -> Option<BTreeMap<String, Vec<String>>> {
        self.start();
        if !self.wait_ready().await {
            return None;
        }
        let state = self.state.read().await;
        Some(
            state
                .clusters
                .iter()
                .map(|(name, hosts)| (name.clone(), hosts.iter().cloned().collect()))
                .collect(),
        )
    }

    /// InternalIPs of the control-plane nodes of `context`, listed live
    pub async fn control_plane_ips(&self, context: &str) -> Vec<String> {
        let nodes = match self.registry.client(context).await {
            Ok(client) => client.list_nodes().await,
            Err(e) => Err(e),
        };
        match nodes {
            Ok(nodes) => nodes
                .iter()
                .filter(|node| is_control_plane(node))
                .flat_map(|node| node.internal_ips.iter().cloned())
                .collect(),
            Err(e) => {
                tracing::warn!(context = %context, "Failed to list nodes: {}", e);
                Vec::new()
            }
        }
    }

    /// Resolve a registered server URL to an IPv4 address or `IN_CLUSTER`
    pub async fn resolve_server_host(&self, server_url: &str) -> Option<String> {
        let host = server_host(server_url)?;
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Some(ip.to_string());
        }
        if host == IN_CLUSTER_HOST || host.ends_with(IN_CLUSTER_SUFFIX) {
            return Some(IN_CLUSTER.to_string());
        }
        let resolved = self.resolver.lookup_ipv4(&host).await;
        if resolved.is_none() {
            tracing::warn!(host = %host, "No IPv4 address for managed cluster host");
        }
        resolved.map(|ip| ip.to_string())
    }

    async fn build(&self) {
        let mut state = self.state.write().await;
        if state.initialized {
            return;
        }

        let started = Instant::now();
        let contexts = self.registry.contexts();
        tracing::info!(contexts = contexts.len(), "Building management topology");

        let probes = contexts.iter().map(|context| async move {
            (context.clone(), self.managed_hosts(context).await)
        });
        for (context, hosts) in join_all(probes).await {
            if hosts.is_empty() {
                continue;
            }
            tracing::info!(
                management = %context,
                managed = hosts.len(),
                "Found management cluster"
            );
            state.clusters.insert(context, hosts);
        }

        state.initialized = true;
        let found = state.clusters.len();
        drop(state);
        self.ready.send_replace(true);

        tracing::info!(
            management_clusters = found,
            elapsed = ?started.elapsed(),
            "Management topology ready"
        );
    }

    /// Hosts managed by `context`, empty when it is not a management cluster
    async fn managed_hosts(&self, context: &str) -> BTreeSet<String> {
        let mut hosts = BTreeSet::new();

        let client = match self.registry.client(context).await {
            Ok(client) => client,
            Err(e) => {
                tracing::debug!(context = %context, "Skipping cluster: {}", e);
                return hosts;
            }
        };
        if !self.has_gitops_namespace(context, client.as_ref()).await {
            return hosts;
        }

        let namespace = &self.options.gitops_namespace;
        let selector = &self.options.cluster_secret_selector;
        let secrets = match tokio::time::timeout(
            self.options.probe_timeout,
            client.list_secrets(namespace, selector),
        )
        .await
        {
            Ok(Ok(secrets)) => secrets,
            Ok(Err(e)) => {
                tracing::warn!(context = %context, "Failed to list cluster secrets: {}", e);
                return hosts;
            }
            Err(_) => {
                tracing::warn!(context = %context, "Timed out listing cluster secrets");
                return hosts;
            }
        };

        for secret in secrets {
            let Some(server) = secret.data.get(SERVER_KEY) else {
                tracing::debug!(context = %context, secret = %secret.name, "Cluster secret has no server");
                continue;
            };
            let server = String::from_utf8_lossy(server);
            if let Some(host) = self.resolve_server_host(&server).await {
                tracing::debug!(context = %context, secret = %secret.name, host = %host, "Managed cluster");
                hosts.insert(host);
            }
        }
        hosts
    }

    /// Forbidden counts as present; only a definite 404 means absent
    async fn has_gitops_namespace(&self, context: &str, client: &dyn ResourceClient) -> bool {
        let namespace = &self.options.gitops_namespace;
        let gvr = ResourceKind::Namespace.gvr();
        let probe = client.get(&gvr, None, namespace);
        match tokio::time::timeout(self.options.probe_timeout, probe).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) if e.is_forbidden() => true,
            Ok(Err(e)) if e.is_not_found() => false,
            Ok(Err(e)) => {
                tracing::debug!(context = %context, "Namespace probe failed: {}", e);
                false
            }
            Err(_) => {
                tracing::debug!(context = %context, "Namespace probe timed out");
                false
            }
        }
    }
}

/// Whether a node carries a control-plane role label
pub fn is_control_plane(node: &NodeInfo) -> bool {
    CONTROL_PLANE_LABELS
        .iter()
        .any(|label| node.labels.contains_key(*label))
        || node.labels.get(LEGACY_ROLE_LABEL).map(String::as_str) == Some("master")
}

/// Host part of an API server URL, without scheme or port
///
/// A bare `host:port` is accepted.
pub fn server_host(server_url: &str) -> Option<String> {
    let server_url = server_url.trim();
    let url = if server_url.contains("://") {
        Url::parse(server_url)
    } else {
        Url::parse(&format!("https://{}", server_url))
    }
    .ok()?;
    match url.host()? {
        Host::Domain(domain) => Some(domain.to_string()),
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MemoryRegistry;

    fn node(labels: &[(&str, &str)]) -> NodeInfo {
        NodeInfo {
            name: "n".to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            internal_ips: vec!["10.0.0.1".to_string()],
        }
    }

    #[test]
    fn test_is_control_plane() {
        assert!(is_control_plane(&node(&[("node-role.kubernetes.io/control-plane", "")])));
        assert!(is_control_plane(&node(&[("node-role.kubernetes.io/master", "")])));
        assert!(is_control_plane(&node(&[("kubernetes.io/role", "master")])));
        assert!(!is_control_plane(&node(&[("kubernetes.io/role", "node")])));
        assert!(!is_control_plane(&node(&[])));
    }

    #[test]
    fn test_server_host() {
        assert_eq!(server_host("https://10.1.2.3:6443").as_deref(), Some("10.1.2.3"));
        assert_eq!(
            server_host("https://api.prod.example.com").as_deref(),
            Some("api.prod.example.com")
        );
        assert_eq!(
            server_host("kubernetes.default.svc:443").as_deref(),
            Some("kubernetes.default.svc")
        );
        assert_eq!(server_host("https://[fd00::1]:6443").as_deref(), Some("fd00::1"));
        assert_eq!(server_host(""), None);
    }

    fn topology(resolver: MockHostResolver) -> Arc<ManagementTopology> {
        ManagementTopology::with_resolver(
            Arc::new(MemoryRegistry::new()),
            Arc::new(resolver),
            TopologyOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_literal_ip_and_in_cluster_skip_dns() {
        let mut resolver = MockHostResolver::new();
        resolver.expect_lookup_ipv4().never();
        let topology = topology(resolver);

        assert_eq!(
            topology.resolve_server_host("https://10.1.2.3:6443").await.as_deref(),
            Some("10.1.2.3")
        );
        assert_eq!(
            topology
                .resolve_server_host("https://kubernetes.default.svc")
                .await
                .as_deref(),
            Some(IN_CLUSTER)
        );
        assert_eq!(
            topology
                .resolve_server_host("https://argocd-server.default.svc:443")
                .await
                .as_deref(),
            Some(IN_CLUSTER)
        );
    }

    #[tokio::test]
    async fn test_hostname_resolves_through_dns() {
        let mut resolver = MockHostResolver::new();
        resolver
            .expect_lookup_ipv4()
            .withf(|host| host == "api.prod.example.com")
            .times(1)
            .returning(|_| Some(Ipv4Addr::new(10, 9, 8, 7)));
        resolver
            .expect_lookup_ipv4()
            .withf(|host| host == "gone.example.com")
            .returning(|_| None);
        let topology = topology(resolver);

        assert_eq!(
            topology
                .resolve_server_host("https://api.prod.example.com:6443")
                .await
                .as_deref(),
            Some("10.9.8.7")
        );
        assert_eq!(
            topology.resolve_server_host("https://gone.example.com").await,
            None
        );
    }

    #[tokio::test]
    async fn test_empty_registry_is_ready_and_empty() {
        let topology = topology(MockHostResolver::new());
        assert!(!topology.is_ready());
        assert_eq!(topology.find_management_cluster("any").await, None);
        assert!(topology.is_ready());
        assert_eq!(topology.snapshot().await, Some(BTreeMap::new()));
        assert!(topology.start().is_none());
    }
}
