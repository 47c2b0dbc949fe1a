//! In-memory clusters
//!
//! `MemoryCluster` answers `ResourceClient` calls from a fixed set of objects,
//! nodes and secrets, and `MemoryRegistry` serves a named set of them. Both are
//! used to exercise resolution without an API server.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::client::{DiscoveredResource, NodeInfo, ResourceClient, SecretInfo};
use super::error::ClientError;
use super::registry::{ClusterRegistry, FALLBACK_NAMESPACE};
use crate::models::{Gvr, ResourceKind, ResourceObject};

/// Operation key for `MemoryCluster::fail` covering `discover()`
pub const DISCOVERY: &str = "discovery";

#[derive(Debug, Clone)]
struct StoredSecret {
    namespace: String,
    labels: BTreeMap<String, String>,
    info: SecretInfo,
}

/// A cluster held entirely in memory
#[derive(Debug, Default)]
pub struct MemoryCluster {
    objects: Vec<(Gvr, ResourceObject)>,
    discovery: Vec<DiscoveredResource>,
    nodes: Vec<NodeInfo>,
    secrets: Vec<StoredSecret>,
    failures: BTreeMap<String, ClientError>,
    unreachable: Option<ClientError>,
    latency: Option<Duration>,
    calls: Mutex<BTreeMap<&'static str, usize>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise every built-in kind plus nodes through discovery
    pub fn with_builtin_types(mut self) -> Self {
        for kind in ResourceKind::all() {
            let gvr = kind.gvr();
            self.discovery.push(DiscoveredResource {
                group: gvr.group,
                version: gvr.version,
                plural: gvr.resource,
                kind: kind.as_str().to_string(),
                namespaced: kind.is_namespaced(),
                verbs: vec!["get".into(), "list".into(), "watch".into()],
            });
        }
        self.discovery.push(DiscoveredResource {
            group: String::new(),
            version: "v1".into(),
            plural: "nodes".into(),
            kind: "Node".into(),
            namespaced: false,
            verbs: vec!["get".into(), "list".into()],
        });
        self
    }

    pub fn with_type(mut self, resource: DiscoveredResource) -> Self {
        self.discovery.push(resource);
        self
    }

    /// Store an object under `gvr`
    pub fn with_object(mut self, gvr: Gvr, object: Value) -> Self {
        self.objects.push((gvr, ResourceObject::new(object)));
        self
    }

    pub fn with_namespace(self, name: &str) -> Self {
        self.with_object(
            ResourceKind::Namespace.gvr(),
            serde_json::json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": {"name": name, "uid": format!("ns-{}", name)}
            }),
        )
    }

    pub fn with_node(mut self, node: NodeInfo) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_secret(mut self, namespace: &str, labels: &[(&str, &str)], info: SecretInfo) -> Self {
        self.secrets.push(StoredSecret {
            namespace: namespace.to_string(),
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            info,
        });
        self
    }

    /// Fail every call touching `resource` (a plural, "nodes", "secrets" or
    /// `DISCOVERY`) with `err`
    pub fn fail(mut self, resource: &str, err: ClientError) -> Self {
        self.failures.insert(resource.to_string(), err);
        self
    }

    /// Fail every call with `err`
    pub fn unreachable(mut self, err: ClientError) -> Self {
        self.unreachable = Some(err);
        self
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// How many times `op` ("get", "list", "discover", "list_nodes",
    /// "list_secrets") was called
    pub fn calls(&self, op: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(op).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    async fn enter(&self, op: &'static str, resource: &str) -> Result<(), ClientError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(op).or_default() += 1;
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(err) = &self.unreachable {
            return Err(err.clone());
        }
        match self.failures.get(resource) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn objects_of<'a>(&'a self, gvr: &'a Gvr) -> impl Iterator<Item = &'a ResourceObject> + 'a {
        self.objects
            .iter()
            .filter(move |(stored, _)| stored.group == gvr.group && stored.resource == gvr.resource)
            .map(|(_, object)| object)
    }
}

/// Equality-only label selector match ("a=b,c=d"); a bare key tests presence
fn selector_matches(selector: &str, label: impl Fn(&str) -> Option<String>) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => {
                label(key.trim()).as_deref() == Some(value.trim_start_matches('=').trim())
            }
            None => label(term).is_some(),
        })
}

#[async_trait]
impl ResourceClient for MemoryCluster {
    async fn get(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ResourceObject, ClientError> {
        self.enter("get", &gvr.resource).await?;
        self.objects_of(gvr)
            .find(|object| object.name() == name && object.namespace() == namespace)
            .cloned()
            .ok_or_else(|| ClientError::not_found(format!("{} {:?} not found", gvr.resource, name)))
    }

    async fn list(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<ResourceObject>, ClientError> {
        self.enter("list", &gvr.resource).await?;
        Ok(self
            .objects_of(gvr)
            .filter(|object| namespace.is_none() || object.namespace() == namespace)
            .filter(|object| {
                label_selector.is_none_or(|selector| {
                    selector_matches(selector, |key| object.label(key).map(str::to_string))
                })
            })
            .cloned()
            .collect())
    }

    async fn discover(&self) -> Result<Vec<DiscoveredResource>, ClientError> {
        self.enter("discover", DISCOVERY).await?;
        Ok(self.discovery.clone())
    }

    async fn list_nodes(&self) -> Result<Vec<NodeInfo>, ClientError> {
        self.enter("list_nodes", "nodes").await?;
        Ok(self.nodes.clone())
    }

    async fn list_secrets(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<SecretInfo>, ClientError> {
        self.enter("list_secrets", "secrets").await?;
        Ok(self
            .secrets
            .iter()
            .filter(|secret| secret.namespace == namespace)
            .filter(|secret| {
                selector_matches(label_selector, |key| secret.labels.get(key).cloned())
            })
            .map(|secret| secret.info.clone())
            .collect())
    }
}

/// A fixed set of named in-memory clusters
#[derive(Default)]
pub struct MemoryRegistry {
    clusters: BTreeMap<String, (Arc<MemoryCluster>, Option<String>)>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cluster(mut self, context: &str, cluster: MemoryCluster) -> Self {
        self.clusters
            .insert(context.to_string(), (Arc::new(cluster), None));
        self
    }

    /// Add a cluster whose context names a default namespace
    pub fn with_cluster_in(mut self, context: &str, namespace: &str, cluster: MemoryCluster) -> Self {
        self.clusters.insert(
            context.to_string(),
            (Arc::new(cluster), Some(namespace.to_string())),
        );
        self
    }

    /// The cluster behind a context, for inspecting call counts
    pub fn cluster(&self, context: &str) -> Option<Arc<MemoryCluster>> {
        self.clusters.get(context).map(|(cluster, _)| Arc::clone(cluster))
    }
}

#[async_trait]
impl ClusterRegistry for MemoryRegistry {
    fn contexts(&self) -> Vec<String> {
        self.clusters.keys().cloned().collect()
    }

    fn default_namespace(&self, context: &str) -> Result<String, ClientError> {
        let (_, namespace) = self
            .clusters
            .get(context)
            .ok_or_else(|| ClientError::ContextNotFound(context.to_string()))?;
        Ok(namespace
            .clone()
            .unwrap_or_else(|| FALLBACK_NAMESPACE.to_string()))
    }

    async fn client(&self, context: &str) -> Result<Arc<dyn ResourceClient>, ClientError> {
        let (cluster, _) = self
            .clusters
            .get(context)
            .ok_or_else(|| ClientError::ContextNotFound(context.to_string()))?;
        let client: Arc<dyn ResourceClient> = cluster.clone();
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cluster() -> MemoryCluster {
        MemoryCluster::new()
            .with_object(
                ResourceKind::Pod.gvr(),
                json!({"metadata": {"name": "a", "namespace": "shop", "uid": "1", "labels": {"app": "web", "tier": "fe"}}}),
            )
            .with_object(
                ResourceKind::Pod.gvr(),
                json!({"metadata": {"name": "b", "namespace": "shop", "uid": "2", "labels": {"app": "db"}}}),
            )
            .with_object(
                ResourceKind::Pod.gvr(),
                json!({"metadata": {"name": "a", "namespace": "other", "uid": "3"}}),
            )
    }

    #[tokio::test]
    async fn test_get_respects_namespace() {
        let cluster = cluster();
        let pod = cluster
            .get(&ResourceKind::Pod.gvr(), Some("other"), "a")
            .await
            .unwrap();
        assert_eq!(pod.uid(), "3");
        let missing = cluster.get(&ResourceKind::Pod.gvr(), None, "a").await;
        assert!(missing.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_filters_by_selector() {
        let cluster = cluster();
        let pods = cluster
            .list(&ResourceKind::Pod.gvr(), Some("shop"), Some("app=web,tier=fe"))
            .await
            .unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].uid(), "1");

        let all = cluster
            .list(&ResourceKind::Pod.gvr(), None, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(cluster.calls("list"), 2);
    }

    #[tokio::test]
    async fn test_failures_are_scoped_to_resource() {
        let cluster = cluster().fail("pods", ClientError::forbidden("pods"));
        let err = cluster
            .list(&ResourceKind::Pod.gvr(), None, None)
            .await
            .unwrap_err();
        assert!(err.is_forbidden());
        assert!(cluster.list_nodes().await.is_ok());
    }

    #[tokio::test]
    async fn test_registry_namespaces() {
        let registry = MemoryRegistry::new()
            .with_cluster("b", MemoryCluster::new())
            .with_cluster_in("a", "shop", MemoryCluster::new());
        assert_eq!(registry.contexts(), vec!["a", "b"]);
        assert_eq!(registry.default_namespace("a").unwrap(), "shop");
        assert_eq!(registry.default_namespace("b").unwrap(), "default");
        assert!(registry.client("c").await.is_err());
    }
}
