//! Shared fixtures for integration tests
//!
//! Object builders produce the JSON shape an API server returns, so they can
//! be loaded straight into a `MemoryCluster`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use kubeplorer::cluster::{ClusterRegistry, MemoryCluster, NodeInfo, SecretInfo};
use kubeplorer::models::ResourceKind;
use kubeplorer::topology::{HostResolver, ManagementTopology, TopologyOptions};

pub const NAMESPACE: &str = "shop";
pub const CLUSTER_SECRET_LABEL: (&str, &str) = ("argocd.argoproj.io/secret-type", "cluster");

/// Owner reference entry for `metadata.ownerReferences`
pub fn owner(kind: &str, name: &str, uid: &str) -> Value {
    let api_version = match kind {
        "Deployment" | "ReplicaSet" | "StatefulSet" | "DaemonSet" => "apps/v1",
        "Application" => "argoproj.io/v1alpha1",
        _ => "v1",
    };
    json!({"apiVersion": api_version, "kind": kind, "name": name, "uid": uid})
}

/// Object of any kind with optional owners and labels
pub fn object(
    api_version: &str,
    kind: &str,
    name: &str,
    uid: &str,
    owners: &[Value],
    labels: &[(&str, &str)],
) -> Value {
    let labels: serde_json::Map<String, Value> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect();
    json!({
        "apiVersion": api_version,
        "kind": kind,
        "metadata": {
            "name": name,
            "namespace": NAMESPACE,
            "uid": uid,
            "labels": labels,
            "ownerReferences": owners,
        }
    })
}

pub fn pod(name: &str, uid: &str, owners: &[Value], labels: &[(&str, &str)]) -> Value {
    object("v1", "Pod", name, uid, owners, labels)
}

pub fn replica_set(name: &str, uid: &str, replicas: i64, owners: &[Value]) -> Value {
    let mut rs = object("apps/v1", "ReplicaSet", name, uid, owners, &[]);
    rs["spec"] = json!({"replicas": replicas});
    rs
}

pub fn deployment(name: &str, uid: &str) -> Value {
    object("apps/v1", "Deployment", name, uid, &[], &[])
}

pub fn service(name: &str, uid: &str, selector: Value) -> Value {
    let mut svc = object("v1", "Service", name, uid, &[], &[]);
    svc["spec"] = json!({"selector": selector});
    svc
}

pub fn endpoints(name: &str, uid: &str) -> Value {
    object("v1", "Endpoints", name, uid, &[], &[])
}

pub fn endpoint_slice(name: &str, uid: &str, service: &str) -> Value {
    object(
        "discovery.k8s.io/v1",
        "EndpointSlice",
        name,
        uid,
        &[],
        &[("kubernetes.io/service-name", service)],
    )
}

pub fn config_map(name: &str, uid: &str, owners: &[Value]) -> Value {
    object("v1", "ConfigMap", name, uid, owners, &[])
}

/// Add an annotation to a built object
pub fn annotate(mut object: Value, key: &str, value: &str) -> Value {
    object["metadata"]["annotations"][key] = Value::String(value.to_string());
    object
}

pub fn control_plane_node(name: &str, ip: &str) -> NodeInfo {
    NodeInfo {
        name: name.to_string(),
        labels: [("node-role.kubernetes.io/control-plane".to_string(), String::new())]
            .into_iter()
            .collect(),
        internal_ips: vec![ip.to_string()],
    }
}

pub fn worker_node(name: &str, ip: &str) -> NodeInfo {
    NodeInfo {
        name: name.to_string(),
        labels: [("kubernetes.io/role".to_string(), "node".to_string())]
            .into_iter()
            .collect(),
        internal_ips: vec![ip.to_string()],
    }
}

pub fn cluster_secret(name: &str, server: &str) -> SecretInfo {
    SecretInfo {
        name: name.to_string(),
        data: [("server".to_string(), server.as_bytes().to_vec())]
            .into_iter()
            .collect(),
    }
}

/// A management cluster: `argocd` namespace plus one registration secret
/// per server URL
pub fn management_cluster(servers: &[&str]) -> MemoryCluster {
    servers
        .iter()
        .enumerate()
        .fold(
            MemoryCluster::new()
                .with_builtin_types()
                .with_namespace("argocd"),
            |cluster, (i, server)| {
                cluster.with_secret(
                    "argocd",
                    &[CLUSTER_SECRET_LABEL],
                    cluster_secret(&format!("cluster-{}", i), server),
                )
            },
        )
}

/// Store an `argoproj.io/v1alpha1` Application
pub fn with_application(cluster: MemoryCluster, namespace: &str, name: &str) -> MemoryCluster {
    cluster.with_object(
        ResourceKind::Application.gvr(),
        json!({
            "apiVersion": "argoproj.io/v1alpha1",
            "kind": "Application",
            "metadata": {"name": name, "namespace": namespace, "uid": format!("app-{}", name)}
        }),
    )
}

/// `HostResolver` answering from a fixed table
#[derive(Debug, Default)]
pub struct StaticResolver {
    hosts: HashMap<String, Ipv4Addr>,
}

impl StaticResolver {
    pub fn new(hosts: &[(&str, Ipv4Addr)]) -> Self {
        Self {
            hosts: hosts
                .iter()
                .map(|(host, ip)| (host.to_string(), *ip))
                .collect(),
        }
    }
}

#[async_trait]
impl HostResolver for StaticResolver {
    async fn lookup_ipv4(&self, host: &str) -> Option<Ipv4Addr> {
        self.hosts.get(host).copied()
    }
}

/// Topology options with short waits suitable for tests
pub fn fast_options() -> TopologyOptions {
    TopologyOptions {
        readiness_wait: Duration::from_secs(2),
        probe_timeout: Duration::from_millis(500),
        ..TopologyOptions::default()
    }
}

pub fn topology(
    registry: Arc<dyn ClusterRegistry>,
    hosts: &[(&str, Ipv4Addr)],
) -> Arc<ManagementTopology> {
    ManagementTopology::with_resolver(registry, Arc::new(StaticResolver::new(hosts)), fast_options())
}
