//! Built-in resource kind definitions
//!
//! Centralizes the Kubernetes kinds the topology resolver addresses directly,
//! so kind strings and their GVRs are not scattered across the codebase.

use std::fmt;
use std::str::FromStr;

use super::gvr::Gvr;

/// Kinds with dedicated handling in dependency resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Pod,
    ReplicaSet,
    Deployment,
    Service,
    Endpoints,
    EndpointSlice,
    ConfigMap,
    Secret,
    Namespace,
    Application,
}

impl ResourceKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::ReplicaSet => "ReplicaSet",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
            ResourceKind::Endpoints => "Endpoints",
            ResourceKind::EndpointSlice => "EndpointSlice",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Secret => "Secret",
            ResourceKind::Namespace => "Namespace",
            ResourceKind::Application => "Application",
        }
    }

    /// The well-known GVR for this kind
    pub fn gvr(&self) -> Gvr {
        match self {
            ResourceKind::Pod => Gvr::new("", "v1", "pods"),
            ResourceKind::ReplicaSet => Gvr::new("apps", "v1", "replicasets"),
            ResourceKind::Deployment => Gvr::new("apps", "v1", "deployments"),
            ResourceKind::Service => Gvr::new("", "v1", "services"),
            ResourceKind::Endpoints => Gvr::new("", "v1", "endpoints"),
            ResourceKind::EndpointSlice => Gvr::new("discovery.k8s.io", "v1", "endpointslices"),
            ResourceKind::ConfigMap => Gvr::new("", "v1", "configmaps"),
            ResourceKind::Secret => Gvr::new("", "v1", "secrets"),
            ResourceKind::Namespace => Gvr::new("", "v1", "namespaces"),
            ResourceKind::Application => Gvr::new("argoproj.io", "v1alpha1", "applications"),
        }
    }

    pub fn is_namespaced(&self) -> bool {
        !matches!(self, ResourceKind::Namespace)
    }

    /// Try to parse a kind name, returning None if it has no dedicated handling
    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    /// Look up a kind from its plural resource name (e.g. "replicasets")
    pub fn from_plural(plural: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.gvr().resource == plural)
    }

    pub fn all() -> &'static [Self] {
        &[
            ResourceKind::Pod,
            ResourceKind::ReplicaSet,
            ResourceKind::Deployment,
            ResourceKind::Service,
            ResourceKind::Endpoints,
            ResourceKind::EndpointSlice,
            ResourceKind::ConfigMap,
            ResourceKind::Secret,
            ResourceKind::Namespace,
            ResourceKind::Application,
        ]
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ResourceKind> for String {
    fn from(kind: ResourceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    /// Kind names are matched case-insensitively ("deployment" == "Deployment")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown resource kind: {}", s))
    }
}
