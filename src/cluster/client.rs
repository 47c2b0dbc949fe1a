//! Per-cluster client capability consumed by the topology resolver

use async_trait::async_trait;
use std::collections::BTreeMap;

use super::error::ClientError;
use crate::models::{Gvr, ResourceObject};

/// A resource type reported by API discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredResource {
    pub group: String,
    pub version: String,
    /// Plural resource name, e.g. "deployments"
    pub plural: String,
    pub kind: String,
    pub namespaced: bool,
    pub verbs: Vec<String>,
}

impl DiscoveredResource {
    pub fn gvr(&self) -> Gvr {
        Gvr::new(&self.group, &self.version, &self.plural)
    }

    pub fn group_version(&self) -> String {
        self.gvr().api_version()
    }

    pub fn supports(&self, verb: &str) -> bool {
        self.verbs.iter().any(|v| v == verb)
    }
}

/// The parts of a Node the topology cache needs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeInfo {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    /// Addresses of type `InternalIP`, in reported order
    pub internal_ips: Vec<String>,
}

/// A Secret with its raw byte-valued data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretInfo {
    pub name: String,
    pub data: BTreeMap<String, Vec<u8>>,
}

/// Get/list access to one cluster
///
/// `namespace: None` addresses cluster-scoped resources (or all namespaces
/// when listing a namespaced type).
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetch one object
    async fn get(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ResourceObject, ClientError>;

    /// List objects, optionally filtered by a label selector
    async fn list(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<ResourceObject>, ClientError>;

    /// Discover resource types across all API groups
    ///
    /// Groups whose discovery fails are skipped, not reported as an error.
    async fn discover(&self) -> Result<Vec<DiscoveredResource>, ClientError>;

    async fn list_nodes(&self) -> Result<Vec<NodeInfo>, ClientError>;

    async fn list_secrets(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<SecretInfo>, ClientError>;
}
