//! Result types for dependency queries

use serde::{Deserialize, Serialize};

/// Identity-only pointer to a live object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    pub name: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub uid: String,
}

impl ResourceRef {
    pub fn new(kind: &str, name: &str, namespace: Option<&str>, uid: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
            uid: uid.to_string(),
        }
    }
}

/// A GitOps Application and the management cluster it lives on
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationRef {
    pub name: String,
    pub namespace: String,
    /// Management cluster context name
    pub cluster: String,
}

/// Full topology answer for one object
///
/// `ancestors` is root-first; `descendants` never contains `current.uid` and
/// holds each UID at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyChain {
    pub ancestors: Vec<ResourceRef>,
    pub current: ResourceRef,
    pub descendants: Vec<ResourceRef>,
    pub applications: Vec<ApplicationRef>,
}

impl DependencyChain {
    pub fn new(current: ResourceRef) -> Self {
        Self {
            ancestors: Vec::new(),
            current,
            descendants: Vec::new(),
            applications: Vec::new(),
        }
    }
}
