//! Group-Version-Resource addressing

use serde::{Deserialize, Serialize};
use std::fmt;

/// Three-part identifier addressing a resource type on the API server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gvr {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl Gvr {
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
        }
    }

    /// Build a GVR from an `apiVersion` string ("apps/v1" or "v1") and a plural
    pub fn from_api_version(api_version: &str, resource: &str) -> Self {
        let (group, version) = split_api_version(api_version);
        Self::new(group, version, resource)
    }

    /// The `apiVersion` form of the group and version ("v1" for the core group)
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    pub fn is_core(&self) -> bool {
        self.group.is_empty()
    }
}

impl fmt::Display for Gvr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}.{}", self.resource, self.version)
        } else {
            write!(f, "{}.{}.{}", self.resource, self.version, self.group)
        }
    }
}

/// Split an `apiVersion` into (group, version); the core group is empty
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}
