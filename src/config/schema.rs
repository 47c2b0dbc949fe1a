//! Configuration schema definitions
//!
//! Every field is defaulted, so a partial (or empty) file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::topology::descendants::{DEFAULT_ALLOW_LIST, DEFAULT_MAX_DEPTH};
use crate::topology::management::{DEFAULT_CLUSTER_SECRET_SELECTOR, DEFAULT_GITOPS_NAMESPACE};
use crate::topology::{DescendantOptions, ResolverOptions, TopologyOptions};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// End-to-end deadline for one dependency query
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Management topology discovery
    #[serde(default)]
    pub topology: TopologyConfig,

    /// Generic owned-object search
    #[serde(default)]
    pub descendants: DescendantsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TopologyConfig {
    /// Namespace whose presence marks a management cluster
    #[serde(default = "default_gitops_namespace")]
    pub gitops_namespace: String,

    /// Label selector for cluster registration secrets
    #[serde(default = "default_cluster_secret_selector")]
    pub cluster_secret_selector: String,

    /// How long lookups wait for the topology build
    #[serde(default = "default_readiness_wait_secs")]
    pub readiness_wait_secs: u64,

    /// Per-cluster bound on probes during the build
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Start the build in the background at startup
    #[serde(default = "default_true")]
    pub eager_build: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DescendantsConfig {
    /// Plural resource names searched for owned objects
    #[serde(default = "default_allow_list")]
    pub allow_list: Vec<String>,

    /// 1 = direct children, 2 = grandchildren too
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

// Default value functions
fn default_request_timeout_secs() -> u64 {
    30
}

fn default_gitops_namespace() -> String {
    DEFAULT_GITOPS_NAMESPACE.to_string()
}

fn default_cluster_secret_selector() -> String {
    DEFAULT_CLUSTER_SECRET_SELECTOR.to_string()
}

fn default_readiness_wait_secs() -> u64 {
    35
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_allow_list() -> Vec<String> {
    DEFAULT_ALLOW_LIST.iter().map(|s| s.to_string()).collect()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            topology: TopologyConfig::default(),
            descendants: DescendantsConfig::default(),
        }
    }
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            gitops_namespace: default_gitops_namespace(),
            cluster_secret_selector: default_cluster_secret_selector(),
            readiness_wait_secs: default_readiness_wait_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            eager_build: default_true(),
        }
    }
}

impl Default for DescendantsConfig {
    fn default() -> Self {
        Self {
            allow_list: default_allow_list(),
            max_depth: default_max_depth(),
        }
    }
}

impl Config {
    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            descendants: DescendantOptions {
                allow_list: self.descendants.allow_list.clone(),
                max_depth: self.descendants.max_depth,
            },
        }
    }

    pub fn topology_options(&self) -> TopologyOptions {
        TopologyOptions {
            gitops_namespace: self.topology.gitops_namespace.clone(),
            cluster_secret_selector: self.topology.cluster_secret_selector.clone(),
            readiness_wait: Duration::from_secs(self.topology.readiness_wait_secs),
            probe_timeout: Duration::from_secs(self.topology.probe_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_runtime_options() {
        let config = Config::default();
        assert_eq!(config.resolver_options(), ResolverOptions::default());

        let topology = config.topology_options();
        let expected = TopologyOptions::default();
        assert_eq!(topology.gitops_namespace, expected.gitops_namespace);
        assert_eq!(topology.cluster_secret_selector, expected.cluster_secret_selector);
        assert_eq!(topology.readiness_wait, expected.readiness_wait);
        assert_eq!(topology.probe_timeout, expected.probe_timeout);
    }

    #[test]
    fn test_config_serialization() {
        let yaml = serde_yaml::to_string(&Config::default()).unwrap();
        assert!(yaml.contains("requestTimeoutSecs: 30"));
        assert!(yaml.contains("gitopsNamespace: argocd"));
        assert!(yaml.contains("maxDepth: 2"));
    }

    #[test]
    fn test_partial_deserialization() {
        let yaml = r#"
requestTimeoutSecs: 10
topology:
  gitopsNamespace: gitops
descendants:
  maxDepth: 1
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.topology.gitops_namespace, "gitops");
        assert_eq!(config.topology.readiness_wait_secs, 35);
        assert!(config.topology.eager_build);
        assert_eq!(config.descendants.max_depth, 1);
        assert_eq!(config.descendants.allow_list.len(), 5);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let result: Result<Config, _> = serde_yaml::from_str("readOnly: true\n");
        assert!(result.is_err());
    }
}
