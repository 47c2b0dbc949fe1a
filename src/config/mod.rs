//! Configuration for kubeplorer
//!
//! A single YAML file layered over built-in defaults, with a few
//! environment variable overrides on top.

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{Config, DescendantsConfig, TopologyConfig};

/// Every key `get_config_value` understands, in display order
pub const KEYS: &[&str] = &[
    "requestTimeoutSecs",
    "topology.gitopsNamespace",
    "topology.clusterSecretSelector",
    "topology.readinessWaitSecs",
    "topology.probeTimeoutSecs",
    "topology.eagerBuild",
    "descendants.allowList",
    "descendants.maxDepth",
];

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &Config, key: &str) -> anyhow::Result<String> {
    match key {
        "requestTimeoutSecs" => Ok(config.request_timeout_secs.to_string()),
        "topology.gitopsNamespace" => Ok(config.topology.gitops_namespace.clone()),
        "topology.clusterSecretSelector" => Ok(config.topology.cluster_secret_selector.clone()),
        "topology.readinessWaitSecs" => Ok(config.topology.readiness_wait_secs.to_string()),
        "topology.probeTimeoutSecs" => Ok(config.topology.probe_timeout_secs.to_string()),
        "topology.eagerBuild" => Ok(config.topology.eager_build.to_string()),
        "descendants.allowList" => Ok(config.descendants.allow_list.join(",")),
        "descendants.maxDepth" => Ok(config.descendants.max_depth.to_string()),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}
