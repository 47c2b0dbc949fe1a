//! Cluster access layer
//!
//! - `client.rs` - `ResourceClient` capability the resolver consumes
//! - `kube_client.rs` - kube-rs implementation over the dynamic API
//! - `registry.rs` - kubeconfig contexts and cached per-context clients
//! - `memory.rs` - in-memory clusters and registry
//! - `error.rs` - `ClientError`

pub mod client;
pub mod error;
pub mod kube_client;
pub mod memory;
pub mod registry;

pub use client::{DiscoveredResource, NodeInfo, ResourceClient, SecretInfo};
pub use error::ClientError;
pub use kube_client::KubeResourceClient;
pub use memory::{MemoryCluster, MemoryRegistry};
pub use registry::{ClusterRegistry, FALLBACK_NAMESPACE, KubeconfigRegistry, test_connectivity};
