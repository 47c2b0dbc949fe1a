//! kubeplorer
//!
//! Resolves where a Kubernetes object sits in its deployment topology:
//! the owner chain above it, the objects it owns or routes to, and the GitOps
//! Application that manages it, which may live on a different cluster.
//!
//! The entry point is [`topology::DependencyResolver`].

pub mod cluster;
pub mod config;
pub mod models;
pub mod topology;

pub use cluster::{ClientError, ClusterRegistry, ResourceClient};
pub use models::{ApplicationRef, DependencyChain, ResourceRef};
pub use topology::{DependencyResolver, Error, ManagementTopology, ResolverOptions};
