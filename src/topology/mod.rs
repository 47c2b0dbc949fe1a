//! Dependency and topology resolution
//!
//! `DependencyResolver` is the entry point. It resolves the resource type
//! through discovery, fetches the target, then gathers:
//!
//! - ancestors by walking owner references upward (`ancestors.rs`)
//! - descendants with kind-specific strategies (`descendants.rs`)
//! - the owning GitOps Application, possibly on another cluster
//!   (`applications.rs`, backed by the `management.rs` cache)

pub mod ancestors;
pub mod applications;
pub mod catalog;
pub mod descendants;
pub mod error;
pub mod management;
pub mod resolver;

pub use ancestors::AncestorResolver;
pub use applications::{ApplicationCorrelator, TrackingRef, parse_tracking_id, tracking_ref};
pub use catalog::{ResourceType, ResourceTypeCatalog};
pub use descendants::{DescendantOptions, DescendantResolver};
pub use error::Error;
pub use management::{
    HostResolver, IN_CLUSTER, ManagementTopology, SystemResolver, TopologyOptions,
};
pub use resolver::{DependencyResolver, ResolverOptions};
