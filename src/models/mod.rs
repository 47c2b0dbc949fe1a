//! Model layer
//!
//! Structure:
//! - `gvr.rs` - Group-Version-Resource addressing
//! - `resource_kind.rs` - Built-in kinds with dedicated resolution strategies
//! - `object.rs` - Defaulting accessors over untyped live objects
//! - `refs.rs` - Identity pointers and the dependency query result

pub mod gvr;
pub mod object;
pub mod refs;
pub mod resource_kind;

pub use gvr::{Gvr, split_api_version};
pub use object::{OwnerReference, ResourceObject};
pub use refs::{ApplicationRef, DependencyChain, ResourceRef};
pub use resource_kind::ResourceKind;
