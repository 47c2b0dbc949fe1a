//! Correlation of live objects with their owning GitOps Application

use std::sync::Arc;

use super::management::ManagementTopology;
use crate::cluster::ClusterRegistry;
use crate::models::{ApplicationRef, ResourceKind, ResourceObject};

pub const TRACKING_ID_ANNOTATION: &str = "argocd.argoproj.io/tracking-id";
pub const INSTANCE_LABEL: &str = "argocd.argoproj.io/instance";

/// Namespace parent Applications live in when tracked through an
/// Application/ApplicationSet child
const PARENT_APP_NAMESPACE: &str = "argocd";

const APP_MARKERS: &[&str] = &["argoproj.io/Application:", "argoproj.io/ApplicationSet:"];

/// Application identity parsed from tracking metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingRef {
    pub namespace: String,
    pub name: String,
}

/// Parse a tracking id
///
/// Two shapes are understood:
/// - `parentApp:argoproj.io/Application:ns/child` (and `ApplicationSet`),
///   naming `parentApp` in the `argocd` namespace
/// - `namespace_appName:group/version`, split at the first underscore
pub fn parse_tracking_id(tracking_id: &str) -> Option<TrackingRef> {
    let (instance, _) = tracking_id.split_once(':')?;
    if APP_MARKERS.iter().any(|marker| tracking_id.contains(marker)) {
        return Some(TrackingRef {
            namespace: PARENT_APP_NAMESPACE.to_string(),
            name: instance.to_string(),
        });
    }
    parse_instance(instance)
}

/// Parse a `namespace_appName` instance value
///
/// Names containing underscores are ambiguous; the first underscore splits.
pub fn parse_instance(instance: &str) -> Option<TrackingRef> {
    let (namespace, name) = instance.split_once('_')?;
    Some(TrackingRef {
        namespace: namespace.to_string(),
        name: name.to_string(),
    })
}

/// Tracking identity of an object: the tracking-id annotation, falling back
/// to the instance label
pub fn tracking_ref(object: &ResourceObject) -> Option<TrackingRef> {
    if let Some(tracking_id) = object.annotation(TRACKING_ID_ANNOTATION).filter(|v| !v.is_empty()) {
        let parsed = parse_tracking_id(tracking_id);
        if parsed.is_none() {
            tracing::debug!(tracking_id = %tracking_id, "Unparseable tracking id");
        }
        return parsed;
    }
    object
        .label(INSTANCE_LABEL)
        .filter(|v| !v.is_empty())
        .and_then(parse_instance)
}

/// Finds the Application that manages an object, across clusters
pub struct ApplicationCorrelator {
    registry: Arc<dyn ClusterRegistry>,
    topology: Arc<ManagementTopology>,
}

impl ApplicationCorrelator {
    pub fn new(registry: Arc<dyn ClusterRegistry>, topology: Arc<ManagementTopology>) -> Self {
        Self { registry, topology }
    }

    /// Applications managing `object` on `workload` (zero or one)
    ///
    /// Never fails: every lookup error yields an empty result.
    pub async fn find_applications(
        &self,
        object: &ResourceObject,
        workload: &str,
    ) -> Vec<ApplicationRef> {
        let Some(tracking) = tracking_ref(object) else {
            return Vec::new();
        };

        let Some(management) = self.topology.find_management_cluster(workload).await else {
            tracing::debug!(workload = %workload, "No management cluster for workload");
            return Vec::new();
        };

        let client = match self.registry.client(&management).await {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(management = %management, "Management cluster unavailable: {}", e);
                return Vec::new();
            }
        };

        let gvr = ResourceKind::Application.gvr();
        match client
            .get(&gvr, Some(&tracking.namespace), &tracking.name)
            .await
        {
            Ok(_) => {
                tracing::debug!(
                    management = %management,
                    namespace = %tracking.namespace,
                    name = %tracking.name,
                    "Found owning Application"
                );
                vec![ApplicationRef {
                    name: tracking.name,
                    namespace: tracking.namespace,
                    cluster: management,
                }]
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(
                    management = %management,
                    namespace = %tracking.namespace,
                    name = %tracking.name,
                    "Tracked Application does not exist"
                );
                Vec::new()
            }
            Err(e) => {
                tracing::warn!(
                    management = %management,
                    name = %tracking.name,
                    "Application lookup failed: {}",
                    e
                );
                Vec::new()
            }
        }
    }
}
