//! Descendant discovery
//!
//! Services and Deployments have dedicated traversals. Any other kind falls
//! back to an owner-reference search over a small allow-list of kinds, bounded
//! in depth.

use std::collections::{HashMap, HashSet};

use super::catalog::{ResourceType, ResourceTypeCatalog};
use crate::cluster::ResourceClient;
use crate::models::{ResourceKind, ResourceObject, ResourceRef};

/// Label EndpointSlices carry to name their Service
pub const SERVICE_NAME_LABEL: &str = "kubernetes.io/service-name";

/// Kinds searched by the generic path
pub const DEFAULT_ALLOW_LIST: &[&str] = &["pods", "replicasets", "services", "configmaps", "secrets"];

pub const DEFAULT_MAX_DEPTH: usize = 2;

/// Bounds for the generic owner-reference search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescendantOptions {
    /// Plural resource names listed when searching for owned objects
    pub allow_list: Vec<String>,
    /// 1 = direct children only, 2 = children and grandchildren
    pub max_depth: usize,
}

impl Default for DescendantOptions {
    fn default() -> Self {
        Self {
            allow_list: DEFAULT_ALLOW_LIST.iter().map(|s| s.to_string()).collect(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Finds everything transitively owned by an object
pub struct DescendantResolver<'a> {
    client: &'a dyn ResourceClient,
    options: DescendantOptions,
}

impl<'a> DescendantResolver<'a> {
    pub fn new(client: &'a dyn ResourceClient) -> Self {
        Self::with_options(client, DescendantOptions::default())
    }

    pub fn with_options(client: &'a dyn ResourceClient, options: DescendantOptions) -> Self {
        Self { client, options }
    }

    /// Descendants of `object`, deduplicated by UID and never containing `uid`
    ///
    /// Listing failures only shrink the result.
    pub async fn descendants_of(
        &self,
        object: &ResourceObject,
        namespace: Option<&str>,
        uid: &str,
    ) -> Vec<ResourceRef> {
        let namespace = namespace.or(object.namespace());
        let found = match ResourceKind::parse_optional(object.kind()) {
            Some(ResourceKind::Service) => {
                self.find_service_dependencies(object, namespace).await
            }
            Some(ResourceKind::Deployment) => {
                self.find_deployment_dependencies(namespace, uid).await
            }
            _ => self.find_owned(namespace, uid).await,
        };
        dedup_excluding(found, uid)
    }

    /// Endpoints of the same name, EndpointSlices labelled for the Service,
    /// and Pods matching its selector
    pub async fn find_service_dependencies(
        &self,
        service: &ResourceObject,
        namespace: Option<&str>,
    ) -> Vec<ResourceRef> {
        let name = service.name();
        let mut found = Vec::new();

        let endpoints = ResourceKind::Endpoints;
        match self.client.get(&endpoints.gvr(), namespace, name).await {
            Ok(obj) => found.push(obj.to_ref(endpoints.as_str(), namespace)),
            Err(e) if e.is_not_found() => {
                tracing::debug!(service = %name, "Service has no Endpoints object");
            }
            Err(e) => tracing::warn!(service = %name, "Failed to get Endpoints: {}", e),
        }

        let slices_selector = format!("{}={}", SERVICE_NAME_LABEL, name);
        found.extend(
            self.list_refs(ResourceKind::EndpointSlice, namespace, Some(&slices_selector))
                .await,
        );

        match service_selector(service) {
            Some(selector) => {
                found.extend(self.list_refs(ResourceKind::Pod, namespace, Some(&selector)).await);
            }
            None => tracing::debug!(service = %name, "Service has no usable selector"),
        }

        tracing::debug!(service = %name, count = found.len(), "Service dependencies found");
        found
    }

    /// The active ReplicaSet of a Deployment and the Pods it owns
    pub async fn find_deployment_dependencies(
        &self,
        namespace: Option<&str>,
        deployment_uid: &str,
    ) -> Vec<ResourceRef> {
        let replicasets = match self
            .client
            .list(&ResourceKind::ReplicaSet.gvr(), namespace, None)
            .await
        {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(uid = %deployment_uid, "Failed to list ReplicaSets: {}", e);
                return Vec::new();
            }
        };

        let Some(active) = active_replica_set(&replicasets, deployment_uid) else {
            tracing::debug!(uid = %deployment_uid, "Deployment has no scaled-up ReplicaSet");
            return Vec::new();
        };

        let active_ref = active.to_ref(ResourceKind::ReplicaSet.as_str(), namespace);
        let mut found = self.pods_owned_by(namespace, &active_ref.uid).await;
        found.insert(0, active_ref);
        found
    }

    /// Generic search: objects of allow-listed kinds owned by `uid`, then
    /// their children, down to the configured depth
    pub async fn find_owned(&self, namespace: Option<&str>, uid: &str) -> Vec<ResourceRef> {
        let index = self.index_owned(namespace).await;

        let mut found = Vec::new();
        let mut visited = HashSet::new();
        self.collect_owned(&index, namespace, uid, &mut visited, &mut found)
            .await;
        found
    }

    async fn collect_owned(
        &self,
        index: &OwnerIndex,
        namespace: Option<&str>,
        owner_uid: &str,
        visited: &mut HashSet<String>,
        found: &mut Vec<ResourceRef>,
    ) {
        let mut level = vec![owner_uid.to_string()];
        let mut depth = 1;
        while depth <= self.options.max_depth && !level.is_empty() {
            let mut next = Vec::new();
            for uid in level {
                if !visited.insert(uid.clone()) {
                    continue;
                }
                for child in index.children(&uid) {
                    found.push(child.clone());
                    if depth == self.options.max_depth {
                        continue;
                    }
                    if child.kind == ResourceKind::ReplicaSet.as_str() {
                        let pods = match index.pods_owned_by(&child.uid) {
                            Some(pods) => pods,
                            None => self.pods_owned_by(namespace, &child.uid).await,
                        };
                        visited.insert(child.uid.clone());
                        found.extend(pods);
                    } else {
                        next.push(child.uid.clone());
                    }
                }
            }
            level = next;
            depth += 1;
        }
    }

    /// List every allow-listed kind once and index the items by owner UID
    async fn index_owned(&self, namespace: Option<&str>) -> OwnerIndex {
        let types = match ResourceTypeCatalog::find_by_plural(self.client, &self.options.allow_list)
            .await
        {
            Ok(types) => types,
            Err(e) => {
                tracing::warn!("Discovery failed, using built-in types: {}", e);
                self.options
                    .allow_list
                    .iter()
                    .filter_map(|plural| ResourceKind::from_plural(plural))
                    .map(|kind| ResourceType {
                        kind: kind.as_str().to_string(),
                        namespaced: kind.is_namespaced(),
                        gvr: kind.gvr(),
                    })
                    .collect()
            }
        };

        let mut index = OwnerIndex::default();
        for resource_type in &types {
            let scope = if resource_type.namespaced { namespace } else { None };
            let items = match self.client.list(&resource_type.gvr, scope, None).await {
                Ok(items) => items,
                Err(e) => {
                    tracing::warn!(resource = %resource_type.gvr, "Failed to list: {}", e);
                    continue;
                }
            };
            tracing::debug!(resource = %resource_type.gvr, count = items.len(), "Listed for owner search");
            if resource_type.kind == ResourceKind::Pod.as_str() {
                index.has_pods = true;
            }
            for item in &items {
                let child = item.to_ref(&resource_type.kind, scope);
                for owner in item.owner_references() {
                    if !owner.uid.is_empty() {
                        index.add(owner.uid, child.clone());
                    }
                }
            }
        }
        index
    }

    async fn pods_owned_by(&self, namespace: Option<&str>, owner_uid: &str) -> Vec<ResourceRef> {
        match self
            .client
            .list(&ResourceKind::Pod.gvr(), namespace, None)
            .await
        {
            Ok(pods) => pods
                .iter()
                .filter(|pod| pod.is_owned_by(owner_uid))
                .map(|pod| pod.to_ref(ResourceKind::Pod.as_str(), namespace))
                .collect(),
            Err(e) => {
                tracing::warn!(owner = %owner_uid, "Failed to list Pods: {}", e);
                Vec::new()
            }
        }
    }

    async fn list_refs(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        selector: Option<&str>,
    ) -> Vec<ResourceRef> {
        match self.client.list(&kind.gvr(), namespace, selector).await {
            Ok(items) => items
                .iter()
                .map(|item| item.to_ref(kind.as_str(), namespace))
                .collect(),
            Err(e) => {
                tracing::warn!(kind = %kind, selector = ?selector, "Failed to list: {}", e);
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Default)]
struct OwnerIndex {
    children: HashMap<String, Vec<ResourceRef>>,
    has_pods: bool,
}

impl OwnerIndex {
    fn add(&mut self, owner_uid: String, child: ResourceRef) {
        self.children.entry(owner_uid).or_default().push(child);
    }

    fn children(&self, owner_uid: &str) -> &[ResourceRef] {
        self.children
            .get(owner_uid)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Pods owned by `owner_uid`, or None when Pods were not indexed
    fn pods_owned_by(&self, owner_uid: &str) -> Option<Vec<ResourceRef>> {
        self.has_pods.then(|| {
            self.children(owner_uid)
                .iter()
                .filter(|child| child.kind == ResourceKind::Pod.as_str())
                .cloned()
                .collect()
        })
    }
}

/// The ReplicaSet owned by `deployment_uid` with the highest positive
/// `spec.replicas`; on a tie the later one wins
pub fn active_replica_set<'o>(
    replicasets: &'o [ResourceObject],
    deployment_uid: &str,
) -> Option<&'o ResourceObject> {
    let mut best: Option<(&ResourceObject, i64)> = None;
    for rs in replicasets.iter().filter(|rs| rs.is_owned_by(deployment_uid)) {
        let replicas = rs.get_i64(&["spec", "replicas"]);
        let max = best.map(|(_, max)| max).unwrap_or(0);
        if replicas > 0 && replicas >= max {
            best = Some((rs, replicas));
        }
    }
    best.map(|(rs, _)| rs)
}

/// A Service's `spec.selector` as an equality label selector
///
/// Non-string values are ignored. None when nothing usable remains.
pub fn service_selector(service: &ResourceObject) -> Option<String> {
    let selector = service.get_map(&["spec", "selector"])?;
    let mut terms: Vec<String> = selector
        .iter()
        .filter_map(|(key, value)| value.as_str().map(|v| format!("{}={}", key, v)))
        .collect();
    terms.sort();
    (!terms.is_empty()).then(|| terms.join(","))
}

/// Drop repeated UIDs (first occurrence wins) and the excluded UID
pub fn dedup_excluding(refs: Vec<ResourceRef>, exclude_uid: &str) -> Vec<ResourceRef> {
    let mut seen = HashSet::new();
    refs.into_iter()
        .filter(|r| r.uid != exclude_uid)
        .filter(|r| r.uid.is_empty() || seen.insert(r.uid.clone()))
        .collect()
}
