//! Owner-reference walk toward the root of an object's lineage

use std::collections::HashSet;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::catalog::ResourceTypeCatalog;
use crate::cluster::ResourceClient;
use crate::models::{Gvr, OwnerReference, ResourceObject, ResourceRef};

/// Builds the ownership ancestry of an object
pub struct AncestorResolver<'a> {
    client: &'a dyn ResourceClient,
}

impl<'a> AncestorResolver<'a> {
    pub fn new(client: &'a dyn ResourceClient) -> Self {
        Self { client }
    }

    /// Ancestors of `object`, root first
    ///
    /// Each owner reference contributes `[owner's ancestors.., owner]`, appended
    /// in reference order. An owner that cannot be fetched is kept as a leaf.
    /// An owner already on the current walk path is dropped.
    pub async fn ancestors_of(
        &self,
        object: &ResourceObject,
        namespace: Option<&str>,
    ) -> Vec<ResourceRef> {
        let mut path = HashSet::new();
        if !object.uid().is_empty() {
            path.insert(object.uid().to_string());
        }
        self.walk(object, namespace, &mut path).await
    }

    fn walk<'b>(
        &'b self,
        object: &'b ResourceObject,
        namespace: Option<&'b str>,
        path: &'b mut HashSet<String>,
    ) -> BoxFuture<'b, Vec<ResourceRef>> {
        async move {
            let mut ancestors = Vec::new();

            for owner in object.owner_references() {
                if owner.name.is_empty() || owner.kind.is_empty() {
                    continue;
                }
                if !owner.uid.is_empty() && path.contains(&owner.uid) {
                    tracing::debug!(
                        kind = %owner.kind,
                        name = %owner.name,
                        "Owner already on walk path, skipping"
                    );
                    continue;
                }

                let owner_obj = match self.fetch_owner(&owner, namespace).await {
                    Some(obj) => obj,
                    None => {
                        ancestors.push(ResourceRef::new(
                            &owner.kind,
                            &owner.name,
                            namespace,
                            &owner.uid,
                        ));
                        continue;
                    }
                };

                let key = match owner_obj.uid() {
                    "" => owner.uid.clone(),
                    uid => uid.to_string(),
                };
                let fresh = path.insert(key.clone());
                let owner_ancestors = self.walk(&owner_obj, namespace, path).await;
                if fresh {
                    path.remove(&key);
                }

                ancestors.extend(owner_ancestors);
                ancestors.push(owner_obj.to_ref(&owner.kind, namespace));
            }

            ancestors
        }
        .boxed()
    }

    async fn fetch_owner(
        &self,
        owner: &OwnerReference,
        namespace: Option<&str>,
    ) -> Option<ResourceObject> {
        let gvr = Gvr::from_api_version(
            &owner.api_version,
            &ResourceTypeCatalog::plural_for_kind(&owner.kind),
        );
        match self.client.get(&gvr, namespace, &owner.name).await {
            Ok(obj) => Some(obj),
            Err(e) => {
                tracing::warn!(
                    kind = %owner.kind,
                    name = %owner.name,
                    gvr = %gvr,
                    "Failed to fetch owner: {}",
                    e
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{ClientError, MemoryCluster};
    use crate::models::ResourceKind;
    use serde_json::json;

    fn replicaset(owner_uid: &str) -> serde_json::Value {
        json!({
            "apiVersion": "apps/v1",
            "kind": "ReplicaSet",
            "metadata": {
                "name": "web-7d9f",
                "namespace": "shop",
                "uid": "rs-1",
                "ownerReferences": [
                    {"apiVersion": "apps/v1", "kind": "Deployment", "name": "web", "uid": owner_uid}
                ]
            }
        })
    }

    fn pod() -> ResourceObject {
        ResourceObject::new(json!({
            "kind": "Pod",
            "metadata": {
                "name": "web-7d9f-x",
                "namespace": "shop",
                "uid": "pod-1",
                "ownerReferences": [
                    {"apiVersion": "apps/v1", "kind": "ReplicaSet", "name": "web-7d9f", "uid": "rs-1"},
                    {"apiVersion": "v1", "kind": "", "name": "broken", "uid": "x"}
                ]
            }
        }))
    }

    #[tokio::test]
    async fn test_missing_owner_becomes_leaf() {
        let cluster = MemoryCluster::new()
            .fail("replicasets", ClientError::forbidden("replicasets"));
        let ancestors = AncestorResolver::new(&cluster)
            .ancestors_of(&pod(), Some("shop"))
            .await;
        assert_eq!(
            ancestors,
            vec![ResourceRef::new("ReplicaSet", "web-7d9f", Some("shop"), "rs-1")]
        );
    }

    #[tokio::test]
    async fn test_cycle_is_cut() {
        // The replicaset claims to be owned by the pod being resolved
        let mut rs = replicaset("pod-1");
        rs["metadata"]["ownerReferences"][0]["kind"] = json!("Pod");
        rs["metadata"]["ownerReferences"][0]["apiVersion"] = json!("v1");
        rs["metadata"]["ownerReferences"][0]["name"] = json!("web-7d9f-x");
        let cluster = MemoryCluster::new()
            .with_object(ResourceKind::ReplicaSet.gvr(), rs)
            .with_object(ResourceKind::Pod.gvr(), pod().into_value());

        let ancestors = AncestorResolver::new(&cluster)
            .ancestors_of(&pod(), Some("shop"))
            .await;
        let uids: Vec<&str> = ancestors.iter().map(|r| r.uid.as_str()).collect();
        assert_eq!(uids, vec!["rs-1"]);
    }
}
