//! `ResourceClient` backed by a kube-rs client

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube::Api;
use kube::api::ListParams;
use kube::core::{ApiResource, DynamicObject};

use super::client::{DiscoveredResource, NodeInfo, ResourceClient, SecretInfo};
use super::error::ClientError;
use crate::models::{Gvr, ResourceObject};

/// Dynamic-API client for a single kubeconfig context
#[derive(Clone)]
pub struct KubeResourceClient {
    client: kube::Client,
    context: String,
}

impl KubeResourceClient {
    pub fn new(client: kube::Client, context: impl Into<String>) -> Self {
        Self {
            client,
            context: context.into(),
        }
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    fn dynamic_api(&self, gvr: &Gvr, namespace: Option<&str>) -> Api<DynamicObject> {
        // Only the URL path is derived from the ApiResource; kind is not needed.
        let api_resource = ApiResource {
            group: gvr.group.clone(),
            version: gvr.version.clone(),
            api_version: gvr.api_version(),
            kind: String::new(),
            plural: gvr.resource.clone(),
        };
        match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &api_resource),
            None => Api::all_with(self.client.clone(), &api_resource),
        }
    }
}

fn to_resource_object(obj: &DynamicObject) -> Result<ResourceObject, ClientError> {
    serde_json::to_value(obj)
        .map(ResourceObject::new)
        .map_err(|e| ClientError::transport(format!("failed to serialize object: {}", e)))
}

fn push_resources(
    discovered: &mut Vec<DiscoveredResource>,
    group: &str,
    version: &str,
    list: APIResourceList,
) {
    for resource in list.resources {
        // Subresources such as pods/log are not addressable types
        if resource.name.contains('/') {
            continue;
        }
        discovered.push(DiscoveredResource {
            group: group.to_string(),
            version: version.to_string(),
            plural: resource.name,
            kind: resource.kind,
            namespaced: resource.namespaced,
            verbs: resource.verbs,
        });
    }
}

#[async_trait]
impl ResourceClient for KubeResourceClient {
    async fn get(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<ResourceObject, ClientError> {
        let obj = self.dynamic_api(gvr, namespace).get(name).await?;
        to_resource_object(&obj)
    }

    async fn list(
        &self,
        gvr: &Gvr,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<ResourceObject>, ClientError> {
        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }
        let list = self.dynamic_api(gvr, namespace).list(&params).await?;
        list.items.iter().map(to_resource_object).collect()
    }

    async fn discover(&self) -> Result<Vec<DiscoveredResource>, ClientError> {
        let mut discovered = Vec::new();

        let core = self.client.list_core_api_versions().await?;
        for version in &core.versions {
            match self.client.list_core_api_resources(version).await {
                Ok(list) => push_resources(&mut discovered, "", version, list),
                Err(e) => tracing::warn!(
                    context = %self.context,
                    group_version = %version,
                    "Partial API discovery failure: {}",
                    e
                ),
            }
        }

        let groups = self.client.list_api_groups().await?;
        for group in groups.groups {
            // Preferred version first so it wins first-match lookups
            let mut versions = group.versions.clone();
            if let Some(preferred) = &group.preferred_version {
                versions.sort_by_key(|v| v.group_version != preferred.group_version);
            }
            for gv in versions {
                match self
                    .client
                    .list_api_group_resources(&gv.group_version)
                    .await
                {
                    Ok(list) => push_resources(&mut discovered, &group.name, &gv.version, list),
                    Err(e) => tracing::warn!(
                        context = %self.context,
                        group_version = %gv.group_version,
                        "Partial API discovery failure: {}",
                        e
                    ),
                }
            }
        }

        tracing::debug!(
            context = %self.context,
            count = discovered.len(),
            "Discovered resource types"
        );
        Ok(discovered)
    }

    async fn list_nodes(&self) -> Result<Vec<NodeInfo>, ClientError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let nodes = api.list(&ListParams::default()).await?;

        Ok(nodes
            .items
            .into_iter()
            .map(|node| {
                let internal_ips = node
                    .status
                    .and_then(|s| s.addresses)
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|a| a.type_ == "InternalIP" && !a.address.is_empty())
                    .map(|a| a.address)
                    .collect();
                NodeInfo {
                    name: node.metadata.name.unwrap_or_default(),
                    labels: node.metadata.labels.unwrap_or_default(),
                    internal_ips,
                }
            })
            .collect())
    }

    async fn list_secrets(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<SecretInfo>, ClientError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secrets = api
            .list(&ListParams::default().labels(label_selector))
            .await?;

        Ok(secrets
            .items
            .into_iter()
            .map(|secret| SecretInfo {
                name: secret.metadata.name.unwrap_or_default(),
                data: secret
                    .data
                    .unwrap_or_default()
                    .into_iter()
                    .map(|(key, value)| (key, value.0))
                    .collect(),
            })
            .collect())
    }
}
