//! Resource type resolution through API discovery

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cluster::{ClientError, DiscoveredResource, ResourceClient};
use crate::models::Gvr;

/// Group whose pods/nodes entries shadow the core ones
const METRICS_GROUP: &str = "metrics.k8s.io";

/// Irregular kind plurals; everything else is `lower(kind) + "s"`
const PLURAL_OVERRIDES: &[(&str, &str)] = &[
    ("networkpolicy", "networkpolicies"),
    ("horizontalpodautoscaler", "horizontalpodautoscalers"),
    ("poddisruptionbudget", "poddisruptionbudgets"),
];

/// A listable resource type as reported by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceType {
    pub kind: String,
    pub namespaced: bool,
    pub gvr: Gvr,
}

impl From<&DiscoveredResource> for ResourceType {
    fn from(resource: &DiscoveredResource) -> Self {
        Self {
            kind: resource.kind.clone(),
            namespaced: resource.namespaced,
            gvr: resource.gvr(),
        }
    }
}

/// Resolves user-facing resource names to addressable types
pub struct ResourceTypeCatalog;

impl ResourceTypeCatalog {
    /// Resolve a plural resource name ("deployments", "Pods") to its type
    ///
    /// Returns `Ok(None)` when no listable type has that plural. The first
    /// match in discovery order wins.
    pub async fn resolve_type(
        client: &dyn ResourceClient,
        name: &str,
    ) -> Result<Option<ResourceType>, ClientError> {
        let discovered = client.discover().await?;
        Ok(listable(&discovered)
            .find(|r| r.plural.eq_ignore_ascii_case(name))
            .map(ResourceType::from))
    }

    /// All listable types keyed by group-version ("v1", "apps/v1", ...)
    pub async fn list_types(
        client: &dyn ResourceClient,
    ) -> Result<BTreeMap<String, Vec<ResourceType>>, ClientError> {
        let discovered = client.discover().await?;
        let mut grouped: BTreeMap<String, Vec<ResourceType>> = BTreeMap::new();
        for resource in listable(&discovered) {
            grouped
                .entry(resource.group_version())
                .or_default()
                .push(ResourceType::from(resource));
        }
        Ok(grouped)
    }

    /// Listable types whose plural is in `plurals`, one per plural
    pub async fn find_by_plural(
        client: &dyn ResourceClient,
        plurals: &[String],
    ) -> Result<Vec<ResourceType>, ClientError> {
        let discovered = client.discover().await?;
        let mut found: Vec<ResourceType> = Vec::new();
        for resource in listable(&discovered) {
            if plurals.iter().any(|p| p == &resource.plural)
                && !found.iter().any(|t| t.gvr.resource == resource.plural)
            {
                found.push(ResourceType::from(resource));
            }
        }
        Ok(found)
    }

    /// Plural resource name for a kind, used to address owner references
    pub fn plural_for_kind(kind: &str) -> String {
        let lower = kind.to_lowercase();
        PLURAL_OVERRIDES
            .iter()
            .find(|(singular, _)| *singular == lower)
            .map(|(_, plural)| plural.to_string())
            .unwrap_or_else(|| format!("{}s", lower))
    }
}

fn listable(discovered: &[DiscoveredResource]) -> impl Iterator<Item = &DiscoveredResource> {
    discovered
        .iter()
        .filter(|r| r.group != METRICS_GROUP && r.supports("list") && !r.plural.contains('/'))
}
