//! Owner-reference ancestry tests

mod common;

use common::{NAMESPACE, config_map, deployment, owner, pod, replica_set};
use kubeplorer::cluster::{ClientError, MemoryCluster};
use kubeplorer::models::{ResourceKind, ResourceObject, ResourceRef};
use kubeplorer::topology::AncestorResolver;

fn names(refs: &[ResourceRef]) -> Vec<(&str, &str)> {
    refs.iter()
        .map(|r| (r.kind.as_str(), r.name.as_str()))
        .collect()
}

#[tokio::test]
async fn test_object_without_owners_has_no_ancestors() {
    let cluster = MemoryCluster::new().with_builtin_types();
    let orphan = ResourceObject::new(pod("lonely", "pod-1", &[], &[]));

    let ancestors = AncestorResolver::new(&cluster)
        .ancestors_of(&orphan, Some(NAMESPACE))
        .await;

    assert!(ancestors.is_empty());
    assert_eq!(cluster.calls("get"), 0);
}

#[tokio::test]
async fn test_owner_chain_is_root_first() {
    let rs_owner = owner("Deployment", "web", "dep-1");
    let pod_owner = owner("ReplicaSet", "web-7d9f", "rs-1");
    let cluster = MemoryCluster::new()
        .with_builtin_types()
        .with_object(ResourceKind::Deployment.gvr(), deployment("web", "dep-1"))
        .with_object(
            ResourceKind::ReplicaSet.gvr(),
            replica_set("web-7d9f", "rs-1", 2, &[rs_owner]),
        );
    let target = ResourceObject::new(pod("web-7d9f-abc", "pod-1", &[pod_owner], &[]));

    let ancestors = AncestorResolver::new(&cluster)
        .ancestors_of(&target, Some(NAMESPACE))
        .await;

    assert_eq!(
        names(&ancestors),
        vec![("Deployment", "web"), ("ReplicaSet", "web-7d9f")]
    );
    assert_eq!(ancestors[0].uid, "dep-1");
    assert_eq!(ancestors[1].namespace.as_deref(), Some(NAMESPACE));
}

#[tokio::test]
async fn test_unfetchable_owner_is_kept_as_leaf() {
    let cluster = MemoryCluster::new().with_builtin_types();
    let widget_owner = serde_json::json!({
        "apiVersion": "example.com/v1",
        "kind": "Widget",
        "name": "gadget",
        "uid": "widget-1"
    });
    let target = ResourceObject::new(config_map("settings", "cm-1", &[widget_owner]));

    let ancestors = AncestorResolver::new(&cluster)
        .ancestors_of(&target, Some(NAMESPACE))
        .await;

    assert_eq!(
        ancestors,
        vec![ResourceRef::new("Widget", "gadget", Some(NAMESPACE), "widget-1")]
    );
}

#[tokio::test]
async fn test_forbidden_grandparent_stops_the_walk() {
    let cluster = MemoryCluster::new()
        .with_builtin_types()
        .with_object(
            ResourceKind::ReplicaSet.gvr(),
            replica_set("web-7d9f", "rs-1", 2, &[owner("Deployment", "web", "dep-1")]),
        )
        .fail("deployments", ClientError::forbidden("deployments is forbidden"));
    let target = ResourceObject::new(pod(
        "web-7d9f-abc",
        "pod-1",
        &[owner("ReplicaSet", "web-7d9f", "rs-1")],
        &[],
    ));

    let ancestors = AncestorResolver::new(&cluster)
        .ancestors_of(&target, Some(NAMESPACE))
        .await;

    assert_eq!(
        names(&ancestors),
        vec![("Deployment", "web"), ("ReplicaSet", "web-7d9f")]
    );
}

#[tokio::test]
async fn test_multiple_owners_keep_reference_order() {
    let cluster = MemoryCluster::new()
        .with_builtin_types()
        .with_object(
            ResourceKind::ConfigMap.gvr(),
            config_map("first", "cm-a", &[]),
        )
        .with_object(
            ResourceKind::ConfigMap.gvr(),
            config_map("second", "cm-b", &[owner("ConfigMap", "first", "cm-a")]),
        );
    let target = ResourceObject::new(config_map(
        "shared",
        "cm-c",
        &[
            owner("ConfigMap", "second", "cm-b"),
            owner("ConfigMap", "first", "cm-a"),
        ],
    ));

    let ancestors = AncestorResolver::new(&cluster)
        .ancestors_of(&target, Some(NAMESPACE))
        .await;

    assert_eq!(
        names(&ancestors),
        vec![
            ("ConfigMap", "first"),
            ("ConfigMap", "second"),
            ("ConfigMap", "first")
        ]
    );
}

#[tokio::test]
async fn test_ownership_cycle_terminates() {
    let cluster = MemoryCluster::new()
        .with_builtin_types()
        .with_object(
            ResourceKind::ConfigMap.gvr(),
            config_map("ping", "cm-ping", &[owner("ConfigMap", "pong", "cm-pong")]),
        )
        .with_object(
            ResourceKind::ConfigMap.gvr(),
            config_map("pong", "cm-pong", &[owner("ConfigMap", "ping", "cm-ping")]),
        );
    let target = ResourceObject::new(config_map(
        "ping",
        "cm-ping",
        &[owner("ConfigMap", "pong", "cm-pong")],
    ));

    let ancestors = AncestorResolver::new(&cluster)
        .ancestors_of(&target, Some(NAMESPACE))
        .await;

    assert_eq!(names(&ancestors), vec![("ConfigMap", "pong")]);
}
