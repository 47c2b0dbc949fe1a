//! CLI command handlers
//!
//! Commands print to stdout; diagnostics go through `tracing`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;

use kubeplorer::cluster::{ClusterRegistry, KubeconfigRegistry, test_connectivity};
use kubeplorer::config::Config;
use kubeplorer::topology::{DependencyResolver, ManagementTopology, ResourceTypeCatalog};

/// Everything a command needs, wired from the kubeconfig and config file
pub struct Session {
    registry: Arc<dyn ClusterRegistry>,
    resolver: DependencyResolver,
}

impl Session {
    pub fn new(kubeconfig: Option<&Path>, config: &Config) -> Result<Self> {
        let registry: Arc<dyn ClusterRegistry> = Arc::new(
            KubeconfigRegistry::load(kubeconfig)
                .context("Failed to load kubeconfig")?
                .with_timeout(config.resolver_options().request_timeout),
        );
        let topology = ManagementTopology::new(Arc::clone(&registry), config.topology_options());
        if config.topology.eager_build {
            tracing::debug!("Starting management topology build");
            topology.start();
        }
        let resolver =
            DependencyResolver::new(Arc::clone(&registry), topology, config.resolver_options());
        Ok(Self { registry, resolver })
    }
}

/// `kubeplorer contexts`
pub async fn contexts(session: &Session) -> Result<()> {
    let names = session.registry.contexts();
    let reachable = join_all(
        names
            .iter()
            .map(|name| test_connectivity(session.registry.as_ref(), name)),
    )
    .await;

    println!("{:<40} {:<24} REACHABLE", "CONTEXT", "NAMESPACE");
    for (name, reachable) in names.iter().zip(reachable) {
        let namespace = session
            .registry
            .default_namespace(name)
            .unwrap_or_default();
        println!("{:<40} {:<24} {}", name, namespace, reachable);
    }
    Ok(())
}

/// `kubeplorer api-resources <context>`
pub async fn api_resources(session: &Session, context: &str) -> Result<()> {
    let client = session
        .registry
        .client(context)
        .await
        .with_context(|| format!("Failed to connect to context {}", context))?;
    let types = ResourceTypeCatalog::list_types(client.as_ref())
        .await
        .context("API discovery failed")?;

    println!("{:<40} {:<32} {:<32} NAMESPACED", "NAME", "APIVERSION", "KIND");
    for (group_version, resources) in &types {
        for resource in resources {
            println!(
                "{:<40} {:<32} {:<32} {}",
                resource.gvr.resource, group_version, resource.kind, resource.namespaced
            );
        }
    }
    Ok(())
}

/// `kubeplorer deps <context> <resource> <name> [-n namespace]`
pub async fn deps(
    session: &Session,
    context: &str,
    resource: &str,
    name: &str,
    namespace: Option<&str>,
) -> Result<()> {
    let chain = session
        .resolver
        .get_resource_dependencies(context, resource, namespace.unwrap_or_default(), name)
        .await
        .with_context(|| format!("Failed to resolve dependencies of {} {}", resource, name))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&chain).context("Failed to serialize dependency chain")?
    );
    Ok(())
}

/// `kubeplorer topology`
pub async fn topology(session: &Session) -> Result<()> {
    let snapshot = session
        .resolver
        .topology()
        .snapshot()
        .await
        .context("Management topology was not ready in time")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize topology")?
    );
    Ok(())
}
