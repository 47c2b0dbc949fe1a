//! The dependency query: type, target, ancestors, descendants, applications

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::ancestors::AncestorResolver;
use super::applications::ApplicationCorrelator;
use super::catalog::ResourceTypeCatalog;
use super::descendants::{DescendantOptions, DescendantResolver};
use super::error::Error;
use super::management::ManagementTopology;
use crate::cluster::ClusterRegistry;
use crate::models::DependencyChain;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// End-to-end bound for one query
    pub request_timeout: Duration,
    pub descendants: DescendantOptions,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            descendants: DescendantOptions::default(),
        }
    }
}

/// Answers "where does this object sit in the deployment topology?"
pub struct DependencyResolver {
    registry: Arc<dyn ClusterRegistry>,
    topology: Arc<ManagementTopology>,
    correlator: ApplicationCorrelator,
    options: ResolverOptions,
}

impl DependencyResolver {
    pub fn new(
        registry: Arc<dyn ClusterRegistry>,
        topology: Arc<ManagementTopology>,
        options: ResolverOptions,
    ) -> Self {
        let correlator = ApplicationCorrelator::new(Arc::clone(&registry), Arc::clone(&topology));
        Self {
            registry,
            topology,
            correlator,
            options,
        }
    }

    pub fn topology(&self) -> &Arc<ManagementTopology> {
        &self.topology
    }

    /// Full dependency chain of one object
    ///
    /// `resource` is a plural resource name as listed by discovery. An empty
    /// `namespace` means the context's default namespace; it is ignored for
    /// cluster-scoped types. Only a missing context, type or object, a failed
    /// target fetch, or the deadline expiring before the target is fetched
    /// fail the query; later stages degrade to empty.
    pub async fn get_resource_dependencies(
        &self,
        context: &str,
        resource: &str,
        namespace: &str,
        name: &str,
    ) -> Result<DependencyChain, Error> {
        let started = Instant::now();
        let limit = self.options.request_timeout;
        let deadline = tokio::time::Instant::now() + limit;

        let client = within(deadline, limit, "client setup", self.registry.client(context))
            .await?
            .map_err(Error::from_client)?;

        let resource_type = within(
            deadline,
            limit,
            "type resolution",
            ResourceTypeCatalog::resolve_type(client.as_ref(), resource),
        )
        .await?
        .map_err(Error::from_client)?
        .ok_or_else(|| Error::type_not_found(context, resource))?;
        let type_resolved = started.elapsed();

        let namespace = if !resource_type.namespaced {
            None
        } else if namespace.is_empty() {
            Some(self.registry.default_namespace(context).map_err(Error::from_client)?)
        } else {
            Some(namespace.to_string())
        };
        let scope = namespace.as_deref();

        let object = within(
            deadline,
            limit,
            "target fetch",
            client.get(&resource_type.gvr, scope, name),
        )
        .await?
        .map_err(|e| {
            if e.is_not_found() {
                Error::object_not_found(&resource_type.kind, scope.unwrap_or_default(), name)
            } else {
                Error::from_client(e)
            }
        })?;
        let target_fetched = started.elapsed();

        let mut chain = DependencyChain::new(object.to_ref(&resource_type.kind, scope));
        let uid = chain.current.uid.clone();

        let ancestors = AncestorResolver::new(client.as_ref());
        let descendants =
            DescendantResolver::with_options(client.as_ref(), self.options.descendants.clone());

        let (found_ancestors, found_descendants, found_applications) = tokio::join!(
            best_effort(deadline, "ancestors", ancestors.ancestors_of(&object, scope)),
            best_effort(
                deadline,
                "descendants",
                descendants.descendants_of(&object, scope, &uid)
            ),
            best_effort(
                deadline,
                "applications",
                self.correlator.find_applications(&object, context)
            ),
        );

        chain.ancestors = found_ancestors;
        chain.descendants = found_descendants;
        chain.applications = found_applications;
        chain.applications.sort();
        chain.applications.dedup();

        tracing::debug!(
            context = %context,
            kind = %resource_type.kind,
            namespace = ?scope,
            name = %name,
            ancestors = chain.ancestors.len(),
            descendants = chain.descendants.len(),
            applications = chain.applications.len(),
            type_resolution = ?type_resolved,
            target_fetch = ?target_fetched.saturating_sub(type_resolved),
            total = ?started.elapsed(),
            "Dependency query complete"
        );
        Ok(chain)
    }
}

/// Run a stage that must finish before the deadline
async fn within<F: Future>(
    deadline: tokio::time::Instant,
    limit: Duration,
    stage: &'static str,
    stage_future: F,
) -> Result<F::Output, Error> {
    tokio::time::timeout_at(deadline, stage_future)
        .await
        .map_err(|_| Error::DeadlineExceeded { stage, limit })
}

/// Run a stage whose result is dropped if the deadline passes first
async fn best_effort<T: Default, F: Future<Output = T>>(
    deadline: tokio::time::Instant,
    stage: &'static str,
    stage_future: F,
) -> T {
    let started = Instant::now();
    match tokio::time::timeout_at(deadline, stage_future).await {
        Ok(found) => {
            tracing::debug!(stage = stage, elapsed = ?started.elapsed(), "Stage complete");
            found
        }
        Err(_) => {
            tracing::warn!(stage = stage, "Deadline reached, stage left empty");
            T::default()
        }
    }
}
