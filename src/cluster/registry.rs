//! Known cluster contexts and per-context clients
//!
//! Contexts come from a kubeconfig. A client is built the first time a context
//! is used and then reused for the rest of the process.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tokio::sync::Mutex;

#[cfg(test)]
use mockall::automock;

use super::client::ResourceClient;
use super::error::ClientError;
use super::kube_client::KubeResourceClient;

/// Namespace used when a context does not name one
pub const FALLBACK_NAMESPACE: &str = "default";

/// Registry of cluster contexts the resolver may address
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterRegistry: Send + Sync {
    /// All context names, sorted
    fn contexts(&self) -> Vec<String>;

    /// The context's configured namespace, or `"default"`
    fn default_namespace(&self, context: &str) -> Result<String, ClientError>;

    /// Client for one context
    async fn client(&self, context: &str) -> Result<Arc<dyn ResourceClient>, ClientError>;
}

/// Check whether a context's API server answers
///
/// A 403 on the node list still proves the server is reachable.
pub async fn test_connectivity(registry: &dyn ClusterRegistry, context: &str) -> bool {
    let client = match registry.client(context).await {
        Ok(client) => client,
        Err(e) => {
            tracing::debug!(context = %context, "Client creation failed: {}", e);
            return false;
        }
    };
    match client.list_nodes().await {
        Ok(_) => true,
        Err(e) if e.is_forbidden() => true,
        Err(e) => {
            tracing::debug!(context = %context, "Connectivity check failed: {}", e);
            false
        }
    }
}

/// `ClusterRegistry` backed by a kubeconfig file
pub struct KubeconfigRegistry {
    kubeconfig: Kubeconfig,
    timeout: Option<Duration>,
    clients: Mutex<HashMap<String, Arc<dyn ResourceClient>>>,
}

impl KubeconfigRegistry {
    /// Load from an explicit path, or from `KUBECONFIG` / `~/.kube/config`
    pub fn load(path: Option<&Path>) -> Result<Self, ClientError> {
        let kubeconfig = match path {
            Some(path) => Kubeconfig::read_from(path).map_err(|e| {
                ClientError::Kubeconfig(format!(
                    "failed to read kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?,
            None => Kubeconfig::read()
                .map_err(|e| ClientError::Kubeconfig(format!("failed to read kubeconfig: {}", e)))?,
        };
        Ok(Self::from_kubeconfig(kubeconfig))
    }

    pub fn from_kubeconfig(kubeconfig: Kubeconfig) -> Self {
        Self {
            kubeconfig,
            timeout: None,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Connect/read timeout applied to every client this registry builds
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The kubeconfig's `current-context`, if set
    pub fn current_context(&self) -> Option<&str> {
        self.kubeconfig.current_context.as_deref()
    }

    fn has_context(&self, context: &str) -> bool {
        self.kubeconfig.contexts.iter().any(|c| c.name == context)
    }

    async fn build_client(&self, context: &str) -> Result<Client, ClientError> {
        let options = KubeConfigOptions {
            context: Some(context.to_string()),
            ..Default::default()
        };
        let mut config = Config::from_custom_kubeconfig(self.kubeconfig.clone(), &options)
            .await
            .map_err(|e| {
                ClientError::Kubeconfig(format!("context {}: {}", context, e))
            })?;
        if let Some(timeout) = self.timeout {
            config.connect_timeout = Some(timeout);
            config.read_timeout = Some(timeout);
        }
        Client::try_from(config).map_err(ClientError::from)
    }
}

#[async_trait]
impl ClusterRegistry for KubeconfigRegistry {
    fn contexts(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .kubeconfig
            .contexts
            .iter()
            .map(|c| c.name.clone())
            .collect();
        names.sort();
        names
    }

    fn default_namespace(&self, context: &str) -> Result<String, ClientError> {
        let named = self
            .kubeconfig
            .contexts
            .iter()
            .find(|c| c.name == context)
            .ok_or_else(|| ClientError::ContextNotFound(context.to_string()))?;
        Ok(named
            .context
            .as_ref()
            .and_then(|c| c.namespace.clone())
            .filter(|ns| !ns.is_empty())
            .unwrap_or_else(|| FALLBACK_NAMESPACE.to_string()))
    }

    async fn client(&self, context: &str) -> Result<Arc<dyn ResourceClient>, ClientError> {
        if !self.has_context(context) {
            return Err(ClientError::ContextNotFound(context.to_string()));
        }

        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(context) {
            return Ok(Arc::clone(client));
        }

        let client: Arc<dyn ResourceClient> =
            Arc::new(KubeResourceClient::new(self.build_client(context).await?, context));
        clients.insert(context.to_string(), Arc::clone(&client));
        tracing::debug!(context = %context, "Created cluster client");
        Ok(client)
    }
}
