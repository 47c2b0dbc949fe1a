//! Error types for dependency resolution

use std::time::Duration;

use thiserror::Error;

use crate::cluster::ClientError;

/// Failure of a dependency query
///
/// Only the steps that identify the target (context, type, object) are fatal;
/// everything after the target fetch degrades instead of failing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("context {0:?} not found")]
    ContextNotFound(String),

    #[error("resource type {name:?} not found in context {context:?}")]
    ResourceTypeNotFound { context: String, name: String },

    #[error("{kind} {namespace}/{name} not found")]
    ObjectNotFound {
        kind: String,
        namespace: String,
        name: String,
    },

    /// The request deadline expired while the query still needed an answer
    #[error("deadline of {limit:?} exceeded during {stage}")]
    DeadlineExceeded { stage: &'static str, limit: Duration },

    #[error("cluster error: {0}")]
    Client(#[from] ClientError),
}

impl Error {
    pub fn type_not_found(context: impl Into<String>, name: impl Into<String>) -> Self {
        Self::ResourceTypeNotFound {
            context: context.into(),
            name: name.into(),
        }
    }

    pub fn object_not_found(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self::ObjectNotFound {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Whether the error means "nothing by that name"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ContextNotFound(_) | Self::ResourceTypeNotFound { .. } | Self::ObjectNotFound { .. }
        )
    }

    /// Lift a client error, keeping a missing context distinguishable
    pub(crate) fn from_client(err: ClientError) -> Self {
        match err {
            ClientError::ContextNotFound(context) => Self::ContextNotFound(context),
            other => Self::Client(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_family() {
        assert!(Error::ContextNotFound("prod".into()).is_not_found());
        assert!(Error::type_not_found("prod", "widgets").is_not_found());
        assert!(Error::object_not_found("Pod", "shop", "web").is_not_found());
        assert!(!Error::Client(ClientError::transport("reset")).is_not_found());
    }

    #[test]
    fn test_from_client_keeps_missing_context() {
        let err = Error::from_client(ClientError::ContextNotFound("prod".into()));
        assert!(matches!(err, Error::ContextNotFound(ref c) if c == "prod"));

        let err = Error::from_client(ClientError::forbidden("pods"));
        assert!(matches!(err, Error::Client(ClientError::Forbidden(_))));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::object_not_found("Deployment", "shop", "web").to_string(),
            "Deployment shop/web not found"
        );
        let err = Error::DeadlineExceeded {
            stage: "target fetch",
            limit: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "deadline of 30s exceeded during target fetch");
    }
}
