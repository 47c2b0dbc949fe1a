//! Error type for cluster client operations

use thiserror::Error;

/// Failure of a single call against a cluster
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The kubeconfig has no context with this name
    #[error("context {0:?} not found")]
    ContextNotFound(String),

    /// The API server answered 404
    #[error("not found: {0}")]
    NotFound(String),

    /// The API server answered 403
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Any other API status
    #[error("api error {code}: {message}")]
    Api { code: u16, message: String },

    /// Connection, TLS or protocol failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Kubeconfig could not be read or turned into a client config
    #[error("kubeconfig error: {0}")]
    Kubeconfig(String),

    /// The call did not finish before its deadline
    #[error("timed out: {0}")]
    Timeout(String),
}

impl ClientError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Forbidden means the caller is authenticated but lacks rights
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }
}

impl From<kube::Error> for ClientError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(resp) => match resp.code {
                404 => Self::NotFound(resp.message),
                403 => Self::Forbidden(resp.message),
                code => Self::Api {
                    code,
                    message: resp.message,
                },
            },
            other if is_timeout(&other) => Self::Timeout(other.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Whether `err` or anything in its source chain is an I/O timeout
///
/// Client connect/read timeouts surface as `io::ErrorKind::TimedOut`.
fn is_timeout(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::TimedOut)
        {
            return true;
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("service error")]
    struct Wrapped(#[source] std::io::Error);

    #[test]
    fn test_timeout_found_in_source_chain() {
        let timed_out = Wrapped(std::io::Error::new(std::io::ErrorKind::TimedOut, "read"));
        assert!(is_timeout(&timed_out));

        let refused = Wrapped(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "timed out elapsed",
        ));
        assert!(!is_timeout(&refused));
    }

    #[test]
    fn test_classification() {
        assert!(ClientError::not_found("pods \"x\"").is_not_found());
        assert!(!ClientError::not_found("x").is_forbidden());
        assert!(ClientError::forbidden("namespaces \"argocd\"").is_forbidden());
        assert!(
            !ClientError::Api {
                code: 500,
                message: "boom".into()
            }
            .is_not_found()
        );
    }

    #[test]
    fn test_display() {
        let err = ClientError::ContextNotFound("prod".into());
        assert_eq!(err.to_string(), "context \"prod\" not found");
        let err = ClientError::Api {
            code: 500,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "api error 500: boom");
    }
}
