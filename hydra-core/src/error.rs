//! Error types for the hydra discovery client.

/// Main error type surfaced to callers of the discovery client.
///
/// Connectivity problems never show up here: they are absorbed by the
/// failover/retry machinery and only ever add latency.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HydraError {
    /// `resolve` was called before the client received a server list.
    #[error("hydra client not initialized: call configure() with a server list first")]
    NotInitialized,

    /// The configuration call was rejected.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The registry answered that it does not know the application.
    #[error("app not found: {app}: {body}")]
    AppNotFound {
        /// Application identifier that was requested.
        app: String,
        /// Raw response body returned by the registry.
        body: String,
    },
}

impl HydraError {
    /// Create an app-not-found error from the registry's response body.
    #[must_use]
    pub fn app_not_found(app: impl Into<String>, body: impl Into<String>) -> Self {
        Self::AppNotFound {
            app: app.into(),
            body: body.into(),
        }
    }

    /// Check if this error means the application is unknown to the registry.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::AppNotFound { .. })
    }
}

/// Errors raised by `configure`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No registry server was supplied.
    #[error("empty server list")]
    EmptyServerList,

    /// The first configuration must happen inside a Tokio runtime, since it
    /// starts the registry refresh task.
    #[error("configure must be called from within a tokio runtime")]
    NoRuntime,
}

/// Errors produced by an [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Failed to connect to the remote endpoint
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request did not complete in time
    #[error("request timed out")]
    Timeout,

    /// Request could not be sent or its response could not be read
    #[error("request error: {0}")]
    Request(String),

    /// The HTTP client could not be built
    #[error("client error: {0}")]
    Client(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HydraError::app_not_found("billing", "unknown app");
        assert_eq!(err.to_string(), "app not found: billing: unknown app");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_config_error_converts() {
        let err: HydraError = ConfigError::EmptyServerList.into();
        assert_eq!(err.to_string(), "config error: empty server list");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_transport_error_display() {
        assert_eq!(TransportError::Timeout.to_string(), "request timed out");
        assert_eq!(
            TransportError::ConnectionFailed("refused".into()).to_string(),
            "connection failed: refused"
        );
    }
}
