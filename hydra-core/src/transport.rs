//! Transport trait definitions.
//!
//! The `HttpTransport` trait abstracts the single GET request the discovery
//! client needs, so the caching and failover logic can run against a real
//! HTTP client or an in-memory double.

use std::future::Future;
use std::sync::Arc;

use crate::error::TransportError;

/// HTTP status returned by a registry on success.
pub const STATUS_OK: u16 = 200;

/// HTTP status returned by a registry for an unknown application.
pub const STATUS_BAD_REQUEST: u16 = 400;

/// Status code and body of a completed GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body decoded as text.
    pub body: String,
}

impl HttpResponse {
    /// Create a response from a status code and body.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Create a `200 OK` response.
    #[must_use]
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(STATUS_OK, body)
    }

    /// Check for a `200 OK` status.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Check for a `400 Bad Request` status.
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        self.status == STATUS_BAD_REQUEST
    }
}

/// Performs a single asynchronous GET request.
///
/// A transport error means the server could not be reached at all. Any
/// answer from the server, whatever its status, is an `Ok` response.
///
/// # Example
///
/// ```rust
/// use hydra_core::{HttpResponse, HttpTransport, TransportError};
///
/// struct Fixed;
///
/// impl HttpTransport for Fixed {
///     async fn get(&self, _url: &str) -> Result<HttpResponse, TransportError> {
///         Ok(HttpResponse::ok(r#"["http://10.0.0.1:8080"]"#))
///     }
/// }
/// ```
pub trait HttpTransport: Send + Sync + 'static {
    /// Issue a GET request against `url`.
    fn get(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

impl<T: HttpTransport> HttpTransport for Arc<T> {
    fn get(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        (**self).get(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_helpers() {
        assert!(HttpResponse::ok("[]").is_ok());
        assert!(HttpResponse::new(400, "nope").is_bad_request());
        assert!(!HttpResponse::new(503, "").is_ok());
    }
}
