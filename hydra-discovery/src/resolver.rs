//! Resolver trait.

use std::future::Future;

use hydra_core::HydraError;

/// Trait for resolving an application id to its endpoints.
///
/// Code that only needs name resolution can depend on this trait instead
/// of a concrete client, which keeps it testable with a stub.
///
/// ## Example
///
/// ```rust
/// use hydra_discovery::Resolver;
///
/// async fn first_endpoint<R: Resolver>(resolver: &R, app: &str) -> Option<String> {
///     resolver.resolve(app).await.ok()?.into_iter().next()
/// }
/// ```
pub trait Resolver: Send + Sync + 'static {
    /// Resolve an application id to a list of endpoint URLs.
    fn resolve(
        &self,
        service: &str,
    ) -> impl Future<Output = Result<Vec<String>, HydraError>> + Send;
}
