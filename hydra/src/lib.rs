//! # Hydra
//!
//! Client-side service discovery against hydra registry servers.
//!
//! Given a bootstrap list of registry servers, a [`HydraClient`] resolves
//! application ids to endpoint lists:
//! - **Registry refresh**: the list of registry servers is re-fetched on a
//!   fixed period from whichever server is at the head of the list
//! - **Application cache**: answers are cached for a TTL
//! - **Failover**: an unreachable registry server is moved to the back of
//!   the list and the request retried against the next one, forever
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hydra::{ClientOptions, HydraError};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = hydra::new_client()?;
//! client.configure(["http://registry-1:7001", "http://registry-2:7001"], ClientOptions::new())?;
//!
//! match client.resolve("billing").await {
//!     Ok(endpoints) => println!("billing is at {endpoints:?}"),
//!     Err(HydraError::AppNotFound { body, .. }) => println!("unknown app: {body}"),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `reqwest` (default) - HTTP transport built on reqwest
//!
//! ## Architecture
//!
//! - [`hydra-core`] - Error types and the `HttpTransport` trait
//! - [`hydra-discovery`] - Caches, refresh loop, resolver and client
//! - [`hydra-transport`] - reqwest-backed `HttpTransport`

// Re-export core types
pub use hydra_core::{
    ConfigError, HttpResponse, HttpTransport, HydraError, TransportError, STATUS_BAD_REQUEST,
    STATUS_OK,
};

// Re-export discovery
pub use hydra_discovery::{
    AppCache, AppCacheEntry, CachePolicy, ClientConfig, ClientOptions, HydraClient, RefreshState,
    RegistryCache, Resolver, RetryPolicy, Timeouts, DEFAULT_APP_CACHE_TTL,
    DEFAULT_REGISTRY_REFRESH, DEFAULT_RETRY_DELAY,
};

// Re-export transport
#[cfg(feature = "reqwest")]
pub use hydra_transport::{HttpClientConfig, ReqwestTransport};

/// A client talking HTTP through reqwest.
#[cfg(feature = "reqwest")]
pub type Client = HydraClient<ReqwestTransport>;

/// Create an unconfigured client with the default HTTP transport.
///
/// # Errors
///
/// Returns [`TransportError::Client`] if the HTTP client cannot be built.
#[cfg(feature = "reqwest")]
pub fn new_client() -> Result<Client, TransportError> {
    Ok(HydraClient::new(ReqwestTransport::new()?))
}

/// Prelude module for convenient imports.
///
/// ```rust
/// use hydra::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{CachePolicy, ClientOptions, HydraClient, HydraError, Resolver};

    pub use hydra_core::HttpTransport;
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
