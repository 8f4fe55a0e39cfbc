//! # hydra-discovery
//!
//! Client-side service discovery against a set of hydra registry servers.
//!
//! This crate provides:
//! - `HydraClient`, which resolves application ids to endpoint lists
//! - A registry refresh loop that keeps the list of registry servers current
//! - A TTL-based application cache
//! - Failover across registry servers with indefinite retry
//! - `Resolver` trait for code that only needs name resolution

mod apps;
mod client;
mod config;
mod registry;
mod resolver;
mod retry;

#[cfg(test)]
mod testing;

pub use apps::{AppCache, AppCacheEntry};
pub use client::{CachePolicy, HydraClient};
pub use config::{
    ClientConfig, ClientOptions, Timeouts, DEFAULT_APP_CACHE_TTL, DEFAULT_REGISTRY_REFRESH,
    DEFAULT_RETRY_DELAY,
};
pub use registry::{RefreshState, RegistryCache};
pub use resolver::Resolver;
pub use retry::RetryPolicy;
