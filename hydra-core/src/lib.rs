//! # hydra-core
//!
//! Core types, traits, and error definitions for the hydra discovery client.
//!
//! This crate provides:
//! - Error types (`HydraError`, `ConfigError`, `TransportError`)
//! - The `HttpTransport` trait used to talk to registry servers
//! - `HttpResponse`, the status/body pair a transport yields

mod error;
mod transport;

pub use error::{ConfigError, HydraError, TransportError};
pub use transport::{HttpResponse, HttpTransport, STATUS_BAD_REQUEST, STATUS_OK};
