//! # hydra-transport
//!
//! HTTP transport for the hydra discovery client.
//!
//! This crate provides:
//! - `ReqwestTransport` - `HttpTransport` backed by a pooled `reqwest::Client`
//! - `HttpClientConfig` - connect/request timeouts and user agent

mod http;

pub use http::{HttpClientConfig, ReqwestTransport};
