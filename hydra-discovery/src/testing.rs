//! Scripted in-memory transport for tests.

use std::sync::Arc;
use std::time::Duration;

use hydra_core::{HttpResponse, HttpTransport, TransportError};
use parking_lot::Mutex;

type Responder = dyn Fn(&str) -> Result<HttpResponse, TransportError> + Send + Sync;

/// Transport that answers from a closure and records every requested URL.
pub(crate) struct MockTransport {
    calls: Mutex<Vec<String>>,
    responder: Box<Responder>,
}

impl MockTransport {
    pub(crate) fn new(
        responder: impl Fn(&str) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        })
    }

    /// All requested URLs, in order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Requested URLs ending in `/app/<app>`.
    pub(crate) fn calls_for(&self, app: &str) -> Vec<String> {
        let suffix = format!("/app/{app}");
        self.calls
            .lock()
            .iter()
            .filter(|url| url.ends_with(&suffix))
            .cloned()
            .collect()
    }
}

impl HttpTransport for MockTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        self.calls.lock().push(url.to_string());
        // Behave like a real request and suspend once.
        tokio::task::yield_now().await;
        (self.responder)(url)
    }
}

pub(crate) fn refused() -> Result<HttpResponse, TransportError> {
    Err(TransportError::ConnectionFailed("connection refused".to_string()))
}

/// Let spawned tasks run until they block on a timer.
pub(crate) async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock and let woken tasks run.
pub(crate) async fn advance(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}
