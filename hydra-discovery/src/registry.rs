//! Registry server list and its refresh state machine.
//!
//! The head of the registry list is always the next server to contact.
//! A successful `GET <head>/app/hydra` replaces the whole list; a failed
//! one moves the head to the back of the list and schedules a retry.

use std::time::Duration;

use hydra_core::{HttpResponse, TransportError};
use tokio::time::Instant;

use crate::config::Timeouts;
use crate::retry::{RetryPolicy, RetrySlot};

/// Application id under which registries publish their own server list.
pub(crate) const REGISTRY_APP: &str = "hydra";

/// Build the URL for `app` on the registry server `base`.
pub(crate) fn app_url(base: &str, app: &str) -> String {
    format!("{}/app/{}", base.trim_end_matches('/'), app)
}

/// Ordered list of registry servers plus the time it was last refreshed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryCache {
    endpoints: Vec<String>,
    last_update: Option<Instant>,
}

impl RegistryCache {
    /// Create a cache seeded with a bootstrap list.
    #[must_use]
    pub fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            last_update: None,
        }
    }

    /// Next registry server to contact.
    #[must_use]
    pub fn head(&self) -> Option<&str> {
        self.endpoints.first().map(String::as_str)
    }

    /// All known registry servers, head first.
    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// When the list was last replaced by a registry answer.
    #[must_use]
    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// Replace the list with a bootstrap list from configuration.
    pub(crate) fn reset(&mut self, endpoints: Vec<String>) {
        self.endpoints = endpoints;
    }

    /// Replace the list with one fetched from a registry.
    pub(crate) fn replace(&mut self, endpoints: Vec<String>, now: Instant) {
        self.endpoints = endpoints;
        self.last_update = Some(now);
    }

    /// Fail over: move the head to the back of the list.
    pub(crate) fn rotate(&mut self) {
        if self.endpoints.len() > 1 {
            self.endpoints.rotate_left(1);
        }
    }
}

/// State of the registry refresh loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshState {
    /// Not started, or woken and about to fetch.
    #[default]
    Idle,
    /// A `GET /app/hydra` is in flight.
    Fetching,
    /// Waiting before the next fetch.
    Scheduled {
        /// How long the loop sleeps.
        delay: Duration,
        /// Whether the wait is a retry after a failure.
        retry: bool,
    },
}

/// How a registry list fetch turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RegistryFetch {
    /// The registry returned a non-empty list of servers.
    Refreshed(Vec<String>),
    /// The registry answered 200 with JSON that is not a server list.
    Reachable,
    /// The registry could not be used.
    Failed(String),
}

impl RegistryFetch {
    pub(crate) fn classify(result: Result<HttpResponse, TransportError>) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(e) => return Self::Failed(e.to_string()),
        };

        if !response.is_ok() {
            return Self::Failed(format!("unexpected status {}", response.status));
        }

        match serde_json::from_str::<Vec<String>>(&response.body) {
            Ok(list) if list.is_empty() => Self::Failed("empty registry list".to_string()),
            Ok(list) => Self::Refreshed(list),
            Err(e) => match serde_json::from_str::<serde_json::Value>(&response.body) {
                Ok(_) => Self::Reachable,
                Err(_) => Self::Failed(format!("malformed registry list: {e}")),
            },
        }
    }
}

/// The registry cache together with the loop that keeps it fresh.
#[derive(Debug, Default)]
pub(crate) struct RegistryRefresh {
    pub(crate) cache: RegistryCache,
    state: RefreshState,
    retry: RetrySlot,
}

impl RegistryRefresh {
    pub(crate) fn state(&self) -> RefreshState {
        self.state
    }

    /// Enter `Fetching` and return the URL to request.
    pub(crate) fn begin(&mut self) -> Option<String> {
        let url = self.cache.head().map(|head| app_url(head, REGISTRY_APP))?;
        self.state = RefreshState::Fetching;
        Some(url)
    }

    /// Apply a fetch outcome and return how long to sleep before the next one.
    pub(crate) fn complete(
        &mut self,
        outcome: RegistryFetch,
        timeouts: &Timeouts,
        retry: &RetryPolicy,
        now: Instant,
    ) -> Duration {
        let (delay, is_retry) = match outcome {
            RegistryFetch::Refreshed(list) => {
                tracing::info!(servers = list.len(), "Refreshed registry server list");
                self.cache.replace(list, now);
                self.retry.clear();
                (timeouts.registry_refresh, false)
            }
            RegistryFetch::Reachable => {
                tracing::debug!("Registry answered without a server list, keeping current list");
                self.retry.clear();
                (timeouts.registry_refresh, false)
            }
            RegistryFetch::Failed(reason) => {
                if self.retry.schedule() {
                    tracing::warn!(
                        server = self.cache.head().unwrap_or_default(),
                        reason = %reason,
                        "Registry server unreachable, failing over"
                    );
                    self.cache.rotate();
                }
                (retry.next_delay(), true)
            }
        };

        self.state = RefreshState::Scheduled {
            delay,
            retry: is_retry,
        };
        delay
    }

    /// The scheduled wait elapsed.
    pub(crate) fn wake(&mut self) {
        if let RefreshState::Scheduled { retry: true, .. } = self.state {
            self.retry.fire();
        }
        self.state = RefreshState::Idle;
    }

    #[cfg(test)]
    pub(crate) fn retry_pending(&self) -> bool {
        self.retry.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn servers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn refresh_with(names: &[&str]) -> RegistryRefresh {
        RegistryRefresh {
            cache: RegistryCache::new(servers(names)),
            ..Default::default()
        }
    }

    #[test]
    fn test_app_url() {
        assert_eq!(app_url("http://s1", "hydra"), "http://s1/app/hydra");
        assert_eq!(app_url("http://s1/", "billing"), "http://s1/app/billing");
    }

    #[test]
    fn test_rotate_moves_head_to_back() {
        let mut cache = RegistryCache::new(servers(&["a", "b", "c"]));
        cache.rotate();
        assert_eq!(cache.endpoints(), servers(&["b", "c", "a"]).as_slice());
        assert_eq!(cache.head(), Some("b"));

        let mut single = RegistryCache::new(servers(&["only"]));
        single.rotate();
        assert_eq!(single.head(), Some("only"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            RegistryFetch::classify(Ok(HttpResponse::ok(r#"["http://r1","http://r2"]"#))),
            RegistryFetch::Refreshed(servers(&["http://r1", "http://r2"]))
        );
        assert_eq!(
            RegistryFetch::classify(Ok(HttpResponse::ok("{}"))),
            RegistryFetch::Reachable
        );
        assert!(matches!(
            RegistryFetch::classify(Ok(HttpResponse::ok("[]"))),
            RegistryFetch::Failed(_)
        ));
        assert!(matches!(
            RegistryFetch::classify(Ok(HttpResponse::ok("not json"))),
            RegistryFetch::Failed(_)
        ));
        assert!(matches!(
            RegistryFetch::classify(Ok(HttpResponse::new(503, "[\"x\"]"))),
            RegistryFetch::Failed(_)
        ));
        assert!(matches!(
            RegistryFetch::classify(Err(TransportError::Timeout)),
            RegistryFetch::Failed(_)
        ));
    }

    #[test]
    fn test_success_replaces_list_and_schedules_refresh() {
        let mut refresh = refresh_with(&["http://s1"]);
        let timeouts = Timeouts::default();
        let policy = RetryPolicy::new(timeouts.retry_delay);
        let now = Instant::now();

        assert_eq!(refresh.begin().as_deref(), Some("http://s1/app/hydra"));
        assert_eq!(refresh.state(), RefreshState::Fetching);

        let delay = refresh.complete(
            RegistryFetch::Refreshed(servers(&["http://r1", "http://r2"])),
            &timeouts,
            &policy,
            now,
        );

        assert_eq!(delay, timeouts.registry_refresh);
        assert_eq!(refresh.cache.endpoints(), servers(&["http://r1", "http://r2"]).as_slice());
        assert_eq!(refresh.cache.last_update(), Some(now));
        assert_eq!(
            refresh.state(),
            RefreshState::Scheduled {
                delay: timeouts.registry_refresh,
                retry: false
            }
        );
    }

    #[test]
    fn test_failure_rotates_and_schedules_retry() {
        let mut refresh = refresh_with(&["http://s1", "http://s2"]);
        let timeouts = Timeouts::default();
        let policy = RetryPolicy::new(timeouts.retry_delay);

        refresh.begin();
        let delay = refresh.complete(
            RegistryFetch::Failed("refused".into()),
            &timeouts,
            &policy,
            Instant::now(),
        );

        assert_eq!(delay, timeouts.retry_delay);
        assert_eq!(refresh.cache.head(), Some("http://s2"));
        assert_eq!(refresh.cache.last_update(), None);
        assert!(refresh.retry_pending());

        refresh.wake();
        assert!(!refresh.retry_pending());
        assert_eq!(refresh.state(), RefreshState::Idle);
        assert_eq!(refresh.begin().as_deref(), Some("http://s2/app/hydra"));
    }

    #[test]
    fn test_failure_with_pending_retry_does_not_rotate() {
        let mut refresh = refresh_with(&["http://s1", "http://s2", "http://s3"]);
        let timeouts = Timeouts::default();
        let policy = RetryPolicy::new(timeouts.retry_delay);
        let now = Instant::now();

        refresh.complete(RegistryFetch::Failed("a".into()), &timeouts, &policy, now);
        refresh.complete(RegistryFetch::Failed("b".into()), &timeouts, &policy, now);

        assert_eq!(refresh.cache.head(), Some("http://s2"));
    }

    #[test]
    fn test_reachable_keeps_list() {
        let mut refresh = refresh_with(&["http://s1", "http://s2"]);
        let timeouts = Timeouts::default();
        let policy = RetryPolicy::new(timeouts.retry_delay);

        let delay = refresh.complete(RegistryFetch::Reachable, &timeouts, &policy, Instant::now());

        assert_eq!(delay, timeouts.registry_refresh);
        assert_eq!(refresh.cache.head(), Some("http://s1"));
        assert_eq!(refresh.cache.last_update(), None);
    }
}
