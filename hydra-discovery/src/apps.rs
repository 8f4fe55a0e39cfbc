//! Application endpoint cache.

use std::time::Duration;

use dashmap::DashMap;
use hydra_core::{HttpResponse, TransportError};
use tokio::time::Instant;

/// Cached endpoint list for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCacheEntry {
    /// Endpoints returned by the registry.
    pub endpoints: Vec<String>,
    /// When the endpoints were fetched.
    pub last_update: Instant,
}

impl AppCacheEntry {
    /// Check whether this entry can answer a lookup at `now`.
    ///
    /// An entry is valid while it is non-empty and younger than `ttl`.
    #[must_use]
    pub fn is_valid(&self, now: Instant, ttl: Duration) -> bool {
        !self.endpoints.is_empty() && now.saturating_duration_since(self.last_update) < ttl
    }
}

/// Mapping from application id to its last fetched endpoint list.
///
/// Entries are never evicted; stale ones are ignored by [`lookup`](Self::lookup)
/// and overwritten by the next successful fetch.
#[derive(Debug, Default)]
pub struct AppCache {
    entries: DashMap<String, AppCacheEntry>,
}

impl AppCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached endpoints for `app` if the entry is still valid.
    #[must_use]
    pub fn lookup(&self, app: &str, now: Instant, ttl: Duration) -> Option<Vec<String>> {
        self.entries
            .get(app)
            .filter(|entry| entry.is_valid(now, ttl))
            .map(|entry| entry.endpoints.clone())
    }

    /// Insert or overwrite the entry for `app`.
    pub fn store(&self, app: impl Into<String>, endpoints: Vec<String>, now: Instant) {
        self.entries.insert(
            app.into(),
            AppCacheEntry {
                endpoints,
                last_update: now,
            },
        );
    }

    /// Get the entry for `app`, valid or not.
    #[must_use]
    pub fn get(&self, app: &str) -> Option<AppCacheEntry> {
        self.entries.get(app).map(|entry| entry.clone())
    }

    /// Number of applications with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How an application fetch turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AppFetch {
    /// The registry returned the application's endpoints.
    Found(Vec<String>),
    /// The registry does not know the application.
    NotFound(String),
    /// The registry server could not be used; fail over and retry.
    Unreachable(String),
}

impl AppFetch {
    pub(crate) fn classify(result: Result<HttpResponse, TransportError>) -> Self {
        match result {
            Ok(response) if response.is_ok() => {
                match serde_json::from_str::<Vec<String>>(&response.body) {
                    Ok(endpoints) => Self::Found(endpoints),
                    Err(e) => Self::Unreachable(format!("malformed endpoint list: {e}")),
                }
            }
            Ok(response) if response.is_bad_request() => Self::NotFound(response.body),
            Ok(response) => Self::Unreachable(format!("unexpected status {}", response.status)),
            Err(e) => Self::Unreachable(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(20);

    fn list(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_lookup_within_ttl() {
        let cache = AppCache::new();
        let now = Instant::now();
        cache.store("billing", list(&["http://10.0.0.1"]), now);

        assert_eq!(
            cache.lookup("billing", now + Duration::from_millis(19_999), TTL),
            Some(list(&["http://10.0.0.1"]))
        );
        assert_eq!(cache.lookup("other", now, TTL), None);
    }

    #[test]
    fn test_ttl_boundary_is_a_miss() {
        let cache = AppCache::new();
        let now = Instant::now();
        cache.store("billing", list(&["http://10.0.0.1"]), now);

        assert_eq!(cache.lookup("billing", now + TTL, TTL), None);
        assert_eq!(cache.lookup("billing", now + TTL * 2, TTL), None);
        // Stale entries stay around until overwritten.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_empty_entry_is_a_miss() {
        let cache = AppCache::new();
        let now = Instant::now();
        cache.store("billing", Vec::new(), now);

        assert_eq!(cache.lookup("billing", now, TTL), None);
        assert!(cache.get("billing").is_some());
    }

    #[test]
    fn test_store_overwrites() {
        let cache = AppCache::new();
        let first = Instant::now();
        cache.store("billing", list(&["a"]), first);
        cache.store("billing", list(&["b", "c"]), first + TTL);

        let entry = cache.get("billing").unwrap();
        assert_eq!(entry.endpoints, list(&["b", "c"]));
        assert_eq!(entry.last_update, first + TTL);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            AppFetch::classify(Ok(HttpResponse::ok(r#"["http://10.0.0.1:80"]"#))),
            AppFetch::Found(list(&["http://10.0.0.1:80"]))
        );
        assert_eq!(
            AppFetch::classify(Ok(HttpResponse::new(400, "no such app"))),
            AppFetch::NotFound("no such app".to_string())
        );
        assert!(matches!(
            AppFetch::classify(Ok(HttpResponse::new(500, ""))),
            AppFetch::Unreachable(_)
        ));
        assert!(matches!(
            AppFetch::classify(Ok(HttpResponse::ok("{}"))),
            AppFetch::Unreachable(_)
        ));
        assert!(matches!(
            AppFetch::classify(Err(TransportError::ConnectionFailed("refused".into()))),
            AppFetch::Unreachable(_)
        ));
    }

    #[test]
    fn test_non_string_endpoint_is_malformed() {
        assert!(matches!(
            AppFetch::classify(Ok(HttpResponse::ok(r#"["http://a", null]"#))),
            AppFetch::Unreachable(_)
        ));
        assert!(matches!(
            AppFetch::classify(Ok(HttpResponse::ok("[8080]"))),
            AppFetch::Unreachable(_)
        ));
    }
}
