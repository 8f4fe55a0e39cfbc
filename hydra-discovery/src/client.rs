//! The discovery client.
//!
//! All mutable state lives behind one `HydraClient`. Registry list and
//! configuration sit under a single mutex that is never held across an
//! await point, so every state transition is applied atomically between
//! suspension points. The application cache is a concurrent map whose
//! entries are written whole.

use std::sync::{Arc, Weak};
use std::time::Duration;

use hydra_core::{ConfigError, HttpResponse, HttpTransport, HydraError, TransportError};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::apps::{AppCache, AppCacheEntry, AppFetch};
use crate::config::{ClientConfig, ClientOptions, ConfigStore};
use crate::registry::{app_url, RefreshState, RegistryFetch, RegistryRefresh};
use crate::resolver::Resolver;
use crate::retry::RetrySlot;

/// Whether a resolution may be answered from the application cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Serve a valid cache entry without a network request.
    #[default]
    PreferCache,
    /// Always ask the registry.
    Override,
}

/// Client for hydra registry servers.
///
/// Resolves application ids to endpoint lists, caching answers for the
/// configured TTL and failing over across registry servers when one is
/// unreachable. Connectivity failures are retried forever; callers only
/// ever see success, [`HydraError::NotInitialized`] or
/// [`HydraError::AppNotFound`].
///
/// Cloning is cheap and clones share state. The background refresh task
/// stops once every clone is dropped.
///
/// ## Example
///
/// ```rust,ignore
/// use hydra_discovery::{ClientOptions, HydraClient};
///
/// let client = HydraClient::new(transport);
/// client.configure(["http://registry-1:7001", "http://registry-2:7001"], ClientOptions::new())?;
/// let endpoints = client.resolve("billing").await?;
/// ```
pub struct HydraClient<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for HydraClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T> {
    transport: T,
    state: Mutex<ClientState>,
    apps: AppCache,
}

#[derive(Default)]
struct ClientState {
    config: ConfigStore,
    registry: RegistryRefresh,
    app_retry: RetrySlot,
    refresh_task: Option<JoinHandle<()>>,
}

/// Result of the cache check at the top of a resolution.
enum Lookup {
    Cached(Vec<String>),
    Fetch(String),
}

/// Holds the resolver's retry slot for the duration of a backoff.
///
/// Dropping it fires the slot, including when the resolve future is
/// dropped mid-sleep.
struct PendingAppRetry<'a, T> {
    inner: &'a Inner<T>,
}

impl<T> Drop for PendingAppRetry<'_, T> {
    fn drop(&mut self) {
        self.inner.state.lock().app_retry.fire();
    }
}

/// What the resolver does after an application fetch.
enum AppStep {
    Resolved(Vec<String>),
    NotFound(String),
    RetryAfter(Duration),
}

impl<T: HttpTransport> HydraClient<T> {
    /// Create an unconfigured client using `transport` for requests.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                state: Mutex::new(ClientState::default()),
                apps: AppCache::new(),
            }),
        }
    }

    /// Set the registry bootstrap list and timeouts.
    ///
    /// The client keeps its own copy of `servers`. The first successful
    /// call starts the registry refresh loop on the current Tokio runtime;
    /// later calls replace the server list and timeouts without starting a
    /// second loop. In-flight fetches and pending timers are not cancelled,
    /// so a fetch issued before reconfiguring may still overwrite the new
    /// server list when it completes.
    ///
    /// # Errors
    ///
    /// [`ConfigError::EmptyServerList`] if `servers` is empty, and
    /// [`ConfigError::NoRuntime`] if the initializing call happens outside
    /// a Tokio runtime. Nothing is changed on error.
    pub fn configure<I, S>(&self, servers: I, options: ClientOptions) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let servers: Vec<String> = servers.into_iter().map(Into::into).collect();
        if servers.is_empty() {
            return Err(ConfigError::EmptyServerList);
        }

        let mut state = self.inner.state.lock();

        let runtime = if state.refresh_task.is_none() {
            Some(tokio::runtime::Handle::try_current().map_err(|_| ConfigError::NoRuntime)?)
        } else {
            None
        };

        tracing::debug!(servers = servers.len(), ?options, "Configuring hydra client");
        state.registry.cache.reset(servers);
        state.config.apply(&options);

        if let Some(runtime) = runtime {
            let weak = Arc::downgrade(&self.inner);
            state.refresh_task = Some(runtime.spawn(refresh_loop(weak)));
        }

        Ok(())
    }

    /// Snapshot of the current registry list and effective timeouts.
    ///
    /// Before the first `configure` call the list is empty and the
    /// timeouts are the built-in floors.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let state = self.inner.state.lock();
        ClientConfig {
            servers: state.registry.cache.endpoints().to_vec(),
            timeouts: state.config.timeouts(),
        }
    }

    /// Check whether `configure` has succeeded at least once.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().config.is_configured()
    }

    /// When the registry list was last replaced by a registry answer.
    #[must_use]
    pub fn registry_last_update(&self) -> Option<Instant> {
        self.inner.state.lock().registry.cache.last_update()
    }

    /// Current state of the registry refresh loop.
    #[must_use]
    pub fn refresh_state(&self) -> RefreshState {
        self.inner.state.lock().registry.state()
    }

    /// The cached entry for `app_id`, valid or not.
    #[must_use]
    pub fn cached(&self, app_id: &str) -> Option<AppCacheEntry> {
        self.inner.apps.get(app_id)
    }

    /// Resolve `app_id`, answering from the cache when possible.
    ///
    /// # Errors
    ///
    /// [`HydraError::NotInitialized`] before `configure`, and
    /// [`HydraError::AppNotFound`] when the registry does not know the app.
    /// Unreachable registry servers are retried without limit.
    pub async fn resolve(&self, app_id: &str) -> Result<Vec<String>, HydraError> {
        self.resolve_with(app_id, CachePolicy::PreferCache).await
    }

    /// Resolve `app_id`, always asking the registry.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub async fn resolve_uncached(&self, app_id: &str) -> Result<Vec<String>, HydraError> {
        self.resolve_with(app_id, CachePolicy::Override).await
    }

    /// Resolve `app_id` with an explicit cache policy.
    ///
    /// Each retry starts over from the cache check, so an answer fetched
    /// meanwhile by another resolution is picked up.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub async fn resolve_with(
        &self,
        app_id: &str,
        policy: CachePolicy,
    ) -> Result<Vec<String>, HydraError> {
        loop {
            let url = match self.inner.app_lookup(app_id, policy)? {
                Lookup::Cached(endpoints) => {
                    tracing::debug!(app = app_id, "Serving app endpoints from cache");
                    return Ok(endpoints);
                }
                Lookup::Fetch(url) => url,
            };

            tracing::debug!(app = app_id, url = %url, "Fetching app endpoints");
            let result = self.inner.transport.get(&url).await;

            match self.inner.finish_app_fetch(app_id, result) {
                AppStep::Resolved(endpoints) => return Ok(endpoints),
                AppStep::NotFound(body) => return Err(HydraError::app_not_found(app_id, body)),
                AppStep::RetryAfter(delay) => {
                    // Clears the slot when the wait ends or the caller gives up.
                    let _pending = PendingAppRetry { inner: &*self.inner };
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

impl<T: HttpTransport> Resolver for HydraClient<T> {
    async fn resolve(&self, service: &str) -> Result<Vec<String>, HydraError> {
        HydraClient::resolve(self, service).await
    }
}

impl<T: HttpTransport> Inner<T> {
    fn app_lookup(&self, app_id: &str, policy: CachePolicy) -> Result<Lookup, HydraError> {
        let state = self.state.lock();
        if !state.config.is_configured() {
            return Err(HydraError::NotInitialized);
        }

        if policy == CachePolicy::PreferCache {
            let ttl = state.config.timeouts().app_cache_ttl;
            if let Some(endpoints) = self.apps.lookup(app_id, Instant::now(), ttl) {
                return Ok(Lookup::Cached(endpoints));
            }
        }

        state
            .registry
            .cache
            .head()
            .map(|head| Lookup::Fetch(app_url(head, app_id)))
            .ok_or(HydraError::NotInitialized)
    }

    fn finish_app_fetch(
        &self,
        app_id: &str,
        result: Result<HttpResponse, TransportError>,
    ) -> AppStep {
        let mut state = self.state.lock();
        match AppFetch::classify(result) {
            AppFetch::Found(endpoints) => {
                self.apps.store(app_id, endpoints.clone(), Instant::now());
                state.app_retry.clear();
                AppStep::Resolved(endpoints)
            }
            AppFetch::NotFound(body) => {
                tracing::debug!(app = app_id, "Registry does not know app");
                AppStep::NotFound(body)
            }
            AppFetch::Unreachable(reason) => {
                if state.app_retry.schedule() {
                    tracing::warn!(
                        app = app_id,
                        server = state.registry.cache.head().unwrap_or_default(),
                        reason = %reason,
                        "Registry server unreachable, failing over"
                    );
                    state.registry.cache.rotate();
                }
                AppStep::RetryAfter(state.config.retry_policy().next_delay())
            }
        }
    }

    fn begin_refresh(&self) -> Option<String> {
        self.state.lock().registry.begin()
    }

    fn finish_refresh(&self, result: Result<HttpResponse, TransportError>) -> Duration {
        let outcome = RegistryFetch::classify(result);
        let mut state = self.state.lock();
        let timeouts = state.config.timeouts();
        let policy = state.config.retry_policy();
        state
            .registry
            .complete(outcome, &timeouts, &policy, Instant::now())
    }

    fn wake_refresh(&self) {
        self.state.lock().registry.wake();
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        if let Some(task) = self.state.get_mut().refresh_task.take() {
            task.abort();
        }
    }
}

/// Registry refresh loop: fetch, then sleep for the refresh period on
/// success or the retry delay on failure, forever.
///
/// Holds only a weak reference between iterations so dropping the client
/// ends the loop.
async fn refresh_loop<T: HttpTransport>(inner: Weak<Inner<T>>) {
    loop {
        let Some(client) = inner.upgrade() else {
            break;
        };

        let Some(url) = client.begin_refresh() else {
            break;
        };

        tracing::debug!(url = %url, "Refreshing registry server list");
        let result = client.transport.get(&url).await;
        let delay = client.finish_refresh(result);
        drop(client);

        tokio::time::sleep(delay).await;

        match inner.upgrade() {
            Some(client) => client.wake_refresh(),
            None => break,
        }
    }
}
