//! Client configuration: options, effective timeouts and snapshots.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Floor and default for the registry list refresh period.
pub const DEFAULT_REGISTRY_REFRESH: Duration = Duration::from_millis(60_000);

/// Floor and default for the application cache time-to-live.
pub const DEFAULT_APP_CACHE_TTL: Duration = Duration::from_millis(20_000);

/// Floor and default for the delay before retrying a failed fetch.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Caller-supplied tuning for a [`HydraClient`](crate::HydraClient).
///
/// Every field is optional. Durations are read in humantime notation
/// (`"90s"`, `"1m 30s"`) when deserialized.
///
/// ## Example
///
/// ```rust
/// use hydra_discovery::ClientOptions;
/// use std::time::Duration;
///
/// let options = ClientOptions::new()
///     .registry_refresh(Duration::from_secs(120))
///     .retry_delay(Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Period between registry list refreshes.
    #[serde(with = "humantime_serde")]
    pub registry_refresh: Option<Duration>,

    /// Maximum age of a cached application endpoint list.
    #[serde(with = "humantime_serde")]
    pub app_cache_ttl: Option<Duration>,

    /// Delay before retrying after a registry server was unreachable.
    #[serde(with = "humantime_serde")]
    pub retry_delay: Option<Duration>,

    /// Spread retries by up to 25% of the retry delay.
    pub jitter: bool,
}

impl ClientOptions {
    /// Create options that leave every timeout at its floor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the registry refresh period.
    #[must_use]
    pub fn registry_refresh(mut self, period: Duration) -> Self {
        self.registry_refresh = Some(period);
        self
    }

    /// Set the application cache TTL.
    #[must_use]
    pub fn app_cache_ttl(mut self, ttl: Duration) -> Self {
        self.app_cache_ttl = Some(ttl);
        self
    }

    /// Set the retry delay.
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Enable or disable retry jitter.
    #[must_use]
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }
}

/// Effective timeouts, each clamped to its built-in floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timeouts {
    /// Period between registry list refreshes.
    #[serde(with = "humantime_serde")]
    pub registry_refresh: Duration,

    /// Maximum age of a cached application endpoint list.
    #[serde(with = "humantime_serde")]
    pub app_cache_ttl: Duration,

    /// Delay before retrying a failed fetch.
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            registry_refresh: DEFAULT_REGISTRY_REFRESH,
            app_cache_ttl: DEFAULT_APP_CACHE_TTL,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl Timeouts {
    /// Compute effective timeouts from caller options.
    ///
    /// A missing or zero value yields exactly the floor.
    #[must_use]
    pub fn from_options(options: &ClientOptions) -> Self {
        let floors = Self::default();
        Self {
            registry_refresh: floored(floors.registry_refresh, options.registry_refresh),
            app_cache_ttl: floored(floors.app_cache_ttl, options.app_cache_ttl),
            retry_delay: floored(floors.retry_delay, options.retry_delay),
        }
    }
}

fn floored(floor: Duration, value: Option<Duration>) -> Duration {
    floor.max(value.unwrap_or(Duration::ZERO))
}

/// Snapshot of a client's configuration.
///
/// `servers` is a copy of the current registry list; changing it has no
/// effect on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientConfig {
    /// Registry servers, in the order they will be tried.
    pub servers: Vec<String>,
    /// Effective timeouts.
    pub timeouts: Timeouts,
}

/// Mutable configuration held by a client.
///
/// Replaced wholesale by each `configure` call.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConfigStore {
    timeouts: Timeouts,
    jitter: bool,
    configured: bool,
}

impl ConfigStore {
    pub(crate) fn apply(&mut self, options: &ClientOptions) {
        self.timeouts = Timeouts::from_options(options);
        self.jitter = options.jitter;
        self.configured = true;
    }

    pub(crate) fn is_configured(&self) -> bool {
        self.configured
    }

    pub(crate) fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.timeouts.retry_delay).jitter(self.jitter)
    }
}
