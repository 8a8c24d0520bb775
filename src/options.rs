//! Client configuration.
use std::sync::Arc;
use std::time::Duration;

use crate::storage::StorageBackend;

pub(crate) const DEFAULT_API_BASE: &str = "https://statsigapi.net/v1";
pub(crate) const DEFAULT_LOGGING_API_BASE: &str = "https://featuregates.org/v1";
pub(crate) const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);
pub(crate) const DEFAULT_MAX_QUEUE_SIZE: usize = 100;
pub(crate) const DEFAULT_FLUSH_RETRIES: u32 = 5;

/// Configuration for [`StatsigClient`](crate::StatsigClient), usually created
/// and modified using the builder pattern.
///
/// # Examples
/// ```no_run
/// # use std::time::Duration;
/// # use statsig_client::ClientOptions;
/// let options = ClientOptions::new()
///     .environment_tier("staging")
///     .init_timeout(Some(Duration::from_secs(2)));
/// ```
#[derive(Clone)]
pub struct ClientOptions {
    pub(crate) api_base: String,
    pub(crate) logging_api_base: String,
    /// `None` waits for the initial fetch indefinitely.
    pub(crate) init_timeout: Option<Duration>,
    pub(crate) flush_interval: Duration,
    pub(crate) max_queue_size: usize,
    pub(crate) flush_retries: u32,
    pub(crate) environment_tier: Option<String>,
    /// `None` keeps results in memory only for the lifetime of the client.
    pub(crate) storage: Option<Arc<dyn StorageBackend>>,
    pub(crate) background_cache_writes: bool,
}

impl Default for ClientOptions {
    fn default() -> ClientOptions {
        ClientOptions {
            api_base: DEFAULT_API_BASE.to_owned(),
            logging_api_base: DEFAULT_LOGGING_API_BASE.to_owned(),
            init_timeout: Some(DEFAULT_INIT_TIMEOUT),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            flush_retries: DEFAULT_FLUSH_RETRIES,
            environment_tier: None,
            storage: None,
            background_cache_writes: true,
        }
    }
}

impl ClientOptions {
    pub fn new() -> ClientOptions {
        ClientOptions::default()
    }

    /// Base URL for `initialize` requests.
    pub fn api_base(mut self, url: impl Into<String>) -> ClientOptions {
        self.api_base = url.into();
        self
    }

    /// Base URL for `log_event` requests.
    pub fn logging_api_base(mut self, url: impl Into<String>) -> ClientOptions {
        self.logging_api_base = url.into();
        self
    }

    /// How long `initialize` waits for the first fetch before returning with
    /// cached (or empty) values. The fetch keeps running in the background and
    /// its result is still applied once it completes. `None` waits without
    /// limit.
    pub fn init_timeout(mut self, timeout: Option<Duration>) -> ClientOptions {
        self.init_timeout = timeout;
        self
    }

    /// Interval of the periodic event flush.
    pub fn flush_interval(mut self, interval: Duration) -> ClientOptions {
        self.flush_interval = interval;
        self
    }

    /// Number of buffered events that triggers an immediate flush.
    pub fn max_queue_size(mut self, size: usize) -> ClientOptions {
        self.max_queue_size = size.max(1);
        self
    }

    /// Retry attempts for a failed event flush (shutdown flushes never retry).
    pub fn flush_retries(mut self, retries: u32) -> ClientOptions {
        self.flush_retries = retries;
        self
    }

    /// Tag every request with an environment tier, e.g. `"staging"`. Server
    /// rules can target the tier.
    pub fn environment_tier(mut self, tier: impl Into<String>) -> ClientOptions {
        self.environment_tier = Some(tier.into());
        self
    }

    /// Persist cached results and the stable id through `backend`. Without a
    /// backend everything is held in memory and lost when the client is
    /// dropped.
    pub fn storage(mut self, backend: Arc<dyn StorageBackend>) -> ClientOptions {
        self.storage = Some(backend);
        self
    }

    /// Write cache updates on the calling task instead of handing them to the
    /// background writer.
    pub fn synchronous_cache_writes(mut self) -> ClientOptions {
        self.background_cache_writes = false;
        self
    }
}
