//! The client: fetch orchestration, flag lookups and exposure logging.
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::dispatcher::{RequestDispatcher, DEFAULT_BACKOFF};
use crate::evaluation::{DynamicConfig, FeatureGate, Layer};
use crate::event_logger::EventLogger;
use crate::events::{EventLog, EventValue, MAX_SCALAR_LENGTH};
use crate::hashing::{djb2, hash_name};
use crate::options::ClientOptions;
use crate::sdk_metadata::StatsigMetadata;
use crate::storage::InMemoryStorage;
use crate::store::{InitializeResponse, ResultCache};
use crate::user::StatsigUser;
use crate::{Error, Result};

/// Application lifecycle signal forwarded by the embedding application. The
/// client has no way to observe the process lifecycle itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycleEvent {
    /// The application is moving to the background and may be killed at any
    /// moment; buffered events are flushed immediately.
    Backgrounded,
    /// The application returned to the foreground; results are refetched in
    /// the background.
    Foregrounded,
}

#[derive(Serialize)]
struct InitializeRequest<'a> {
    user: &'a StatsigUser,
    #[serde(rename = "statsigMetadata")]
    statsig_metadata: &'a StatsigMetadata,
    #[serde(rename = "sinceTime", skip_serializing_if = "Option::is_none")]
    since_time: Option<i64>,
    #[serde(rename = "previousDerivedFields", skip_serializing_if = "Option::is_none")]
    previous_derived_fields: Option<HashMap<String, String>>,
}

/// A client for server-evaluated feature gates, dynamic configs and layers.
///
/// Created with [`StatsigClient::initialize`], which loads any cached results
/// for the user and races a fresh fetch against the configured init timeout.
/// Lookups are synchronous, infallible and never panic: an unknown name
/// returns a typed empty default. Every lookup records a deduplicated
/// exposure event unless the `_with_exposure_logging_disabled` variant is
/// used.
///
/// The client is an explicit instance; creating two clients with different
/// keys or users is supported and they do not interfere.
///
/// # Examples
/// ```no_run
/// # use statsig_client::{ClientOptions, StatsigClient, StatsigUser};
/// # async fn test() -> statsig_client::Result<()> {
/// let user = StatsigUser::with_user_id("user-1");
/// let client = StatsigClient::initialize("client-KEY", user, ClientOptions::new()).await?;
/// if client.check_gate("new_onboarding") {
///     // ...
/// }
/// client.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct StatsigClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    sdk_key: String,
    options: ClientOptions,
    dispatcher: Arc<RequestDispatcher>,
    cache: ResultCache,
    logger: EventLogger,
    user: RwLock<StatsigUser>,
    shut_down: AtomicBool,
}

impl StatsigClient {
    /// Create a client for `user`. Returns synchronously-detectable misuse as
    /// an error (empty or non-client SDK key, invalid base URL). Network
    /// failure is not an error: the client starts from cached or empty
    /// values and the fetch continues in the background.
    ///
    /// Must be called within a tokio runtime.
    pub async fn initialize(
        sdk_key: impl Into<String>,
        user: StatsigUser,
        options: ClientOptions,
    ) -> Result<StatsigClient> {
        let sdk_key = sdk_key.into();
        validate_sdk_key(&sdk_key)?;

        let dispatcher = Arc::new(RequestDispatcher::new(
            sdk_key.clone(),
            &options.api_base,
            &options.logging_api_base,
        )?);

        let mut user = user;
        if let Some(tier) = &options.environment_tier {
            user.statsig_environment
                .insert("tier".to_owned(), tier.clone());
        }

        let storage = options
            .storage
            .clone()
            .unwrap_or_else(|| Arc::new(InMemoryStorage::new()));
        let cache = ResultCache::open(storage, options.background_cache_writes, &user);

        let metadata = StatsigMetadata::new(cache.stable_id().to_owned());
        let logger = EventLogger::new(
            Arc::clone(&dispatcher),
            metadata,
            options.max_queue_size,
            options.flush_retries,
        );
        logger.start_periodic_flush(options.flush_interval);

        let inner = Arc::new(ClientInner {
            sdk_key,
            options,
            cache,
            logger,
            user: RwLock::new(user),
            shut_down: AtomicBool::new(false),
            dispatcher,
        });
        inner.raced_fetch().await;

        Ok(StatsigClient { inner })
    }

    /// Whether `gate_name` is on for the current user. Unknown gates are off.
    pub fn check_gate(&self, gate_name: &str) -> bool {
        self.get_feature_gate(gate_name).value
    }

    /// [`StatsigClient::check_gate`] without recording an exposure.
    pub fn check_gate_with_exposure_logging_disabled(&self, gate_name: &str) -> bool {
        self.get_feature_gate_with_exposure_logging_disabled(gate_name)
            .value
    }

    /// The full gate result for `gate_name`, including the rule id.
    pub fn get_feature_gate(&self, gate_name: &str) -> FeatureGate {
        self.feature_gate_impl(gate_name, true)
    }

    /// [`StatsigClient::get_feature_gate`] without recording an exposure.
    pub fn get_feature_gate_with_exposure_logging_disabled(&self, gate_name: &str) -> FeatureGate {
        self.feature_gate_impl(gate_name, false)
    }

    /// The dynamic config named `config_name`. Unknown names return an empty
    /// config whose `get` always falls back to the default.
    pub fn get_config(&self, config_name: &str) -> DynamicConfig {
        self.config_impl(config_name, true)
    }

    /// [`StatsigClient::get_config`] without recording an exposure.
    pub fn get_config_with_exposure_logging_disabled(&self, config_name: &str) -> DynamicConfig {
        self.config_impl(config_name, false)
    }

    /// Experiments are dynamic configs with allocation fields.
    pub fn get_experiment(&self, experiment_name: &str) -> DynamicConfig {
        self.get_config(experiment_name)
    }

    /// The layer named `layer_name`. Reading a parameter through
    /// [`Layer::get`] records a parameter-level exposure.
    pub fn get_layer(&self, layer_name: &str) -> Layer {
        self.layer_impl(layer_name, true)
    }

    /// [`StatsigClient::get_layer`] with the parameter exposure hook left off.
    pub fn get_layer_with_exposure_logging_disabled(&self, layer_name: &str) -> Layer {
        self.layer_impl(layer_name, false)
    }

    /// Record a custom event for the current user. Event names and string
    /// values longer than 64 characters are truncated; oversized metadata is
    /// dropped.
    pub fn log_event(
        &self,
        event_name: &str,
        value: Option<EventValue>,
        metadata: Option<HashMap<String, String>>,
    ) {
        if self.is_shut_down() {
            log::warn!(target: "statsig", "log_event after shutdown, dropping {event_name:?}");
            return;
        }
        let name: String = event_name.chars().take(MAX_SCALAR_LENGTH).collect();
        let user = self.current_user();
        self.inner
            .logger
            .enqueue(EventLog::custom(&user, name, value.map(EventValue::into_json), metadata));
    }

    /// Switch to a new user: exposure dedupe state is reset, the new user's
    /// cached results are loaded, and a fresh fetch is raced against the init
    /// timeout. Lookups made while the fetch is in flight see the new user's
    /// cached (or empty) values, never the previous user's.
    pub async fn update_user(&self, user: StatsigUser) -> Result<()> {
        self.ensure_running()?;

        let mut user = user;
        if let Some(tier) = &self.inner.options.environment_tier {
            user.statsig_environment
                .insert("tier".to_owned(), tier.clone());
        }

        {
            let mut current = self
                .inner
                .user
                .write()
                .expect("thread holding user lock should not panic");
            *current = user.clone();
        }
        self.inner.logger.reset_exposure_dedupe();
        self.inner.cache.load_user(&user);
        self.inner.raced_fetch().await;
        Ok(())
    }

    /// Drain buffered events now.
    pub async fn flush(&self) {
        self.inner.logger.flush(false).await;
    }

    /// React to an application lifecycle change. Backgrounding flushes the
    /// event buffer without blocking; foregrounding refetches results.
    pub fn handle_lifecycle_event(&self, event: AppLifecycleEvent) {
        if self.is_shut_down() {
            return;
        }
        match event {
            AppLifecycleEvent::Backgrounded => self.inner.logger.flush_async(),
            AppLifecycleEvent::Foregrounded => {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    inner.fetch_and_apply().await;
                });
            }
        }
    }

    /// Stop the flush timer and drain the buffer one last time (without
    /// retries). Further `update_user`/`shutdown` calls return
    /// [`Error::ShutDown`]; lookups keep answering from the cache.
    pub async fn shutdown(&self) -> Result<()> {
        if self.inner.shut_down.swap(true, Ordering::SeqCst) {
            return Err(Error::ShutDown);
        }
        self.inner.logger.shutdown().await;
        Ok(())
    }

    /// The durable install-scoped identifier.
    pub fn stable_id(&self) -> String {
        self.inner.cache.stable_id().to_owned()
    }

    fn feature_gate_impl(&self, gate_name: &str, log_exposure: bool) -> FeatureGate {
        let mut gate = self
            .inner
            .cache
            .gate(&hash_name(gate_name))
            .or_else(|| self.inner.cache.gate(gate_name))
            .unwrap_or_else(|| FeatureGate::empty(gate_name));
        gate.name = gate_name.to_owned();

        if log_exposure && !self.is_shut_down() {
            self.inner
                .logger
                .log_gate_exposure(&self.current_user(), gate_name, &gate);
        }
        gate
    }

    fn config_impl(&self, config_name: &str, log_exposure: bool) -> DynamicConfig {
        let mut config = self
            .inner
            .cache
            .config(&hash_name(config_name))
            .or_else(|| self.inner.cache.config(config_name))
            .unwrap_or_else(|| DynamicConfig::empty(config_name));
        config.name = config_name.to_owned();

        if log_exposure && !self.is_shut_down() {
            self.inner
                .logger
                .log_config_exposure(&self.current_user(), config_name, &config);
        }
        config
    }

    fn layer_impl(&self, layer_name: &str, log_exposure: bool) -> Layer {
        let mut layer = self
            .inner
            .cache
            .layer(&hash_name(layer_name))
            .or_else(|| self.inner.cache.layer(layer_name))
            .unwrap_or_else(|| Layer::empty(layer_name));
        layer.name = layer_name.to_owned();

        if log_exposure && !self.is_shut_down() {
            let logger = self.inner.logger.clone();
            let user = self.current_user();
            let layer_name = layer_name.to_owned();
            layer.on_exposure = Some(Arc::new(move |layer, parameter| {
                logger.log_layer_exposure(&user, &layer_name, layer, parameter);
            }));
        }
        layer
    }

    fn current_user(&self) -> StatsigUser {
        self.inner
            .user
            .read()
            .expect("thread holding user lock should not panic")
            .clone()
    }

    fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            Err(Error::ShutDown)
        } else {
            Ok(())
        }
    }
}

impl ClientInner {
    /// Race a fetch against the init timeout. On timeout the fetch task is
    /// detached, not cancelled; a late response still lands in the cache and
    /// the persisted entry.
    async fn raced_fetch(self: &Arc<Self>) {
        let task = {
            let inner = Arc::clone(self);
            tokio::spawn(async move {
                inner.fetch_and_apply().await;
            })
        };
        match self.options.init_timeout {
            Some(timeout) => {
                if tokio::time::timeout(timeout, task).await.is_err() {
                    log::debug!(
                        target: "statsig",
                        "fetch exceeded {timeout:?}, continuing with cached values",
                    );
                }
            }
            None => {
                let _ = task.await;
            }
        }
    }

    async fn fetch_and_apply(&self) {
        let user = self
            .user
            .read()
            .expect("thread holding user lock should not panic")
            .clone();
        let metadata = StatsigMetadata::new(self.cache.stable_id().to_owned());
        let body = InitializeRequest {
            user: &user,
            statsig_metadata: &metadata,
            since_time: self.cache.since_time(&user),
            previous_derived_fields: self.cache.derived_fields(&user),
        };

        match self
            .dispatcher
            .post_api("initialize", &body, 0, DEFAULT_BACKOFF)
            .await
        {
            Ok(raw) => self.apply_response(&user, raw),
            Err(err) => {
                log::warn!(target: "statsig", "fetch failed: {err}");
                self.logger
                    .log_diagnostics(&user, format!("initialize request failed: {err}"));
            }
        }
    }

    /// Validate and apply a fetched payload. A payload answered with a
    /// different SDK key is discarded; `has_updates == false` means the
    /// cached entry is already current and must stay untouched.
    fn apply_response(&self, user: &StatsigUser, raw: String) {
        let response: InitializeResponse = match serde_json::from_str(&raw) {
            Ok(response) => response,
            Err(err) => {
                log::warn!(target: "statsig", "unparseable initialize response: {err}");
                self.logger
                    .log_diagnostics(user, format!("unparseable initialize response: {err}"));
                return;
            }
        };

        if let Some(hashed_key) = &response.hashed_sdk_key_used {
            if *hashed_key != djb2(&self.sdk_key) {
                log::warn!(target: "statsig", "response was evaluated for a different sdk key, discarding");
                return;
            }
        }
        if response.has_updates == Some(false) {
            log::debug!(target: "statsig", "cached values are current");
            return;
        }

        self.cache.update(user, raw, response);
    }
}

fn validate_sdk_key(sdk_key: &str) -> Result<()> {
    if sdk_key.is_empty() {
        return Err(Error::EmptySdkKey);
    }
    if !sdk_key.starts_with("client-") && !sdk_key.starts_with("test-") {
        return Err(Error::InvalidSdkKey);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::test_server::{ScriptedResponse, ScriptedServer};

    /// Options pointing at a port that is never listening, so fetches fail
    /// fast and the client runs from cached values only.
    fn offline_options() -> ClientOptions {
        ClientOptions::new()
            .api_base("http://127.0.0.1:1/v1")
            .logging_api_base("http://127.0.0.1:1/v1")
            .synchronous_cache_writes()
            .flush_interval(Duration::from_secs(3600))
    }

    fn server_options(server: &ScriptedServer) -> ClientOptions {
        offline_options()
            .api_base(server.base_url())
            .logging_api_base(server.base_url())
    }

    fn payload_with_gate(gate_name: &str, value: bool) -> String {
        serde_json::json!({
            "feature_gates": {
                hash_name(gate_name): {"value": value, "rule_id": "rule_1"},
            },
            "time": 1000,
            "has_updates": true,
        })
        .to_string()
    }

    #[tokio::test]
    async fn sdk_keys_are_validated() {
        let user = StatsigUser::with_user_id("u1");
        assert!(matches!(
            StatsigClient::initialize("", user.clone(), offline_options()).await,
            Err(Error::EmptySdkKey)
        ));
        assert!(matches!(
            StatsigClient::initialize("secret-abc", user.clone(), offline_options()).await,
            Err(Error::InvalidSdkKey)
        ));
        assert!(
            StatsigClient::initialize("test-abc", user, offline_options())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn invalid_base_url_is_rejected() {
        let user = StatsigUser::with_user_id("u1");
        let options = offline_options().api_base("not a url");
        assert!(matches!(
            StatsigClient::initialize("client-abc", user, options).await,
            Err(Error::InvalidBaseUrl(_))
        ));
    }

    #[tokio::test]
    async fn unknown_gate_is_off_and_logs_one_exposure() {
        let user = StatsigUser::with_user_id("u1");
        let client = StatsigClient::initialize("client-abc", user, offline_options())
            .await
            .unwrap();

        assert!(!client.check_gate("unknown_gate"));
        assert!(!client.check_gate("unknown_gate"));

        // The failed fetch logged one diagnostics event; the two identical
        // lookups logged one deduped exposure.
        let exposures: Vec<_> = client
            .inner
            .logger
            .pending_events()
            .into_iter()
            .filter(|event| event.event_name == crate::events::GATE_EXPOSURE_EVENT)
            .collect();
        assert_eq!(exposures.len(), 1);
        let metadata = exposures[0].metadata.as_ref().unwrap();
        assert_eq!(metadata.get("gate").map(String::as_str), Some("unknown_gate"));
        assert_eq!(metadata.get("gateValue").map(String::as_str), Some("false"));
    }

    #[tokio::test]
    async fn exposure_logging_disabled_variants_do_not_enqueue() {
        let user = StatsigUser::with_user_id("u1");
        let client = StatsigClient::initialize("client-abc", user, offline_options())
            .await
            .unwrap();

        client.check_gate_with_exposure_logging_disabled("g");
        client.get_config_with_exposure_logging_disabled("c");
        let layer = client.get_layer_with_exposure_logging_disabled("l");
        layer.get("param", String::new());

        let exposures = client
            .inner
            .logger
            .pending_events()
            .into_iter()
            .filter(|event| event.event_name.contains("exposure"))
            .count();
        assert_eq!(exposures, 0);
    }

    #[tokio::test]
    async fn cached_results_survive_a_failed_fetch() {
        let user = StatsigUser::with_user_id("u1");
        let storage = Arc::new(
            InMemoryStorage::new()
                .with_entry("statsig::stableID", "sid-1")
                .with_entry(
                    "statsig::userValues-userID:u1;stableID:sid-1",
                    payload_with_gate("cached_gate", true),
                ),
        );

        let client = StatsigClient::initialize(
            "client-abc",
            user,
            offline_options().storage(storage),
        )
        .await
        .unwrap();

        assert!(client.check_gate("cached_gate"));
        assert_eq!(client.stable_id(), "sid-1");
    }

    #[tokio::test]
    async fn fetched_payload_is_applied_and_request_carries_identity() {
        let server =
            ScriptedServer::start(vec![ScriptedResponse::ok(&payload_with_gate("g", true))])
                .await;
        let user = StatsigUser::with_user_id("u1");
        let options = server_options(&server).environment_tier("staging");

        let client = StatsigClient::initialize("client-abc", user, options)
            .await
            .unwrap();

        assert!(client.check_gate("g"));
        let request = server.requests().remove(0);
        assert!(request.contains("\"userID\":\"u1\""));
        assert!(request.contains("statsigMetadata"));
        assert!(request.contains("\"tier\":\"staging\""));
    }

    #[tokio::test]
    async fn late_fetch_still_updates_the_cache() {
        let server = ScriptedServer::start(vec![ScriptedResponse::delayed(
            &payload_with_gate("g", true),
            Duration::from_millis(300),
        )])
        .await;
        let options = server_options(&server).init_timeout(Some(Duration::from_millis(50)));
        let user = StatsigUser::with_user_id("u1");

        let started = std::time::Instant::now();
        let client = StatsigClient::initialize("client-abc", user, options)
            .await
            .unwrap();

        // Returned at the timeout, before the delayed response.
        assert!(started.elapsed() < Duration::from_millis(250));
        assert!(!client.check_gate_with_exposure_logging_disabled("g"));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(client.check_gate_with_exposure_logging_disabled("g"));
    }

    #[tokio::test]
    async fn no_updates_response_keeps_current_values() {
        let stale = serde_json::json!({
            "feature_gates": {
                hash_name("g"): {"value": false, "rule_id": "rule_0"},
            },
            "has_updates": false,
        })
        .to_string();
        let server = ScriptedServer::start(vec![
            ScriptedResponse::ok(&payload_with_gate("g", true)),
            ScriptedResponse::ok(&stale),
        ])
        .await;
        let user = StatsigUser::with_user_id("u1");

        let client = StatsigClient::initialize("client-abc", user.clone(), server_options(&server))
            .await
            .unwrap();
        assert!(client.check_gate_with_exposure_logging_disabled("g"));

        client.update_user(user).await.unwrap();

        assert_eq!(server.hit_count(), 2);
        assert!(client.check_gate_with_exposure_logging_disabled("g"));
    }

    #[tokio::test]
    async fn response_for_a_different_sdk_key_is_discarded() {
        let payload = serde_json::json!({
            "feature_gates": {
                hash_name("g"): {"value": true, "rule_id": "rule_1"},
            },
            "hashed_sdk_key_used": "not-our-key",
        })
        .to_string();
        let server = ScriptedServer::start(vec![ScriptedResponse::ok(&payload)]).await;
        let user = StatsigUser::with_user_id("u1");

        let client = StatsigClient::initialize("client-abc", user, server_options(&server))
            .await
            .unwrap();

        assert!(!client.check_gate_with_exposure_logging_disabled("g"));
    }

    #[tokio::test]
    async fn matching_hashed_sdk_key_is_accepted() {
        let payload = serde_json::json!({
            "feature_gates": {
                hash_name("g"): {"value": true, "rule_id": "rule_1"},
            },
            "hashed_sdk_key_used": djb2("client-abc"),
        })
        .to_string();
        let server = ScriptedServer::start(vec![ScriptedResponse::ok(&payload)]).await;
        let user = StatsigUser::with_user_id("u1");

        let client = StatsigClient::initialize("client-abc", user, server_options(&server))
            .await
            .unwrap();

        assert!(client.check_gate_with_exposure_logging_disabled("g"));
    }

    #[tokio::test]
    async fn update_user_resets_exposure_dedupe_and_loads_the_new_cache() {
        let user_a = StatsigUser::with_user_id("a");
        let client = StatsigClient::initialize("client-abc", user_a.clone(), offline_options())
            .await
            .unwrap();

        client.check_gate("g");
        client.update_user(StatsigUser::with_user_id("b")).await.unwrap();
        client.check_gate("g");

        let exposures = client
            .inner
            .logger
            .pending_events()
            .into_iter()
            .filter(|event| event.event_name == crate::events::GATE_EXPOSURE_EVENT)
            .count();
        assert_eq!(exposures, 2);
    }

    #[tokio::test]
    async fn layer_parameter_reads_record_exposures() {
        let payload = serde_json::json!({
            "layer_configs": {
                hash_name("layer"): {
                    "value": {"title": "hello"},
                    "rule_id": "rule_l",
                    "explicit_parameters": ["title"],
                    "allocated_experiment_name": "exp_1",
                },
            },
            "has_updates": true,
        })
        .to_string();
        let server = ScriptedServer::start(vec![ScriptedResponse::ok(&payload)]).await;
        let user = StatsigUser::with_user_id("u1");

        let client = StatsigClient::initialize("client-abc", user, server_options(&server))
            .await
            .unwrap();

        let layer = client.get_layer("layer");
        assert_eq!(layer.get("title", String::new()), "hello");
        assert_eq!(layer.get("title", String::new()), "hello"); // deduped

        let exposures: Vec<_> = client
            .inner
            .logger
            .pending_events()
            .into_iter()
            .filter(|event| event.event_name == crate::events::LAYER_EXPOSURE_EVENT)
            .collect();
        assert_eq!(exposures.len(), 1);
        let metadata = exposures[0].metadata.as_ref().unwrap();
        assert_eq!(metadata.get("config").map(String::as_str), Some("layer"));
        assert_eq!(metadata.get("parameterName").map(String::as_str), Some("title"));
        assert_eq!(metadata.get("allocatedExperiment").map(String::as_str), Some("exp_1"));
    }

    #[tokio::test]
    async fn log_event_truncates_long_names() {
        let user = StatsigUser::with_user_id("u1");
        let client = StatsigClient::initialize("client-abc", user, offline_options())
            .await
            .unwrap();

        client.log_event(&"e".repeat(100), Some(EventValue::from(7i64)), None);

        let events = client.inner.logger.pending_events();
        let event = events
            .iter()
            .find(|event| event.event_name.starts_with('e'))
            .unwrap();
        assert_eq!(event.event_name.len(), MAX_SCALAR_LENGTH);
        assert_eq!(event.value, Some(serde_json::json!(7)));
    }

    #[tokio::test]
    async fn shutdown_is_not_reentrant_and_blocks_updates() {
        let user = StatsigUser::with_user_id("u1");
        let client = StatsigClient::initialize("client-abc", user.clone(), offline_options())
            .await
            .unwrap();

        client.shutdown().await.unwrap();

        assert!(matches!(client.shutdown().await, Err(Error::ShutDown)));
        assert!(matches!(client.update_user(user).await, Err(Error::ShutDown)));
        // Lookups still answer from the cache.
        assert!(!client.check_gate("g"));
    }

    #[tokio::test]
    async fn backgrounding_flushes_buffered_events() {
        let server = ScriptedServer::start(vec![
            ScriptedResponse::status(500), // initialize; irrelevant
            ScriptedResponse::status(202),
        ])
        .await;
        let user = StatsigUser::with_user_id("u1");
        let client = StatsigClient::initialize("client-abc", user, server_options(&server))
            .await
            .unwrap();

        client.log_event("screen_view", None, None);
        client.handle_lifecycle_event(AppLifecycleEvent::Backgrounded);
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(client.inner.logger.pending(), 0);
    }
}
