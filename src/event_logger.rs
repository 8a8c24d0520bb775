//! Exposure deduplication and the buffered telemetry pipeline.
//!
//! Events accumulate in an in-memory buffer that is flushed when it reaches a
//! size threshold, on a periodic timer, on lifecycle triggers, and on
//! shutdown. A flush atomically swaps the buffer for an empty one, so events
//! enqueued during network I/O land in the new buffer, never lost and never
//! sent twice. A failed flush drops its snapshot: telemetry is best-effort and must
//! not grow without bound during an outage.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::dispatcher::{RequestDispatcher, DEFAULT_BACKOFF};
use crate::evaluation::{DynamicConfig, FeatureGate, Layer};
use crate::events::{now_ms, EventLog};
use crate::sdk_metadata::StatsigMetadata;
use crate::user::StatsigUser;

/// Repeated identical exposures within this window are logged once.
const DEDUPE_WINDOW_MS: i64 = 600 * 1000;

#[derive(Serialize)]
struct LogEventRequest<'a> {
    #[serde(rename = "statsigMetadata")]
    statsig_metadata: &'a StatsigMetadata,
    events: Vec<EventLog>,
}

/// Cheap-to-clone handle around the shared logger state; clones feed the
/// periodic flush task and layer exposure hooks.
#[derive(Clone)]
pub(crate) struct EventLogger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    dispatcher: Arc<RequestDispatcher>,
    metadata: StatsigMetadata,
    max_queue_size: usize,
    flush_retries: u32,
    /// Handle captured at construction so size-triggered flushes can be
    /// spawned from synchronous lookup paths on any thread.
    runtime: tokio::runtime::Handle,
    queue: Mutex<Vec<EventLog>>,
    logged_exposures: Mutex<HashMap<String, i64>>,
    /// Diagnostics already enqueued since the last flush; keeps a repeating
    /// error from flooding the buffer.
    errors_logged: Mutex<HashSet<String>>,
    flush_task: Mutex<Option<JoinHandle<()>>>,
}

impl EventLogger {
    /// Must be called within a tokio runtime.
    pub(crate) fn new(
        dispatcher: Arc<RequestDispatcher>,
        metadata: StatsigMetadata,
        max_queue_size: usize,
        flush_retries: u32,
    ) -> EventLogger {
        EventLogger {
            inner: Arc::new(LoggerInner {
                dispatcher,
                metadata,
                max_queue_size,
                flush_retries,
                runtime: tokio::runtime::Handle::current(),
                queue: Mutex::new(Vec::new()),
                logged_exposures: Mutex::new(HashMap::new()),
                errors_logged: Mutex::new(HashSet::new()),
                flush_task: Mutex::new(None),
            }),
        }
    }

    /// Start the repeating flush timer. Cancelled by
    /// [`EventLogger::shutdown`].
    pub(crate) fn start_periodic_flush(&self, interval: Duration) {
        let logger = self.clone();
        let handle = self.inner.runtime.spawn(async move {
            let mut timer = tokio::time::interval(interval);
            // The first tick completes immediately; skip it.
            timer.tick().await;
            loop {
                timer.tick().await;
                logger.flush(false).await;
            }
        });
        let mut slot = self
            .inner
            .flush_task
            .lock()
            .expect("thread holding flush task lock should not panic");
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn stop_periodic_flush(&self) {
        let handle = self
            .inner
            .flush_task
            .lock()
            .expect("thread holding flush task lock should not panic")
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    /// Record a gate exposure for `user`, unless an identical exposure was
    /// logged within the dedupe window.
    pub(crate) fn log_gate_exposure(&self, user: &StatsigUser, gate_name: &str, gate: &FeatureGate) {
        let dedupe_key = format!("gate:{gate_name}:{}:{}", gate.rule_id, gate.value);
        if !self.should_log_exposure(&dedupe_key) {
            return;
        }
        self.enqueue(EventLog::gate_exposure(
            user,
            gate_name,
            gate.value,
            &gate.rule_id,
            gate.secondary_exposures.clone(),
        ));
    }

    pub(crate) fn log_config_exposure(
        &self,
        user: &StatsigUser,
        config_name: &str,
        config: &DynamicConfig,
    ) {
        let dedupe_key = format!("config:{config_name}:{}", config.rule_id);
        if !self.should_log_exposure(&dedupe_key) {
            return;
        }
        self.enqueue(EventLog::config_exposure(
            user,
            config_name,
            &config.rule_id,
            config.secondary_exposures.clone(),
        ));
    }

    /// Record a parameter-level layer exposure. Explicit parameters are
    /// attributed to the allocated experiment; undelegated parameters carry
    /// the undelegated exposure chain and no experiment.
    pub(crate) fn log_layer_exposure(
        &self,
        user: &StatsigUser,
        layer_name: &str,
        layer: &Layer,
        parameter_name: &str,
    ) {
        let is_explicit = layer
            .explicit_parameters
            .iter()
            .any(|parameter| parameter == parameter_name);
        let (allocated_experiment, secondary_exposures) = if is_explicit {
            (
                layer.allocated_experiment_name.as_str(),
                layer.secondary_exposures.clone(),
            )
        } else {
            ("", layer.undelegated_secondary_exposures.clone())
        };

        let dedupe_key = format!(
            "config:{layer_name}:{}:{allocated_experiment}:{parameter_name}:{is_explicit}",
            layer.rule_id,
        );
        if !self.should_log_exposure(&dedupe_key) {
            return;
        }
        self.enqueue(EventLog::layer_exposure(
            user,
            layer_name,
            &layer.rule_id,
            allocated_experiment,
            parameter_name,
            is_explicit,
            secondary_exposures,
        ));
    }

    /// Best-effort diagnostics; deduped per flush by message.
    pub(crate) fn log_diagnostics(&self, user: &StatsigUser, message: String) {
        self.enqueue(EventLog::diagnostics(user, message));
    }

    fn should_log_exposure(&self, dedupe_key: &str) -> bool {
        self.should_log_exposure_at(dedupe_key, now_ms())
    }

    fn should_log_exposure_at(&self, dedupe_key: &str, now: i64) -> bool {
        let mut logged = self
            .inner
            .logged_exposures
            .lock()
            .expect("thread holding exposure lock should not panic");
        if let Some(&last) = logged.get(dedupe_key) {
            if last >= now - DEDUPE_WINDOW_MS {
                return false;
            }
        }
        logged.insert(dedupe_key.to_owned(), now);
        true
    }

    /// Forget all dedupe state. Called on user switch: the new user's
    /// identical-looking exposures must log again.
    pub(crate) fn reset_exposure_dedupe(&self) {
        self.inner
            .logged_exposures
            .lock()
            .expect("thread holding exposure lock should not panic")
            .clear();
    }

    /// Append an event; reaching the size threshold triggers an asynchronous
    /// flush that never blocks the caller.
    pub(crate) fn enqueue(&self, event: EventLog) {
        let should_flush = {
            let mut queue = self
                .inner
                .queue
                .lock()
                .expect("thread holding event queue lock should not panic");
            if let Some(error_key) = &event.error_key {
                let mut errors = self
                    .inner
                    .errors_logged
                    .lock()
                    .expect("thread holding error dedupe lock should not panic");
                if !errors.insert(error_key.clone()) {
                    return;
                }
            }
            queue.push(event);
            queue.len() >= self.inner.max_queue_size
        };
        if should_flush {
            self.flush_async();
        }
    }

    /// Spawn a flush without waiting for it.
    pub(crate) fn flush_async(&self) {
        let logger = self.clone();
        self.inner.runtime.spawn(async move {
            logger.flush(false).await;
        });
    }

    /// Drain the buffer into one batch request. The swap is a single exchange
    /// under the queue lock, so an event belongs to exactly one batch. With
    /// `is_shutdown` the dispatch gets no retries, since the process may be
    /// exiting.
    pub(crate) async fn flush(&self, is_shutdown: bool) {
        let events = {
            let mut queue = self
                .inner
                .queue
                .lock()
                .expect("thread holding event queue lock should not panic");
            if queue.is_empty() {
                return;
            }
            std::mem::take(&mut *queue)
        };
        self.inner
            .errors_logged
            .lock()
            .expect("thread holding error dedupe lock should not panic")
            .clear();

        let count = events.len();
        let body = LogEventRequest {
            statsig_metadata: &self.inner.metadata,
            events,
        };
        let retries = if is_shutdown { 0 } else { self.inner.flush_retries };
        match self
            .inner
            .dispatcher
            .post_logging("log_event", &body, retries, DEFAULT_BACKOFF)
            .await
        {
            Ok(_) => log::debug!(target: "statsig", "flushed {count} events"),
            Err(err) => {
                log::warn!(target: "statsig", "dropping {count} events after failed flush: {err}")
            }
        }
    }

    /// Cancel the periodic timer, then drain synchronously. The order matters:
    /// a timer firing mid-drain would race the final flush.
    pub(crate) async fn shutdown(&self) {
        self.stop_periodic_flush();
        self.flush(true).await;
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.inner.queue.lock().unwrap().len()
    }

    #[cfg(test)]
    pub(crate) fn pending_events(&self) -> Vec<EventLog> {
        self.inner.queue.lock().unwrap().clone()
    }
}
