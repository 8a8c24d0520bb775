//! Durable per-user result cache.
//!
//! [`ResultCache`] owns the last successfully applied `initialize` payload for
//! the current user, keyed by a deterministic cache key derived from the
//! identity. The in-memory payload is only ever replaced wholesale; readers
//! get clones and are never affected by a concurrent update.
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Deserialize;
use tokio::sync::mpsc;

use crate::evaluation::{DynamicConfig, FeatureGate, Layer, TryParse};
use crate::storage::StorageBackend;
use crate::user::StatsigUser;

const STABLE_ID_KEY: &str = "statsig::stableID";
const USER_VALUES_KEY_PREFIX: &str = "statsig::userValues-";

/// Wire format of the `initialize` response. Individual entries are wrapped in
/// [`TryParse`] so one malformed entry cannot poison the payload.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct InitializeResponse {
    #[serde(default)]
    pub feature_gates: HashMap<String, TryParse<FeatureGate>>,
    #[serde(default)]
    pub dynamic_configs: HashMap<String, TryParse<DynamicConfig>>,
    #[serde(default)]
    pub layer_configs: HashMap<String, TryParse<Layer>>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub derived_fields: Option<HashMap<String, String>>,
    #[serde(default)]
    pub user_hash: Option<String>,
    #[serde(default)]
    pub has_updates: Option<bool>,
    #[serde(default)]
    pub hashed_sdk_key_used: Option<String>,
}

/// Parsed evaluation payload. Owned exclusively by [`ResultCache`] and
/// replaced atomically on each applied fetch.
#[derive(Debug, Default)]
struct CachedValues {
    gates: HashMap<String, FeatureGate>,
    configs: HashMap<String, DynamicConfig>,
    layers: HashMap<String, Layer>,
    time: Option<i64>,
    derived_fields: Option<HashMap<String, String>>,
    user_hash: Option<String>,
}

impl CachedValues {
    fn parse(raw: &str) -> Result<CachedValues, serde_json::Error> {
        serde_json::from_str::<InitializeResponse>(raw).map(CachedValues::from_response)
    }

    fn from_response(response: InitializeResponse) -> CachedValues {
        fn collect<T>(entries: HashMap<String, TryParse<T>>, set_name: impl Fn(&mut T, &str)) -> HashMap<String, T> {
            entries
                .into_iter()
                .filter_map(|(key, entry)| match Option::<T>::from(entry) {
                    Some(mut value) => {
                        set_name(&mut value, &key);
                        Some((key, value))
                    }
                    None => {
                        log::debug!(target: "statsig", "skipping unparseable entry {key:?}");
                        None
                    }
                })
                .collect()
        }

        CachedValues {
            gates: collect(response.feature_gates, |gate, key| gate.name = key.to_owned()),
            configs: collect(response.dynamic_configs, |config, key| {
                config.name = key.to_owned()
            }),
            layers: collect(response.layer_configs, |layer, key| layer.name = key.to_owned()),
            time: response.time,
            derived_fields: response.derived_fields,
            user_hash: response.user_hash,
        }
    }
}

/// How persisted writes are scheduled.
enum PersistWriter {
    /// Write on the calling path.
    Sync,
    /// Hand writes to a single background task. One consumer means persisted
    /// writes keep call order, so a slow write can never clobber a later one.
    Background(mpsc::UnboundedSender<(String, String)>),
}

struct CacheInner {
    current_key: String,
    values: CachedValues,
}

pub(crate) struct ResultCache {
    storage: Arc<dyn StorageBackend>,
    stable_id: String,
    writer: PersistWriter,
    inner: RwLock<CacheInner>,
}

impl ResultCache {
    /// Open the cache for `user`: resolve the stable id (generated once,
    /// reused forever), then load and parse any persisted payload for the
    /// derived cache key. Never fails; corrupt state is evicted instead.
    ///
    /// With `background_writes`, must be called within a tokio runtime.
    pub(crate) fn open(
        storage: Arc<dyn StorageBackend>,
        background_writes: bool,
        user: &StatsigUser,
    ) -> ResultCache {
        let stable_id = match storage.get(STABLE_ID_KEY) {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                if let Err(err) = storage.set(STABLE_ID_KEY, &id) {
                    log::warn!(target: "statsig", "failed to persist stable id: {err}");
                }
                id
            }
        };

        let writer = if background_writes {
            let (sender, mut receiver) = mpsc::unbounded_channel::<(String, String)>();
            let storage = Arc::clone(&storage);
            tokio::spawn(async move {
                while let Some((key, value)) = receiver.recv().await {
                    if let Err(err) = storage.set(&key, &value) {
                        log::warn!(target: "statsig", "background cache write failed: {err}");
                    }
                }
            });
            PersistWriter::Background(sender)
        } else {
            PersistWriter::Sync
        };

        let cache = ResultCache {
            storage,
            stable_id,
            writer,
            inner: RwLock::new(CacheInner {
                current_key: String::new(),
                values: CachedValues::default(),
            }),
        };
        cache.load_user(user);
        cache
    }

    /// Point the cache at `user`: derive the cache key and load the persisted
    /// payload for it, evicting the entry if it fails to parse.
    pub(crate) fn load_user(&self, user: &StatsigUser) {
        let key = self.cache_key(user);
        let values = match self.storage.get(&key) {
            Some(raw) => match CachedValues::parse(&raw) {
                Ok(values) => values,
                Err(err) => {
                    log::warn!(target: "statsig", "evicting unparseable cached payload: {err}");
                    if let Err(err) = self.storage.remove(&key) {
                        log::warn!(target: "statsig", "failed to evict cached payload: {err}");
                    }
                    CachedValues::default()
                }
            },
            None => CachedValues::default(),
        };

        let mut inner = self
            .inner
            .write()
            .expect("thread holding cache lock should not panic");
        *inner = CacheInner {
            current_key: key,
            values,
        };
    }

    /// Deterministic cache key: a pure function of the identity (userID and
    /// sorted customIDs) plus the install-scoped stable id.
    pub(crate) fn cache_key(&self, user: &StatsigUser) -> String {
        let mut key = format!(
            "{USER_VALUES_KEY_PREFIX}userID:{};stableID:{}",
            user.user_id.as_deref().unwrap_or(""),
            self.stable_id,
        );
        // custom_ids is a BTreeMap, so iteration is already sorted by id type.
        for (id_type, value) in &user.custom_ids {
            key.push_str(&format!(";{id_type}:{value}"));
        }
        key
    }

    pub(crate) fn stable_id(&self) -> &str {
        &self.stable_id
    }

    pub(crate) fn gate(&self, name: &str) -> Option<FeatureGate> {
        self.read().values.gates.get(name).cloned()
    }

    pub(crate) fn config(&self, name: &str) -> Option<DynamicConfig> {
        self.read().values.configs.get(name).cloned()
    }

    pub(crate) fn layer(&self, name: &str) -> Option<Layer> {
        self.read().values.layers.get(name).cloned()
    }

    /// The loaded payload's server clock, but only if the payload was produced
    /// for an identity with the same content hash. A payload fetched for a
    /// different identity must never be treated as incrementally extensible.
    pub(crate) fn since_time(&self, user: &StatsigUser) -> Option<i64> {
        let inner = self.read();
        if inner.values.user_hash.as_deref() == Some(user.content_hash().as_str()) {
            inner.values.time
        } else {
            None
        }
    }

    /// Server-supplied derived fields to echo back on the next fetch, guarded
    /// by the same identity hash as [`ResultCache::since_time`].
    pub(crate) fn derived_fields(&self, user: &StatsigUser) -> Option<HashMap<String, String>> {
        let inner = self.read();
        if inner.values.user_hash.as_deref() == Some(user.content_hash().as_str()) {
            inner.values.derived_fields.clone()
        } else {
            None
        }
    }

    /// Apply a fetched payload: swap the in-memory values if `user` is still
    /// the loaded identity, and persist the raw payload under `user`'s cache
    /// key either inline or through the background writer.
    pub(crate) fn update(&self, user: &StatsigUser, raw: String, response: InitializeResponse) {
        let mut values = CachedValues::from_response(response);
        // If the server did not echo a user hash, attribute the payload to
        // the identity that requested it so a same-session refetch stays
        // incremental.
        if values.user_hash.is_none() {
            values.user_hash = Some(user.content_hash());
        }

        let key = self.cache_key(user);
        {
            let mut inner = self
                .inner
                .write()
                .expect("thread holding cache lock should not panic");
            if inner.current_key == key {
                inner.values = values;
            }
        }

        match &self.writer {
            PersistWriter::Sync => {
                if let Err(err) = self.storage.set(&key, &raw) {
                    log::warn!(target: "statsig", "failed to persist cached payload: {err}");
                }
            }
            PersistWriter::Background(sender) => {
                // Error means the writer task is gone; nothing useful to do.
                let _ = sender.send((key, raw));
            }
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, CacheInner> {
        self.inner
            .read()
            .expect("thread holding cache lock should not panic")
    }
}
