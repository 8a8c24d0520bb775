//! Server-evaluated results: feature gates, dynamic configs and layers.
//!
//! These types are plain data handed down from the server; the client never
//! evaluates rules itself. A missing or unparseable entry is represented by a
//! typed empty default (`value = false` / `{}`, `rule_id = ""`) so flag
//! lookups can never fail the caller.
use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Exposure contexts of upstream dependencies, forwarded verbatim with the
/// primary exposure for attribution.
pub type SecondaryExposures = Vec<HashMap<String, String>>;

/// `TryParse` allows a single entry to fail parsing without failing the whole
/// payload. If the server starts sending a new format for one gate, the other
/// gates are still usable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum TryParse<T> {
    Parsed(T),
    ParseFailed(serde_json::Value),
}

impl<T> From<TryParse<T>> for Option<T> {
    fn from(value: TryParse<T>) -> Option<T> {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}

/// A named boolean flag result, with the rule id explaining how the server
/// evaluated it.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureGate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: bool,
    #[serde(default)]
    pub rule_id: String,
    #[serde(default)]
    pub secondary_exposures: SecondaryExposures,
}

impl FeatureGate {
    /// The empty default returned for unknown gates.
    pub(crate) fn empty(name: &str) -> FeatureGate {
        FeatureGate {
            name: name.to_owned(),
            ..FeatureGate::default()
        }
    }
}

/// A named key-value parameter set with a rule id. Experiments are dynamic
/// configs with additional allocation fields.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub rule_id: String,
    #[serde(default)]
    pub secondary_exposures: SecondaryExposures,
    #[serde(default)]
    pub explicit_parameters: Vec<String>,
    #[serde(default)]
    pub is_in_layer: bool,
    #[serde(default)]
    pub is_user_in_experiment: bool,
    #[serde(default, rename = "passed")]
    pub rule_passed: bool,
}

impl DynamicConfig {
    pub(crate) fn empty(name: &str) -> DynamicConfig {
        DynamicConfig {
            name: name.to_owned(),
            ..DynamicConfig::default()
        }
    }

    /// Get a typed parameter value, falling back to `default` when the key is
    /// missing or the value does not convert to `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        get_typed(&self.value, key, default)
    }
}

/// Exposure hook invoked when a layer parameter is read.
type LayerExposureHook = Arc<dyn Fn(&Layer, &str) + Send + Sync>;

/// A named group of parameters. Each parameter is attributable either to an
/// allocated experiment (explicit parameter) or to the layer's undelegated
/// default, with distinct exposure semantics: reading a parameter through
/// [`Layer::get`] records a parameter-level exposure.
#[allow(missing_docs)]
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Layer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub rule_id: String,
    #[serde(default)]
    pub secondary_exposures: SecondaryExposures,
    #[serde(default)]
    pub undelegated_secondary_exposures: SecondaryExposures,
    #[serde(default)]
    pub explicit_parameters: Vec<String>,
    #[serde(default)]
    pub allocated_experiment_name: String,
    #[serde(skip)]
    pub(crate) on_exposure: Option<LayerExposureHook>,
}

impl Layer {
    pub(crate) fn empty(name: &str) -> Layer {
        Layer {
            name: name.to_owned(),
            ..Layer::default()
        }
    }

    /// Get a typed parameter value, falling back to `default` when the key is
    /// missing or the value does not convert to `T`.
    ///
    /// A successful read is an observable evaluation: it records a
    /// parameter-level exposure (unless the layer was fetched with exposure
    /// logging disabled).
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let Some(raw) = self.value.get(key) else {
            return default;
        };
        match serde_json::from_value(raw.clone()) {
            Ok(value) => {
                if let Some(on_exposure) = &self.on_exposure {
                    on_exposure(self, key);
                }
                value
            }
            Err(_) => default,
        }
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("rule_id", &self.rule_id)
            .field("allocated_experiment_name", &self.allocated_experiment_name)
            .field("explicit_parameters", &self.explicit_parameters)
            .finish_non_exhaustive()
    }
}

fn get_typed<T: DeserializeOwned>(
    map: &HashMap<String, serde_json::Value>,
    key: &str,
    default: T,
) -> T {
    match map.get(key) {
        Some(raw) => serde_json::from_value(raw.clone()).unwrap_or(default),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn config_get_coerces_or_falls_back() {
        let config: DynamicConfig = serde_json::from_value(serde_json::json!({
            "value": {"count": 3, "label": "on", "flaky": "not-a-number"},
            "rule_id": "rule_1",
        }))
        .unwrap();

        assert_eq!(config.get("count", 0i64), 3);
        assert_eq!(config.get("label", String::new()), "on");
        // wrong type falls back to the default
        assert_eq!(config.get("flaky", 7i64), 7);
        // missing key falls back to the default
        assert_eq!(config.get("missing", true), true);
    }

    #[test]
    fn unparseable_entry_becomes_none() {
        let parsed: TryParse<FeatureGate> =
            serde_json::from_value(serde_json::json!({"value": "not-a-bool"})).unwrap();
        assert!(Option::<FeatureGate>::from(parsed).is_none());

        let parsed: TryParse<FeatureGate> =
            serde_json::from_value(serde_json::json!({"value": true, "rule_id": "r"})).unwrap();
        let gate = Option::<FeatureGate>::from(parsed).unwrap();
        assert!(gate.value);
        assert_eq!(gate.rule_id, "r");
    }

    #[test]
    fn layer_get_fires_exposure_hook_on_successful_reads_only() {
        let exposures = Arc::new(AtomicUsize::new(0));
        let mut layer: Layer = serde_json::from_value(serde_json::json!({
            "value": {"title": "hello", "count": 2},
            "rule_id": "rule_l",
        }))
        .unwrap();
        let counter = exposures.clone();
        layer.on_exposure = Some(Arc::new(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(layer.get("title", String::new()), "hello");
        assert_eq!(layer.get("missing", 0i64), 0);
        assert_eq!(layer.get("title", 0i64), 0); // type mismatch, no exposure

        assert_eq!(exposures.load(Ordering::SeqCst), 1);
    }
}
