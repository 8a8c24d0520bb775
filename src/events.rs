//! Telemetry events: exposures, custom events and best-effort diagnostics.
use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;

use crate::evaluation::SecondaryExposures;
use crate::user::StatsigUser;

pub(crate) const GATE_EXPOSURE_EVENT: &str = "statsig::gate_exposure";
pub(crate) const CONFIG_EXPOSURE_EVENT: &str = "statsig::config_exposure";
pub(crate) const LAYER_EXPOSURE_EVENT: &str = "statsig::layer_exposure";
pub(crate) const DIAGNOSTICS_EVENT: &str = "statsig::diagnostics";

/// Longest accepted event name or string value; longer inputs are truncated.
pub(crate) const MAX_SCALAR_LENGTH: usize = 64;
/// Metadata larger than this (summed key+value lengths) is dropped entirely.
pub(crate) const MAX_METADATA_LENGTH: usize = 1024;

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Scalar value attached to a custom event.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq)]
pub enum EventValue {
    String(String),
    Integer(i64),
    Number(f64),
}

impl From<&str> for EventValue {
    fn from(value: &str) -> EventValue {
        EventValue::String(value.to_owned())
    }
}

impl From<String> for EventValue {
    fn from(value: String) -> EventValue {
        EventValue::String(value)
    }
}

impl From<i64> for EventValue {
    fn from(value: i64) -> EventValue {
        EventValue::Integer(value)
    }
}

impl From<f64> for EventValue {
    fn from(value: f64) -> EventValue {
        EventValue::Number(value)
    }
}

impl EventValue {
    pub(crate) fn into_json(self) -> serde_json::Value {
        match self {
            EventValue::String(value) => {
                serde_json::Value::String(value.chars().take(MAX_SCALAR_LENGTH).collect())
            }
            EventValue::Integer(value) => value.into(),
            EventValue::Number(value) => value.into(),
        }
    }
}

/// A single telemetry event. The attached user is a logging copy with private
/// attributes stripped. Immutable once constructed; owned by the event buffer
/// until flushed.
#[allow(missing_docs)]
#[derive(Debug, Clone, Serialize)]
pub struct EventLog {
    #[serde(rename = "eventName")]
    pub event_name: String,
    pub user: StatsigUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    /// Creation time, epoch milliseconds.
    pub time: i64,
    #[serde(rename = "secondaryExposures", skip_serializing_if = "Option::is_none")]
    pub secondary_exposures: Option<SecondaryExposures>,
    /// Set for diagnostics events; used to dedupe repeated errors per flush.
    #[serde(skip)]
    pub(crate) error_key: Option<String>,
}

impl EventLog {
    fn base(user: &StatsigUser, event_name: impl Into<String>) -> EventLog {
        EventLog {
            event_name: event_name.into(),
            user: user.copy_for_logging(),
            metadata: None,
            value: None,
            time: now_ms(),
            secondary_exposures: None,
            error_key: None,
        }
    }

    pub(crate) fn custom(
        user: &StatsigUser,
        event_name: String,
        value: Option<serde_json::Value>,
        metadata: Option<HashMap<String, String>>,
    ) -> EventLog {
        EventLog {
            value,
            metadata: trim_metadata(metadata),
            ..EventLog::base(user, event_name)
        }
    }

    pub(crate) fn gate_exposure(
        user: &StatsigUser,
        gate_name: &str,
        value: bool,
        rule_id: &str,
        secondary_exposures: SecondaryExposures,
    ) -> EventLog {
        EventLog {
            metadata: Some(HashMap::from([
                ("gate".to_owned(), gate_name.to_owned()),
                ("gateValue".to_owned(), value.to_string()),
                ("ruleID".to_owned(), rule_id.to_owned()),
            ])),
            secondary_exposures: Some(secondary_exposures),
            ..EventLog::base(user, GATE_EXPOSURE_EVENT)
        }
    }

    pub(crate) fn config_exposure(
        user: &StatsigUser,
        config_name: &str,
        rule_id: &str,
        secondary_exposures: SecondaryExposures,
    ) -> EventLog {
        EventLog {
            metadata: Some(HashMap::from([
                ("config".to_owned(), config_name.to_owned()),
                ("ruleID".to_owned(), rule_id.to_owned()),
            ])),
            secondary_exposures: Some(secondary_exposures),
            ..EventLog::base(user, CONFIG_EXPOSURE_EVENT)
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn layer_exposure(
        user: &StatsigUser,
        layer_name: &str,
        rule_id: &str,
        allocated_experiment: &str,
        parameter_name: &str,
        is_explicit: bool,
        secondary_exposures: SecondaryExposures,
    ) -> EventLog {
        EventLog {
            metadata: Some(HashMap::from([
                ("config".to_owned(), layer_name.to_owned()),
                ("ruleID".to_owned(), rule_id.to_owned()),
                ("allocatedExperiment".to_owned(), allocated_experiment.to_owned()),
                ("parameterName".to_owned(), parameter_name.to_owned()),
                ("isExplicitParameter".to_owned(), is_explicit.to_string()),
            ])),
            secondary_exposures: Some(secondary_exposures),
            ..EventLog::base(user, LAYER_EXPOSURE_EVENT)
        }
    }

    pub(crate) fn diagnostics(user: &StatsigUser, message: String) -> EventLog {
        EventLog {
            metadata: Some(HashMap::from([("error".to_owned(), message.clone())])),
            error_key: Some(message),
            ..EventLog::base(user, DIAGNOSTICS_EVENT)
        }
    }
}

/// Drop metadata wholesale when it exceeds the size cap.
pub(crate) fn trim_metadata(
    metadata: Option<HashMap<String, String>>,
) -> Option<HashMap<String, String>> {
    let metadata = metadata?;
    let total: usize = metadata.iter().map(|(k, v)| k.len() + v.len()).sum();
    if total > MAX_METADATA_LENGTH {
        log::warn!(target: "statsig", "event metadata exceeds {MAX_METADATA_LENGTH} bytes, dropping it");
        return None;
    }
    Some(metadata)
}
