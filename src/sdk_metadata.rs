//! SDK/device metadata attached to every request.
use serde::Serialize;

pub(crate) const SDK_TYPE: &str = "rust-client";
pub(crate) const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The `statsigMetadata` block sent with `initialize` and `log_event` bodies.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct StatsigMetadata {
    /// Random id scoped to this client instance.
    #[serde(rename = "sessionID")]
    pub session_id: String,
    /// Durable install-scoped id from the result cache.
    #[serde(rename = "stableID")]
    pub stable_id: String,
    #[serde(rename = "sdkType")]
    pub sdk_type: &'static str,
    #[serde(rename = "sdkVersion")]
    pub sdk_version: &'static str,
    #[serde(rename = "systemName")]
    pub system_name: &'static str,
}

impl StatsigMetadata {
    pub(crate) fn new(stable_id: String) -> StatsigMetadata {
        StatsigMetadata {
            session_id: uuid::Uuid::new_v4().to_string(),
            stable_id,
            sdk_type: SDK_TYPE,
            sdk_version: SDK_VERSION,
            system_name: std::env::consts::OS,
        }
    }
}
