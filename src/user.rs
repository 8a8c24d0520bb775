//! User identity sent to the server for evaluation and attached to telemetry.
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::hashing::djb2;

/// A user identity. The server evaluates gates/configs/layers against this
/// identity; the client uses it only for cache-key derivation and for the
/// content hash that guards incremental fetches.
///
/// Maps use [`BTreeMap`] so serialization (and therefore [the content
/// hash](StatsigUser::content_hash) and the cache key) does not depend on
/// insertion order.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsigUser {
    /// Primary user identifier.
    #[serde(rename = "userID", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "ip", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(rename = "appVersion", skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    /// Free-form custom properties used by server-side targeting rules.
    #[serde(rename = "custom", skip_serializing_if = "BTreeMap::is_empty", default)]
    pub custom_properties: BTreeMap<String, serde_json::Value>,
    /// Named alternative identifiers (e.g. `employeeID`). Part of the cache
    /// key.
    #[serde(rename = "customIDs", skip_serializing_if = "BTreeMap::is_empty", default)]
    pub custom_ids: BTreeMap<String, String>,
    /// Properties used for targeting but never forwarded with telemetry.
    #[serde(
        rename = "privateAttributes",
        skip_serializing_if = "BTreeMap::is_empty",
        default
    )]
    pub private_attributes: BTreeMap<String, serde_json::Value>,
    /// Environment tags injected from [`ClientOptions`](crate::ClientOptions).
    #[serde(
        rename = "statsigEnvironment",
        skip_serializing_if = "HashMap::is_empty",
        default
    )]
    pub(crate) statsig_environment: HashMap<String, String>,
}

impl StatsigUser {
    /// Create a user with the given primary identifier.
    pub fn with_user_id(user_id: impl Into<String>) -> StatsigUser {
        StatsigUser {
            user_id: Some(user_id.into()),
            ..StatsigUser::default()
        }
    }

    /// Add a custom property.
    pub fn custom_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> StatsigUser {
        self.custom_properties.insert(key.into(), value.into());
        self
    }

    /// Add a named custom identifier.
    pub fn custom_id(mut self, id_type: impl Into<String>, value: impl Into<String>) -> StatsigUser {
        self.custom_ids.insert(id_type.into(), value.into());
        self
    }

    /// Add a private attribute. Private attributes are sent to the server for
    /// evaluation but stripped from every logged event.
    pub fn private_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> StatsigUser {
        self.private_attributes.insert(key.into(), value.into());
        self
    }

    /// Hash of the full identity (private attributes included). A cached
    /// payload is only incrementally extensible for an identity with the same
    /// hash.
    pub(crate) fn content_hash(&self) -> String {
        // Serialization of a StatsigUser cannot fail: all values are
        // serde_json values or strings.
        let json = serde_json::to_string(self).expect("user should always serialize");
        djb2(&json)
    }

    /// A copy safe to attach to telemetry: identical identity minus private
    /// attributes.
    pub(crate) fn copy_for_logging(&self) -> StatsigUser {
        let mut copy = self.clone();
        copy.private_attributes = BTreeMap::new();
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_ignores_insertion_order() {
        let a = StatsigUser::with_user_id("user-1")
            .custom_id("companyID", "c1")
            .custom_id("employeeID", "e1");
        let b = StatsigUser::with_user_id("user-1")
            .custom_id("employeeID", "e1")
            .custom_id("companyID", "c1");

        assert_eq!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn content_hash_covers_private_attributes() {
        let base = StatsigUser::with_user_id("user-1");
        let with_private = StatsigUser::with_user_id("user-1").private_attribute("plan", "pro");

        assert_ne!(base.content_hash(), with_private.content_hash());
    }

    #[test]
    fn logging_copy_strips_private_attributes_only() {
        let user = StatsigUser::with_user_id("user-1")
            .custom_property("beta", true)
            .private_attribute("email_hash", "abc");

        let copy = user.copy_for_logging();

        assert!(copy.private_attributes.is_empty());
        assert_eq!(copy.user_id, user.user_id);
        assert_eq!(copy.custom_properties, user.custom_properties);
    }
}
