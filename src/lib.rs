//! A Rust client SDK for Statsig-style server-evaluated feature gates,
//! dynamic configs, experiments and layers.
//!
//! # Overview
//!
//! The SDK revolves around a [`StatsigClient`] created for one
//! [`StatsigUser`]. All evaluation happens on the server: the client fetches
//! the user's pre-evaluated results with a single `initialize` request, keeps
//! them in a durable per-user cache, and answers every lookup locally from
//! that cache. Lookups are synchronous, infallible and never panic: an
//! unknown name returns a typed empty default ([`FeatureGate`] off,
//! [`DynamicConfig`]/[`Layer`] empty).
//!
//! ```no_run
//! # use statsig_client::{ClientOptions, StatsigClient, StatsigUser};
//! # async fn test() -> statsig_client::Result<()> {
//! let user = StatsigUser::with_user_id("user-1").custom_property("beta", true);
//! let client = StatsigClient::initialize("client-KEY", user, ClientOptions::new()).await?;
//!
//! if client.check_gate("new_onboarding") {
//!     // ...
//! }
//! let config = client.get_config("pricing");
//! let price = config.get("monthly_price", 9.99);
//!
//! client.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Telemetry
//!
//! Every lookup records an exposure event attributing the result the user
//! saw. Identical exposures are deduplicated for ten minutes; events are
//! buffered and delivered in batches, on a timer, when the buffer fills, and
//! on [`StatsigClient::shutdown`]. Use the `_with_exposure_logging_disabled`
//! lookup variants for diagnostics code that must not generate exposures.
//!
//! # Persistence
//!
//! By default results live in memory only. Provide a [`StorageBackend`]
//! (e.g. [`FileStorage`]) through [`ClientOptions::storage`] to persist
//! results and the install-scoped stable id across restarts, so a relaunch
//! starts from the last fetched values instead of defaults.
//!
//! # Error handling
//!
//! Errors are represented by the [`Error`] enum. Only misuse and
//! configuration problems surface as errors; network failure is an expected
//! condition the client absorbs by serving cached values.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for
//! logging messages, all under the `statsig` target. Consider integrating a
//! `log`-compatible logger implementation for better visibility into SDK
//! operations.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod client;
mod dispatcher;
mod error;
mod evaluation;
mod event_logger;
mod events;
mod hashing;
mod options;
mod sdk_metadata;
mod storage;
mod store;
mod user;

#[cfg(test)]
mod test_server;

pub use client::{AppLifecycleEvent, StatsigClient};
pub use error::{Error, Result};
pub use evaluation::{DynamicConfig, FeatureGate, Layer, SecondaryExposures};
pub use events::{EventLog, EventValue};
pub use options::ClientOptions;
pub use storage::{FileStorage, InMemoryStorage, StorageBackend};
pub use user::StatsigUser;
