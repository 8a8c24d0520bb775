use std::sync::Arc;

/// Result type used throughout the SDK, with [`Error`] as the error variant.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur in the SDK.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The SDK key is empty or whitespace-only.
    #[error("sdk key cannot be empty")]
    EmptySdkKey,

    /// The SDK key does not look like a client key. Server keys must never be
    /// embedded in client applications.
    #[error("invalid sdk key: expected a key starting with \"client-\" or \"test-\"")]
    InvalidSdkKey,

    /// Invalid API or logging API base URL configuration.
    #[error("invalid base url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// The client has been shut down and no longer accepts this operation.
    #[error("client has been shut down")]
    ShutDown,

    /// The server responded with a non-success, non-retryable status, or
    /// retries were exhausted.
    #[error("server returned unexpected status code {0}")]
    UnexpectedStatus(reqwest::StatusCode),

    /// An I/O error.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),

    /// Network error.
    #[error(transparent)]
    Network(Arc<reqwest::Error>),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}
