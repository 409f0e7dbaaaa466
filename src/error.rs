//! Error types shared by transports, the offline cache and preferences.

use std::fmt;
use std::sync::Arc;

/// What: Failure modes for local persistence (offline cache, preferences, window state).
///
/// Inputs: Produced by the JSON/disk helpers in `index::persist`, `prefs` and `app::window`.
///
/// Output: Implements `Display`/`Error` for ergonomic propagation.
///
/// Details:
/// - Callers log these and keep running on in-memory state; none are fatal.
#[derive(Debug)]
pub enum StoreError {
    /// I/O error while reading or writing a file.
    Io(std::io::Error),
    /// JSON (de)serialization failure.
    Json(serde_json::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// What: A fetch failed at the transport level (registry, list call or offline cache).
///
/// Inputs: Produced by [`crate::sources::PackageSource`] implementations and the
/// offline-cache loader.
///
/// Output: Delivered as the failure value of an operation's completion; never thrown.
///
/// Details:
/// - `Clone` so the same failure can be fanned out to every observer through
///   `Signal::OperationFinished`. Non-cloneable sources are wrapped in `Arc`.
#[derive(Debug, Clone)]
pub enum TransportError {
    /// The HTTP request itself failed (connect, TLS, timeout at transport level).
    Http(Arc<reqwest::Error>),
    /// The registry answered with a non-success status.
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code returned.
        status: u16,
    },
    /// Response body could not be decoded into package records.
    Decode(String),
    /// Loading the offline cache failed.
    Cache(Arc<StoreError>),
    /// The background task running the fetch died before reporting.
    Worker(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(err) => write!(f, "request failed: {err}"),
            Self::Status { url, status } => write!(f, "{url} returned HTTP {status}"),
            Self::Decode(msg) => write!(f, "invalid registry response: {msg}"),
            Self::Cache(err) => write!(f, "offline cache unavailable: {err}"),
            Self::Worker(msg) => write!(f, "fetch task failed: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(err) => Some(err.as_ref()),
            Self::Cache(err) => Some(err.as_ref()),
            Self::Status { .. } | Self::Decode(_) | Self::Worker(_) => None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::Decode(value.to_string());
        }
        Self::Http(Arc::new(value))
    }
}

impl From<StoreError> for TransportError {
    fn from(value: StoreError) -> Self {
        Self::Cache(Arc::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: Check the human-readable rendering used by the status line.
    ///
    /// Inputs:
    /// - A `Status` and a `Cache` transport error.
    ///
    /// Output:
    /// - Messages mention the URL/status and wrap the underlying cache error.
    fn transport_error_messages_are_readable() {
        let status = TransportError::Status {
            url: "http://registry/packages".into(),
            status: 503,
        };
        assert_eq!(status.to_string(), "http://registry/packages returned HTTP 503");

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let cache: TransportError = StoreError::from(io).into();
        assert!(cache.to_string().starts_with("offline cache unavailable: I/O error"));
        assert!(std::error::Error::source(&cache).is_some());
    }
}
