//! Internal error types for sync operations.
//!
//! Mapped to [`RepositoryError::Remote`] at the port boundary.

use rehearse_core::RepositoryError;
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors related to the remote progress service.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Request failed with an HTTP error status.
    #[error("Sync request failed with status {status}: {url}")]
    RequestFailed {
        /// HTTP status code
        status: u16,
        /// The URL that was requested
        url: String,
    },

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The base URL cannot carry path segments (e.g. `mailto:`).
    #[error("Base URL cannot be extended: {0}")]
    UnsupportedBaseUrl(String),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl From<SyncError> for RepositoryError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::JsonParse(e) => Self::Serialization(e.to_string()),
            other => Self::Remote(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_maps_to_remote() {
        let err: RepositoryError = SyncError::RequestFailed {
            status: 503,
            url: "https://sync.example/progress/a".into(),
        }
        .into();
        assert!(matches!(err, RepositoryError::Remote(m) if m.contains("503")));
    }
}
