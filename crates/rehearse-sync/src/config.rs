//! Public configuration for the sync client.

use std::time::Duration;

/// Configuration for the progress sync client.
///
/// # Example
///
/// ```
/// use rehearse_sync::SyncClientConfig;
/// use std::time::Duration;
///
/// let config = SyncClientConfig::new("https://sync.example.com/api")
///     .with_timeout(Duration::from_secs(5))
///     .with_token("secret");
/// ```
#[derive(Debug, Clone)]
pub struct SyncClientConfig {
    /// Base URL; `/progress/{key}` is appended.
    pub(crate) base_url: String,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Request timeout
    pub(crate) timeout: Duration,
    /// Optional bearer token
    pub(crate) token: Option<String>,
}

impl SyncClientConfig {
    /// Create a configuration for the service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: concat!("rehearse-sync/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(10),
            token: None,
        }
    }

    /// Set the user agent string for HTTP requests.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    ///
    /// Defaults to 10 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a bearer token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set an optional bearer token.
    #[must_use]
    pub fn with_optional_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncClientConfig::new("https://sync.example");
        assert_eq!(config.base_url, "https://sync.example");
        assert!(config.user_agent.starts_with("rehearse-sync/"));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.token.is_none());
    }

    #[test]
    fn test_optional_token() {
        let with_token =
            SyncClientConfig::new("https://sync.example").with_optional_token(Some("t".into()));
        assert_eq!(with_token.token.as_deref(), Some("t"));
    }
}
