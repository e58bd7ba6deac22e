//! HTTP backend abstraction for the sync service.
//!
//! A trait-based backend so the client can be tested without a server. The
//! production implementation uses reqwest; requests are attempted once.

use async_trait::async_trait;
use url::Url;

use crate::config::SyncClientConfig;
use crate::error::{SyncError, SyncResult};

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Trait for HTTP backends that exchange JSON documents.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// `PUT` a JSON body.
    async fn put_json(&self, url: &Url, body: &serde_json::Value) -> SyncResult<()>;

    /// `GET` a JSON body. `404` yields `None`.
    async fn get_json(&self, url: &Url) -> SyncResult<Option<serde_json::Value>>;
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production HTTP backend using reqwest.
pub struct ReqwestBackend {
    client: reqwest::Client,
    auth_token: Option<String>,
}

impl ReqwestBackend {
    pub fn new(config: &SyncClientConfig) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            auth_token: config.token.clone(),
        })
    }

    /// Attach authentication when configured.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn status_error(status: reqwest::StatusCode, url: &Url) -> SyncError {
    SyncError::RequestFailed {
        status: status.as_u16(),
        url: url.to_string(),
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn put_json(&self, url: &Url, body: &serde_json::Value) -> SyncResult<()> {
        let response = self
            .authorize(self.client.put(url.as_str()).json(body))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, url));
        }
        Ok(())
    }

    async fn get_json(&self, url: &Url) -> SyncResult<Option<serde_json::Value>> {
        let response = self.authorize(self.client.get(url.as_str())).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(status, url));
        }
        Ok(Some(response.json().await?))
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================

#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory backend keyed by full URL.
    #[derive(Default)]
    pub struct FakeBackend {
        pub documents: Mutex<HashMap<String, serde_json::Value>>,
        pub fail_with: Option<u16>,
    }

    #[async_trait]
    impl HttpBackend for FakeBackend {
        async fn put_json(&self, url: &Url, body: &serde_json::Value) -> SyncResult<()> {
            if let Some(status) = self.fail_with {
                return Err(SyncError::RequestFailed {
                    status,
                    url: url.to_string(),
                });
            }
            self.documents
                .lock()
                .unwrap()
                .insert(url.to_string(), body.clone());
            Ok(())
        }

        async fn get_json(&self, url: &Url) -> SyncResult<Option<serde_json::Value>> {
            if let Some(status) = self.fail_with {
                return Err(SyncError::RequestFailed {
                    status,
                    url: url.to_string(),
                });
            }
            Ok(self.documents.lock().unwrap().get(url.as_str()).cloned())
        }
    }
}
