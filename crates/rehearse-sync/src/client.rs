//! Progress sync client.

use async_trait::async_trait;
use rehearse_core::{ProgressKey, ProgressSnapshot, RemoteProgressPort, RepositoryError};
use url::Url;

use crate::config::SyncClientConfig;
use crate::error::{SyncError, SyncResult};
use crate::http::{HttpBackend, ReqwestBackend};

/// Default sync client using the reqwest HTTP backend.
pub type DefaultSyncClient = SyncClient<ReqwestBackend>;

/// Client for the remote progress service, generic over its HTTP backend.
pub struct SyncClient<B: HttpBackend> {
    backend: B,
    base_url: Url,
}

impl DefaultSyncClient {
    /// Create a new client with the given configuration.
    pub fn new(config: &SyncClientConfig) -> SyncResult<Self> {
        let base_url = Url::parse(&config.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::UnsupportedBaseUrl(config.base_url.clone()));
        }
        Ok(Self {
            backend: ReqwestBackend::new(config)?,
            base_url,
        })
    }
}

impl<B: HttpBackend> SyncClient<B> {
    #[cfg(test)]
    pub(crate) const fn with_backend(base_url: Url, backend: B) -> Self {
        Self { backend, base_url }
    }

    /// `{base}/progress/{key}` with the key as one encoded segment.
    fn progress_url(&self, key: &ProgressKey) -> SyncResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| SyncError::UnsupportedBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("progress")
            .push(&key.storage_key());
        Ok(url)
    }

    async fn push_snapshot(&self, snapshot: &ProgressSnapshot) -> SyncResult<()> {
        let url = self.progress_url(&snapshot.key())?;
        let body = serde_json::to_value(snapshot)?;
        self.backend.put_json(&url, &body).await?;
        tracing::debug!(%url, "Progress pushed");
        Ok(())
    }

    async fn fetch_snapshot(&self, key: &ProgressKey) -> SyncResult<Option<ProgressSnapshot>> {
        let url = self.progress_url(key)?;
        match self.backend.get_json(&url).await? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<B: HttpBackend> RemoteProgressPort for SyncClient<B> {
    async fn push(&self, snapshot: &ProgressSnapshot) -> Result<(), RepositoryError> {
        self.push_snapshot(snapshot).await.map_err(Into::into)
    }

    async fn fetch(&self, key: &ProgressKey) -> Result<Option<ProgressSnapshot>, RepositoryError> {
        self.fetch_snapshot(key).await.map_err(Into::into)
    }
}
