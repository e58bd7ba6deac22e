//! Progress service - local-first persistence with debounced remote sync.
//!
//! ```text
//!   save ──▶ local repo (awaited)
//!        └─▶ sync worker ──(coalesce for `debounce`)──▶ remote.push (errors dropped)
//! ```
//!
//! The sync worker keeps only the latest snapshot per key inside a window;
//! older writes for the same key are never pushed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::domain::{ProgressKey, ProgressSnapshot};
use crate::ports::{ProgressRepository, ProgressStore, RemoteProgressPort, RepositoryError};

struct RemoteSync {
    port: Arc<dyn RemoteProgressPort>,
    tx: Mutex<Option<mpsc::UnboundedSender<ProgressSnapshot>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

/// Service for progress persistence.
pub struct ProgressService {
    local: Arc<dyn ProgressRepository>,
    remote: Option<RemoteSync>,
}

impl ProgressService {
    /// Create a local-only progress service.
    pub fn new(local: Arc<dyn ProgressRepository>) -> Self {
        Self {
            local,
            remote: None,
        }
    }

    /// Attach a remote copy synced in the background.
    ///
    /// Must be called inside a tokio runtime; the sync worker is spawned here.
    #[must_use]
    pub fn with_remote(mut self, port: Arc<dyn RemoteProgressPort>, debounce: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_sync_worker(Arc::clone(&port), rx, debounce));
        self.remote = Some(RemoteSync {
            port,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        });
        self
    }

    /// Whether a remote copy is configured.
    pub const fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Stop accepting remote work and wait for pending pushes to finish.
    pub async fn close(&self) {
        let Some(remote) = &self.remote else {
            return;
        };
        if let Ok(mut tx) = remote.tx.lock() {
            tx.take();
        }
        let worker = remote.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(worker) = worker
            && let Err(e) = worker.await
        {
            tracing::debug!(error = %e, "Progress sync worker ended abnormally");
        }
    }

    fn schedule_remote(&self, snapshot: &ProgressSnapshot) {
        let Some(remote) = &self.remote else {
            return;
        };
        let Ok(tx) = remote.tx.lock() else {
            return;
        };
        if let Some(tx) = tx.as_ref()
            && tx.send(snapshot.clone()).is_err()
        {
            tracing::debug!(key = %snapshot.key(), "Progress sync worker gone, remote push dropped");
        }
    }
}

#[async_trait]
impl ProgressStore for ProgressService {
    async fn save(
        &self,
        snapshot: &ProgressSnapshot,
        persistable: bool,
    ) -> Result<(), RepositoryError> {
        let result = self.local.save(snapshot).await;
        if let Err(ref e) = result {
            tracing::warn!(key = %snapshot.key(), error = %e, "Local progress save failed");
        }
        if persistable {
            self.schedule_remote(snapshot);
        }
        result
    }

    async fn load(&self, key: &ProgressKey) -> Result<Option<ProgressSnapshot>, RepositoryError> {
        let local = self.local.load(key).await;
        let remote = match &self.remote {
            Some(remote) => match remote.port.fetch(key).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "Remote progress fetch failed");
                    None
                }
            },
            None => None,
        };

        match (local, remote) {
            (Ok(Some(l)), Some(r)) => Ok(Some(if r.is_newer_than(&l) { r } else { l })),
            (Ok(l), r) => Ok(l.or(r)),
            (Err(e), Some(r)) => {
                tracing::warn!(key = %key, error = %e, "Local progress load failed, using remote copy");
                Ok(Some(r))
            }
            (Err(e), None) => Err(e),
        }
    }
}

async fn run_sync_worker(
    port: Arc<dyn RemoteProgressPort>,
    mut rx: mpsc::UnboundedReceiver<ProgressSnapshot>,
    debounce: Duration,
) {
    let mut pending: HashMap<String, ProgressSnapshot> = HashMap::new();

    while let Some(first) = rx.recv().await {
        pending.insert(first.key().storage_key(), first);
        let deadline = Instant::now() + debounce;
        let mut closed = false;

        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(snapshot) => {
                        pending.insert(snapshot.key().storage_key(), snapshot);
                    }
                    None => {
                        closed = true;
                        break;
                    }
                },
                () = tokio::time::sleep_until(deadline) => break,
            }
        }

        for (key, snapshot) in pending.drain() {
            match port.push(&snapshot).await {
                Ok(()) => tracing::debug!(key = %key, "Progress synced"),
                Err(e) => tracing::debug!(key = %key, error = %e, "Progress sync dropped"),
            }
        }

        if closed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use mockall::mock;
    use mockall::predicate::function;

    use super::*;
    use crate::ports::MemoryProgressRepository;

    mock! {
        Remote {}

        #[async_trait]
        impl RemoteProgressPort for Remote {
            async fn push(&self, snapshot: &ProgressSnapshot) -> Result<(), RepositoryError>;
            async fn fetch(&self, key: &ProgressKey) -> Result<Option<ProgressSnapshot>, RepositoryError>;
        }
    }

    fn snapshot(line: usize, secs: i64) -> ProgressSnapshot {
        ProgressSnapshot {
            script_id: "Hamlet".into(),
            character: "HAMLET".into(),
            last_act_number: 1,
            last_scene_number: 2,
            last_line_index: line,
            completed_lines: vec![],
            accuracy_scores: BTreeMap::new(),
            updated_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_saves_coalesce_into_one_push() {
        let mut remote = MockRemote::new();
        remote
            .expect_push()
            .with(function(|s: &ProgressSnapshot| s.last_line_index == 3))
            .times(1)
            .returning(|_| Ok(()));

        let local = Arc::new(MemoryProgressRepository::new());
        let service = ProgressService::new(local.clone())
            .with_remote(Arc::new(remote), Duration::from_secs(1));

        for line in 1..=3 {
            service.save(&snapshot(line, 10), true).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
        service.close().await;

        let key = ProgressKey::new("Hamlet", "HAMLET");
        assert_eq!(local.load(&key).await.unwrap().unwrap().last_line_index, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_persistable_skips_remote() {
        let mut remote = MockRemote::new();
        remote.expect_push().times(0);

        let local = Arc::new(MemoryProgressRepository::new());
        let service = ProgressService::new(local.clone())
            .with_remote(Arc::new(remote), Duration::from_secs(1));

        service.save(&snapshot(1, 10), false).await.unwrap();
        service.close().await;

        assert_eq!(local.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_is_swallowed() {
        let mut remote = MockRemote::new();
        remote
            .expect_push()
            .times(1)
            .returning(|_| Err(RepositoryError::Remote("503".into())));

        let service = ProgressService::new(Arc::new(MemoryProgressRepository::new()))
            .with_remote(Arc::new(remote), Duration::from_secs(1));

        assert!(service.save(&snapshot(1, 10), true).await.is_ok());
        service.close().await;
    }

    #[tokio::test]
    async fn test_load_prefers_newer_remote() {
        let mut remote = MockRemote::new();
        remote
            .expect_fetch()
            .returning(|_| Ok(Some(snapshot(7, 200))));

        let local = Arc::new(MemoryProgressRepository::new());
        local.save(&snapshot(2, 100)).await.unwrap();

        let service = ProgressService::new(local).with_remote(Arc::new(remote), Duration::ZERO);
        let loaded = service
            .load(&ProgressKey::new("Hamlet", "HAMLET"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.last_line_index, 7);
    }

    #[tokio::test]
    async fn test_load_keeps_newer_local_when_remote_fails() {
        let mut remote = MockRemote::new();
        remote
            .expect_fetch()
            .returning(|_| Err(RepositoryError::Remote("offline".into())));

        let local = Arc::new(MemoryProgressRepository::new());
        local.save(&snapshot(2, 100)).await.unwrap();

        let service = ProgressService::new(local).with_remote(Arc::new(remote), Duration::ZERO);
        let loaded = service
            .load(&ProgressKey::new("Hamlet", "HAMLET"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.last_line_index, 2);
    }

    #[tokio::test]
    async fn test_local_only_load_returns_none_when_empty() {
        let service = ProgressService::new(Arc::new(MemoryProgressRepository::new()));
        assert!(!service.has_remote());
        assert!(
            service
                .load(&ProgressKey::new("Hamlet", "HAMLET"))
                .await
                .unwrap()
                .is_none()
        );
    }
}
