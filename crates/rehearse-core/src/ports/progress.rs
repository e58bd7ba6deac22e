//! Progress persistence ports.
//!
//! Three seams:
//!
//! - [`ProgressRepository`]: the authoritative local store (SQLite in
//!   `rehearse-db`, [`MemoryProgressRepository`] for tests and ephemeral runs)
//! - [`RemoteProgressPort`]: best-effort remote copy (HTTP in `rehearse-sync`)
//! - [`ProgressStore`]: what the turn coordinator talks to; implemented by
//!   [`ProgressService`](crate::services::ProgressService), which combines
//!   the two above

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::RepositoryError;
use crate::domain::{ProgressKey, ProgressSnapshot};

/// Local progress persistence.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load the snapshot stored under `key`, if any.
    async fn load(&self, key: &ProgressKey) -> Result<Option<ProgressSnapshot>, RepositoryError>;

    /// Insert or replace the snapshot for `snapshot.key()`.
    async fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), RepositoryError>;
}

/// Remote progress copy.
#[async_trait]
pub trait RemoteProgressPort: Send + Sync {
    /// Upload a snapshot, replacing the remote copy.
    async fn push(&self, snapshot: &ProgressSnapshot) -> Result<(), RepositoryError>;

    /// Download the remote copy for `key`, if any.
    async fn fetch(&self, key: &ProgressKey) -> Result<Option<ProgressSnapshot>, RepositoryError>;
}

/// Progress store as seen by the turn coordinator.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Persist `snapshot` locally and schedule a remote sync when
    /// `persistable` is set.
    ///
    /// Returns once the local write has completed. Remote failures are never
    /// reported.
    async fn save(&self, snapshot: &ProgressSnapshot, persistable: bool)
    -> Result<(), RepositoryError>;

    /// Load the most recently written snapshot for `key`.
    async fn load(&self, key: &ProgressKey) -> Result<Option<ProgressSnapshot>, RepositoryError>;
}

/// In-memory [`ProgressRepository`].
#[derive(Debug, Default)]
pub struct MemoryProgressRepository {
    entries: Mutex<HashMap<String, ProgressSnapshot>>,
}

impl MemoryProgressRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |e| e.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProgressRepository for MemoryProgressRepository {
    async fn load(&self, key: &ProgressKey) -> Result<Option<ProgressSnapshot>, RepositoryError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        Ok(entries.get(&key.storage_key()).cloned())
    }

    async fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), RepositoryError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        entries.insert(snapshot.key().storage_key(), snapshot.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;

    fn snapshot(line: usize) -> ProgressSnapshot {
        ProgressSnapshot {
            script_id: "Hamlet".into(),
            character: "HAMLET".into(),
            last_act_number: 1,
            last_scene_number: 1,
            last_line_index: line,
            completed_lines: vec![],
            accuracy_scores: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn memory_repository_replaces_by_key() {
        let repo = MemoryProgressRepository::new();
        let key = ProgressKey::new("Hamlet", "HAMLET");
        assert!(tokio_test::block_on(repo.load(&key)).unwrap().is_none());

        tokio_test::assert_ok!(tokio_test::block_on(repo.save(&snapshot(1))));
        tokio_test::assert_ok!(tokio_test::block_on(repo.save(&snapshot(3))));

        assert_eq!(repo.len(), 1);
        let loaded = tokio_test::block_on(repo.load(&key)).unwrap().unwrap();
        assert_eq!(loaded.last_line_index, 3);
    }
}
