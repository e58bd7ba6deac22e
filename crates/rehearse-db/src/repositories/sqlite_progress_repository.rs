//! `SQLite` implementation of the `ProgressRepository` trait.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use rehearse_core::{ProgressKey, ProgressRepository, ProgressSnapshot, RepositoryError};

/// `SQLite` implementation of the `ProgressRepository` trait.
///
/// One row per script and character. The snapshot is kept as JSON in its
/// wire shape; `script_id`, `character` and `updated_at` are duplicated
/// into columns for listing.
pub struct SqliteProgressRepository {
    pool: SqlitePool,
}

impl SqliteProgressRepository {
    /// Create a new `SQLite` progress repository.
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All snapshots saved for `script_id`, most recent first.
    pub async fn list_for_script(
        &self,
        script_id: &str,
    ) -> Result<Vec<ProgressSnapshot>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT snapshot FROM progress WHERE script_id = ? ORDER BY updated_at DESC",
        )
        .bind(script_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        rows.iter().map(|r| decode(r.get("snapshot"))).collect()
    }

    /// Remove the snapshot for `key`.
    pub async fn delete(&self, key: &ProgressKey) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM progress WHERE key = ?")
            .bind(key.storage_key())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(key.to_string()));
        }
        Ok(())
    }
}

fn decode(json: &str) -> Result<ProgressSnapshot, RepositoryError> {
    serde_json::from_str(json).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

#[async_trait]
impl ProgressRepository for SqliteProgressRepository {
    async fn load(&self, key: &ProgressKey) -> Result<Option<ProgressSnapshot>, RepositoryError> {
        let row = sqlx::query("SELECT snapshot FROM progress WHERE key = ?")
            .bind(key.storage_key())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        row.map(|r| decode(r.get("snapshot"))).transpose()
    }

    async fn save(&self, snapshot: &ProgressSnapshot) -> Result<(), RepositoryError> {
        let json = serde_json::to_string(snapshot)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r"
            INSERT OR REPLACE INTO progress (key, script_id, character, snapshot, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(snapshot.key().storage_key())
        .bind(&snapshot.script_id)
        .bind(&snapshot.character)
        .bind(&json)
        .bind(snapshot.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        tracing::trace!(key = %snapshot.key(), line = snapshot.last_line_index, "Progress saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::setup_test_database;

    fn snapshot(character: &str, line: usize, secs: i64) -> ProgressSnapshot {
        ProgressSnapshot {
            script_id: "Hamlet".into(),
            character: character.into(),
            last_act_number: 1,
            last_scene_number: 2,
            last_line_index: line,
            completed_lines: vec![2],
            accuracy_scores: BTreeMap::from([(2, 100), (4, 0)]),
            updated_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_load_missing_returns_none() {
        let repo = SqliteProgressRepository::new(setup_test_database().await.unwrap());
        let loaded = repo.load(&ProgressKey::new("Hamlet", "HAMLET")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_existing_row() {
        let repo = SqliteProgressRepository::new(setup_test_database().await.unwrap());

        repo.save(&snapshot("HAMLET", 2, 100)).await.unwrap();
        repo.save(&snapshot("HAMLET", 4, 200)).await.unwrap();

        let loaded = repo
            .load(&ProgressKey::new("Hamlet", "HAMLET"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, snapshot("HAMLET", 4, 200));
        assert_eq!(repo.list_for_script("Hamlet").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_orders_by_recency() {
        let repo = SqliteProgressRepository::new(setup_test_database().await.unwrap());

        repo.save(&snapshot("HORATIO", 1, 100)).await.unwrap();
        repo.save(&snapshot("HAMLET", 3, 300)).await.unwrap();

        let characters: Vec<_> = repo
            .list_for_script("Hamlet")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.character)
            .collect();
        assert_eq!(characters, vec!["HAMLET", "HORATIO"]);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let repo = SqliteProgressRepository::new(setup_test_database().await.unwrap());
        let key = ProgressKey::new("Hamlet", "GHOST");
        assert!(matches!(
            repo.delete(&key).await,
            Err(RepositoryError::NotFound(_))
        ));
    }
}
