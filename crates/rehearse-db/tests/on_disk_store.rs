//! Integration tests against an on-disk database file.

use std::collections::BTreeMap;

use chrono::Utc;
use rehearse_core::{PracticeSettings, ProgressKey, ProgressSnapshot, ResultAdvancePolicy};
use rehearse_db::{StoreFactory, setup_database};
use tempfile::TempDir;

fn snapshot() -> ProgressSnapshot {
    ProgressSnapshot {
        script_id: "Hamlet".into(),
        character: "HAMLET".into(),
        last_act_number: 3,
        last_scene_number: 1,
        last_line_index: 57,
        completed_lines: vec![55, 57],
        accuracy_scores: BTreeMap::from([(55, 92), (57, 100)]),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn progress_and_settings_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("rehearse.db");

    {
        let pool = setup_database(&db_path).await.unwrap();
        let repos = StoreFactory::build_repos(pool.clone());
        repos.progress.save(&snapshot()).await.unwrap();
        repos
            .settings
            .save(&PracticeSettings {
                result_advance_policy: ResultAdvancePolicy::Ignore,
                ..PracticeSettings::default()
            })
            .await
            .unwrap();
        pool.close().await;
    }

    assert!(db_path.exists());

    let repos = StoreFactory::build_repos(setup_database(&db_path).await.unwrap());
    let loaded = repos
        .progress
        .load(&ProgressKey::new("Hamlet", "HAMLET"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.last_line_index, 57);
    assert_eq!(loaded.accuracy_scores.get(&55), Some(&92));

    let settings = repos.settings.load().await.unwrap();
    assert_eq!(settings.result_advance_policy, ResultAdvancePolicy::Ignore);
}

#[tokio::test]
async fn setup_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("rehearse.db");

    setup_database(&db_path).await.unwrap().close().await;
    let pool = setup_database(&db_path).await.unwrap();
    let repos = StoreFactory::build_repos(pool);
    assert!(
        repos
            .progress
            .load(&ProgressKey::new("Hamlet", "OPHELIA"))
            .await
            .unwrap()
            .is_none()
    );
}
