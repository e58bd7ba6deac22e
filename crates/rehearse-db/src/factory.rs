//! Composition utilities for wiring `SQLite` repositories.
//!
//! Construction only; no domain logic.

use std::sync::Arc;

use sqlx::SqlitePool;

use rehearse_core::{ProgressRepository, SettingsRepository};

use crate::repositories::{SqliteProgressRepository, SqliteSettingsRepository};

/// Trait-object-wrapped repositories over one pool.
#[derive(Clone)]
pub struct DbRepos {
    pub progress: Arc<dyn ProgressRepository>,
    pub settings: Arc<dyn SettingsRepository>,
}

/// Factory for creating repository instances with `SQLite` backends.
pub struct StoreFactory;

impl StoreFactory {
    /// Build all `SQLite` repositories from a pool.
    ///
    /// The pool should come from [`setup_database`](crate::setup_database)
    /// so the schema exists.
    pub fn build_repos(pool: SqlitePool) -> DbRepos {
        DbRepos {
            progress: Arc::new(SqliteProgressRepository::new(pool.clone())),
            settings: Arc::new(SqliteSettingsRepository::new(pool)),
        }
    }
}
