//! `SQLite` persistence for rehearse: practice progress and settings.
#![deny(unsafe_code)]

// Pulled in for its `bundled` feature; sqlx links against it.
use libsqlite3_sys as _;

pub mod factory;
pub mod repositories;
pub mod setup;

// Re-export factory for convenient access
pub use factory::{DbRepos, StoreFactory};

// Re-export repository implementations
pub use repositories::{SqliteProgressRepository, SqliteSettingsRepository};

// Re-export setup functions for convenient access
pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;
