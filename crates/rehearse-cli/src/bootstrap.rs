//! CLI bootstrap - the composition root.
//!
//! The only place where infrastructure is wired together:
//! - `SQLite` pool and repositories (via rehearse-db)
//! - Remote progress client (via rehearse-sync), when a sync URL is set
//! - Core services (via rehearse-core)
//!
//! Speech engines are built per session by the practice handler.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use rehearse_core::{PracticeSettings, ProgressService, SettingsService};
use rehearse_db::{StoreFactory, setup_database};
use rehearse_sync::{DefaultSyncClient, SyncClientConfig};

use crate::paths::database_path;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Resolved data directory.
    pub data_dir: PathBuf,
    /// Bearer token for the remote progress service.
    pub sync_token: Option<String>,
    /// Skip remote sync even when a sync URL is configured.
    pub offline: bool,
}

/// Fully composed services for CLI commands.
pub struct CliContext {
    pub settings: SettingsService,
    pub progress: Arc<ProgressService>,
    pub database_path: PathBuf,
}

/// Bootstrap the CLI application.
///
/// Opens (and migrates) the database, builds the services and, if the stored
/// settings name a sync URL, attaches the remote progress client.
pub async fn bootstrap(config: CliConfig) -> Result<CliContext> {
    let db_path = database_path(&config.data_dir);
    let pool = setup_database(&db_path).await?;
    let repos = StoreFactory::build_repos(pool);

    let settings = SettingsService::new(Arc::clone(&repos.settings));
    let current = settings.get().await?;

    let mut progress = ProgressService::new(repos.progress);
    if !config.offline {
        if let Some(client) = remote_client(&current, config.sync_token) {
            progress = progress.with_remote(Arc::new(client), current.sync_debounce());
        }
    }

    tracing::debug!(
        database = %db_path.display(),
        remote = progress.has_remote(),
        "CLI context ready"
    );

    Ok(CliContext {
        settings,
        progress: Arc::new(progress),
        database_path: db_path,
    })
}

fn remote_client(settings: &PracticeSettings, token: Option<String>) -> Option<DefaultSyncClient> {
    let url = settings.sync_url.as_deref()?;
    let config = SyncClientConfig::new(url)
        .with_user_agent(format!("rehearse/{}", env!("CARGO_PKG_VERSION")))
        .with_optional_token(token);

    match DefaultSyncClient::new(&config) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!(url, error = %e, "Remote sync disabled");
            None
        }
    }
}
