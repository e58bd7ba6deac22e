//! Settings repository trait definition.
//!
//! This port defines the interface for practice settings persistence.
//! Implementations handle all storage details internally.

use async_trait::async_trait;

use super::RepositoryError;
use crate::settings::PracticeSettings;

/// Repository for practice settings persistence.
///
/// # Design Rules
///
/// - No `sqlx` types in signatures
/// - Works with domain `PracticeSettings` type directly
/// - Implementation handles JSON serialization internally
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Load practice settings.
    ///
    /// Returns default settings if none are stored.
    async fn load(&self) -> Result<PracticeSettings, RepositoryError>;

    /// Save practice settings.
    async fn save(&self, settings: &PracticeSettings) -> Result<(), RepositoryError>;
}
