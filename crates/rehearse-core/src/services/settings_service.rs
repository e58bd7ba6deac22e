//! Settings service - orchestrates settings operations.

use std::sync::Arc;

use crate::ports::{CoreError, SettingsRepository};
use crate::settings::{PracticeSettings, PracticeSettingsUpdate, validate_settings};

/// Service for settings operations.
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    /// Create a new settings service.
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    /// Get current settings.
    pub async fn get(&self) -> Result<PracticeSettings, CoreError> {
        self.repo.load().await.map_err(CoreError::from)
    }

    /// Update settings with partial changes.
    pub async fn update(
        &self,
        update: PracticeSettingsUpdate,
    ) -> Result<PracticeSettings, CoreError> {
        let mut current = self.repo.load().await.map_err(CoreError::from)?;
        current.merge(&update);
        validate_settings(&current)?;
        self.repo.save(&current).await.map_err(CoreError::from)?;
        tracing::debug!("Practice settings updated");
        Ok(current)
    }

    /// Save complete settings (validates first).
    pub async fn save(&self, settings: &PracticeSettings) -> Result<(), CoreError> {
        validate_settings(settings)?;
        self.repo.save(settings).await.map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::ports::RepositoryError;
    use crate::scoring::Fidelity;
    use crate::settings::SettingsError;

    struct MockSettingsRepo {
        settings: Mutex<PracticeSettings>,
    }

    impl MockSettingsRepo {
        fn new() -> Self {
            Self {
                settings: Mutex::new(PracticeSettings::default()),
            }
        }
    }

    #[async_trait]
    impl SettingsRepository for MockSettingsRepo {
        async fn load(&self) -> Result<PracticeSettings, RepositoryError> {
            Ok(self.settings.lock().unwrap().clone())
        }

        async fn save(&self, settings: &PracticeSettings) -> Result<(), RepositoryError> {
            *self.settings.lock().unwrap() = settings.clone();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_get_default_settings() {
        let service = SettingsService::new(Arc::new(MockSettingsRepo::new()));

        let settings = service.get().await.unwrap();
        assert_eq!(settings.grace_timeout_secs, 8);
        assert_eq!(settings.fidelity, Fidelity::Semantic);
    }

    #[tokio::test]
    async fn test_update_settings() {
        let service = SettingsService::new(Arc::new(MockSettingsRepo::new()));

        let update = PracticeSettingsUpdate {
            grace_timeout_secs: Some(5),
            ..Default::default()
        };

        let updated = service.update(update).await.unwrap();
        assert_eq!(updated.grace_timeout_secs, 5);

        // Verify persisted
        let fetched = service.get().await.unwrap();
        assert_eq!(fetched.grace_timeout_secs, 5);
    }

    #[tokio::test]
    async fn test_invalid_update_is_not_persisted() {
        let service = SettingsService::new(Arc::new(MockSettingsRepo::new()));

        let update = PracticeSettingsUpdate {
            grace_timeout_secs: Some(30),
            ..Default::default()
        };

        let err = service.update(update).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Settings(SettingsError::InvalidGraceTimeout(30))
        ));
        assert_eq!(service.get().await.unwrap().grace_timeout_secs, 8);
    }
}
