//! Practice settings and validation.
//!
//! These are pure domain types with no infrastructure dependencies. They are
//! persisted through the [`SettingsRepository`](crate::ports::SettingsRepository)
//! port and read once when a session starts.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{PracticeMode, VoiceProfile};
use crate::scoring::{DEFAULT_SEMANTIC_TOLERANCE, Fidelity, ScoringConfig, default_stop_words};

/// Default wait for the user to start speaking, in seconds.
pub const DEFAULT_GRACE_TIMEOUT_SECS: u32 = 8;

/// Default minimum score for a line to count as completed.
pub const DEFAULT_COMPLETION_THRESHOLD: u8 = 70;

/// Allowed grace-timeout range, in seconds.
pub const GRACE_TIMEOUT_RANGE: std::ops::RangeInclusive<u32> = 3..=15;

/// What a manual "next" does while a result is still on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResultAdvancePolicy {
    /// Cut the result display short and move on.
    #[default]
    Accept,
    /// Ignore the request until the result display ends.
    Ignore,
}

/// Practice settings.
///
/// Every field has a default so partially written settings files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeSettings {
    pub fidelity: Fidelity,
    pub grace_timeout_secs: u32,
    pub default_mode: PracticeMode,
    /// BCP-47 tag used for synthesis voice selection and recognition.
    pub language_tag: String,
    /// Per-character voice settings, keyed by character name.
    pub voice_profiles: BTreeMap<String, VoiceProfile>,
    pub semantic_tolerance: f32,
    /// Words skipped by semantic scoring. An empty list scores every word.
    pub semantic_stop_words: Vec<String>,
    pub completion_threshold: u8,
    pub result_display_auto_ms: u64,
    pub result_display_manual_ms: u64,
    /// Pause before a partner line is handed to the synthesizer.
    pub lead_in_ms: u64,
    /// Window after an advance during which another next/previous is ignored.
    pub advance_settle_ms: u64,
    pub result_advance_policy: ResultAdvancePolicy,
    /// Coalescing window for remote progress sync.
    pub sync_debounce_ms: u64,
    /// Base URL of the remote progress service, if any.
    pub sync_url: Option<String>,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            fidelity: Fidelity::Semantic,
            grace_timeout_secs: DEFAULT_GRACE_TIMEOUT_SECS,
            default_mode: PracticeMode::Auto,
            language_tag: "en-US".to_string(),
            voice_profiles: BTreeMap::new(),
            semantic_tolerance: DEFAULT_SEMANTIC_TOLERANCE,
            semantic_stop_words: default_stop_words(),
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            result_display_auto_ms: 600,
            result_display_manual_ms: 1200,
            lead_in_ms: 200,
            advance_settle_ms: 250,
            result_advance_policy: ResultAdvancePolicy::Accept,
            sync_debounce_ms: 1000,
            sync_url: None,
        }
    }
}

impl PracticeSettings {
    pub fn scoring(&self) -> ScoringConfig {
        ScoringConfig {
            fidelity: self.fidelity,
            semantic_tolerance: self.semantic_tolerance,
            stop_words: self
                .semantic_stop_words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
            completion_threshold: self.completion_threshold,
        }
    }

    pub const fn grace_timeout(&self) -> Duration {
        Duration::from_secs(self.grace_timeout_secs as u64)
    }

    /// How long a result stays on screen in `mode`.
    pub const fn result_display(&self, mode: PracticeMode) -> Duration {
        match mode {
            PracticeMode::Auto => Duration::from_millis(self.result_display_auto_ms),
            PracticeMode::Manual => Duration::from_millis(self.result_display_manual_ms),
        }
    }

    pub const fn lead_in(&self) -> Duration {
        Duration::from_millis(self.lead_in_ms)
    }

    pub const fn advance_settle(&self) -> Duration {
        Duration::from_millis(self.advance_settle_ms)
    }

    pub const fn sync_debounce(&self) -> Duration {
        Duration::from_millis(self.sync_debounce_ms)
    }

    /// Voice profile for `character`, matched case-insensitively.
    pub fn voice_for(&self, character: &str) -> Option<&VoiceProfile> {
        self.voice_profiles.get(character).or_else(|| {
            self.voice_profiles
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(character))
                .map(|(_, profile)| profile)
        })
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &PracticeSettingsUpdate) {
        if let Some(fidelity) = other.fidelity {
            self.fidelity = fidelity;
        }
        if let Some(secs) = other.grace_timeout_secs {
            self.grace_timeout_secs = secs;
        }
        if let Some(mode) = other.default_mode {
            self.default_mode = mode;
        }
        if let Some(ref tag) = other.language_tag {
            self.language_tag.clone_from(tag);
        }
        if let Some(tolerance) = other.semantic_tolerance {
            self.semantic_tolerance = tolerance;
        }
        if let Some(ref words) = other.semantic_stop_words {
            self.semantic_stop_words.clone_from(words);
        }
        if let Some(threshold) = other.completion_threshold {
            self.completion_threshold = threshold;
        }
        if let Some(policy) = other.result_advance_policy {
            self.result_advance_policy = policy;
        }
        if let Some(ref url) = other.sync_url {
            self.sync_url.clone_from(url);
        }
        for (character, profile) in &other.voice_profiles {
            match profile {
                Some(p) => {
                    self.voice_profiles.insert(character.clone(), p.clone());
                }
                None => {
                    self.voice_profiles.remove(character);
                }
            }
        }
    }
}

/// Partial settings update.
///
/// `None` leaves a field unchanged. `sync_url` and voice profile entries use
/// `Some(None)` to clear a value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeSettingsUpdate {
    pub fidelity: Option<Fidelity>,
    pub grace_timeout_secs: Option<u32>,
    pub default_mode: Option<PracticeMode>,
    pub language_tag: Option<String>,
    pub semantic_tolerance: Option<f32>,
    pub semantic_stop_words: Option<Vec<String>>,
    pub completion_threshold: Option<u8>,
    pub result_advance_policy: Option<ResultAdvancePolicy>,
    pub sync_url: Option<Option<String>>,
    pub voice_profiles: BTreeMap<String, Option<VoiceProfile>>,
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Grace timeout must be between 3 and 15 seconds, got {0}")]
    InvalidGraceTimeout(u32),

    #[error("Semantic tolerance must be between 0.0 and 1.0, got {0}")]
    InvalidTolerance(f32),

    #[error("Completion threshold must be between 1 and 100, got {0}")]
    InvalidThreshold(u8),

    #[error("Language tag cannot be empty")]
    EmptyLanguageTag,

    #[error("Voice profile for '{character}' has invalid {field}: {value}")]
    InvalidVoiceProfile {
        character: String,
        field: &'static str,
        value: f32,
    },

    #[error("Sync URL cannot be empty")]
    EmptySyncUrl,
}

/// Validate settings values.
pub fn validate_settings(settings: &PracticeSettings) -> Result<(), SettingsError> {
    if !GRACE_TIMEOUT_RANGE.contains(&settings.grace_timeout_secs) {
        return Err(SettingsError::InvalidGraceTimeout(
            settings.grace_timeout_secs,
        ));
    }

    if !(0.0..=1.0).contains(&settings.semantic_tolerance) {
        return Err(SettingsError::InvalidTolerance(settings.semantic_tolerance));
    }

    if !(1..=100).contains(&settings.completion_threshold) {
        return Err(SettingsError::InvalidThreshold(
            settings.completion_threshold,
        ));
    }

    if settings.language_tag.trim().is_empty() {
        return Err(SettingsError::EmptyLanguageTag);
    }

    for (character, profile) in &settings.voice_profiles {
        if !(0.1..=10.0).contains(&profile.rate) {
            return Err(SettingsError::InvalidVoiceProfile {
                character: character.clone(),
                field: "rate",
                value: profile.rate,
            });
        }
        if !(0.0..=1.0).contains(&profile.volume) {
            return Err(SettingsError::InvalidVoiceProfile {
                character: character.clone(),
                field: "volume",
                value: profile.volume,
            });
        }
    }

    if settings
        .sync_url
        .as_ref()
        .is_some_and(|u| u.trim().is_empty())
    {
        return Err(SettingsError::EmptySyncUrl);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = PracticeSettings::default();
        assert_eq!(settings.grace_timeout_secs, DEFAULT_GRACE_TIMEOUT_SECS);
        assert_eq!(settings.completion_threshold, 70);
        assert_eq!(settings.default_mode, PracticeMode::Auto);
        assert_eq!(settings.result_display(PracticeMode::Auto), Duration::from_millis(600));
        assert_eq!(
            settings.result_display(PracticeMode::Manual),
            Duration::from_millis(1200)
        );
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_validate_grace_timeout_bounds() {
        for secs in [2, 16] {
            let settings = PracticeSettings {
                grace_timeout_secs: secs,
                ..Default::default()
            };
            assert!(matches!(
                validate_settings(&settings),
                Err(SettingsError::InvalidGraceTimeout(s)) if s == secs
            ));
        }
    }

    #[test]
    fn test_validate_threshold() {
        let settings = PracticeSettings {
            completion_threshold: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidThreshold(0))
        ));
    }

    #[test]
    fn test_validate_voice_profile_volume() {
        let mut settings = PracticeSettings::default();
        settings.voice_profiles.insert(
            "GHOST".into(),
            VoiceProfile {
                volume: 1.5,
                ..VoiceProfile::default()
            },
        );
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidVoiceProfile { field: "volume", .. })
        ));
    }

    #[test]
    fn test_merge_settings() {
        let mut settings = PracticeSettings {
            sync_url: Some("https://sync.example".into()),
            ..Default::default()
        };
        let mut update = PracticeSettingsUpdate {
            grace_timeout_secs: Some(5),
            fidelity: Some(Fidelity::Exact),
            sync_url: Some(None),
            ..Default::default()
        };
        update
            .voice_profiles
            .insert("Hamlet".into(), Some(VoiceProfile::with_voice("en-gb-1")));
        settings.merge(&update);

        assert_eq!(settings.grace_timeout_secs, 5);
        assert_eq!(settings.fidelity, Fidelity::Exact);
        assert_eq!(settings.sync_url, None);
        assert_eq!(settings.default_mode, PracticeMode::Auto); // Unchanged
        assert_eq!(
            settings.voice_for("HAMLET").and_then(|p| p.voice_id.as_deref()),
            Some("en-gb-1")
        );
    }

    #[test]
    fn test_stop_words_flow_into_scoring() {
        let mut settings = PracticeSettings::default();
        assert_eq!(settings.scoring().stop_words, default_stop_words());

        settings.merge(&PracticeSettingsUpdate {
            semantic_stop_words: Some(vec![" Lord ".into(), String::new()]),
            ..Default::default()
        });
        assert_eq!(settings.scoring().stop_words, vec!["lord".to_string()]);

        settings.merge(&PracticeSettingsUpdate {
            semantic_stop_words: Some(Vec::new()),
            ..Default::default()
        });
        assert!(settings.scoring().stop_words.is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: PracticeSettings =
            serde_json::from_str(r#"{"fidelity":"loose","grace_timeout_secs":4}"#).unwrap();
        assert_eq!(settings.fidelity, Fidelity::Loose);
        assert_eq!(settings.grace_timeout_secs, 4);
        assert_eq!(settings.lead_in_ms, 200);
    }
}
