use serde::{Deserialize, Serialize};

/// Synthesis settings for one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VoiceProfile {
    /// Preferred engine voice identifier, if one was assigned.
    pub voice_id: Option<String>,
    /// Speaking rate multiplier (1.0 = normal).
    pub rate: f32,
    /// Output volume (0.0–1.0).
    pub volume: f32,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            voice_id: None,
            rate: 1.0,
            volume: 1.0,
        }
    }
}

impl VoiceProfile {
    pub fn with_voice(voice_id: impl Into<String>) -> Self {
        Self {
            voice_id: Some(voice_id.into()),
            ..Self::default()
        }
    }

    /// Rate and volume clamped to the range engines accept.
    #[must_use]
    pub fn clamped(&self) -> (f32, f32) {
        (self.rate.clamp(0.5, 2.0), self.volume.clamp(0.0, 1.0))
    }
}
