//! Voice engine error types.

use rehearse_core::SpeechError;

/// Errors raised by synthesis and recognition engines.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceError {
    /// The engine does not exist on this platform.
    #[error("Speech engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Microphone permission denied.
    #[error("Microphone permission denied")]
    PermissionDenied,

    /// Failed to synthesize speech.
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    /// Recognition failed to start or aborted.
    #[error("Speech recognition failed: {0}")]
    Recognition(String),

    /// An utterance or listening session is already in progress.
    #[error("Speech engine is busy")]
    Busy,
}

impl VoiceError {
    /// Map an engine error raised while starting recognition.
    pub fn into_recognition_error(self) -> SpeechError {
        match self {
            Self::EngineUnavailable(_) => SpeechError::RecognitionUnavailable,
            Self::PermissionDenied => SpeechError::RecognitionPermissionDenied,
            other => SpeechError::RecognitionTransient(other.to_string()),
        }
    }

    /// Map an engine error raised while starting synthesis.
    pub fn into_synthesis_error(self) -> SpeechError {
        SpeechError::Synthesis(self.to_string())
    }
}
