//! Speech engine traits: engine-agnostic interfaces for synthesis and
//! recognition.
//!
//! The adapters in [`crate::output`] and [`crate::input`] operate on trait
//! objects (`Arc<dyn SynthesisEngine>`, `Arc<dyn RecognitionEngine>`) so
//! engines can be swapped without touching the turn-facing logic.
//!
//! Engines report progress through an event channel handed to them per
//! utterance or listening session, mirroring the callback style of platform
//! speech APIs.
//!
//! ## Engine implementations
//!
//! | Module      | Synthesis | Recognition |
//! |-------------|-----------|-------------|
//! | [`console`] |     ✓     |      ✓      |

pub mod console;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::VoiceError;

// ── Shared types ───────────────────────────────────────────────────

/// A voice offered by a synthesis engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineVoice {
    /// Voice identifier (matched against `VoiceProfile::voice_id`).
    pub id: String,

    /// Human-readable display name.
    pub name: String,

    /// BCP-47 language tag, e.g. `"en-GB"`.
    pub language: String,
}

impl EngineVoice {
    pub fn new(id: impl Into<String>, language: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            language: language.into(),
        }
    }

    /// Whether this voice's language starts with the primary subtag of
    /// `language_tag` (`"en-US"` matches `"en-GB"`).
    pub fn speaks(&self, language_tag: &str) -> bool {
        let prefix = primary_subtag(language_tag);
        !prefix.is_empty() && primary_subtag(&self.language).eq_ignore_ascii_case(prefix)
    }
}

fn primary_subtag(tag: &str) -> &str {
    tag.trim().split(['-', '_']).next().unwrap_or_default()
}

// ── Synthesis ──────────────────────────────────────────────────────

/// One utterance handed to a synthesis engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// Who is speaking; display only.
    pub speaker: String,
    pub voice_id: Option<String>,
    pub rate: f32,
    pub volume: f32,
    pub language_tag: String,
}

/// Why an utterance did not finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisFailure {
    /// Cut off by a later `cancel()` or a newer utterance.
    Interrupted,
    /// Removed from the engine queue before it started.
    Canceled,
    Other(String),
}

/// Progress of one utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisEvent {
    Started,
    Finished,
    Failed(SynthesisFailure),
}

/// Backend-agnostic speech synthesis engine.
#[async_trait]
pub trait SynthesisEngine: Send + Sync {
    /// Voices currently offered by the engine.
    fn voices(&self) -> Vec<EngineVoice>;

    /// Queue `utterance`, reporting its progress on `events`.
    ///
    /// Every accepted utterance ends with exactly one `Finished` or
    /// `Failed` event.
    async fn utter(
        &self,
        utterance: Utterance,
        events: mpsc::UnboundedSender<SynthesisEvent>,
    ) -> Result<(), VoiceError>;

    /// Cancel the utterance in progress, if any.
    async fn cancel(&self) -> Result<(), VoiceError>;
}

// ── Recognition ────────────────────────────────────────────────────

/// Options for one recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionOptions {
    pub language_tag: String,
    /// Keep listening across pauses instead of stopping after one phrase.
    pub continuous: bool,
    pub interim_results: bool,
}

impl RecognitionOptions {
    pub fn continuous(language_tag: impl Into<String>) -> Self {
        Self {
            language_tag: language_tag.into(),
            continuous: true,
            interim_results: false,
        }
    }
}

/// Error reported by a running recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionFailure {
    NotAllowed,
    ServiceNotAllowed,
    NoSpeech,
    Network,
    Aborted,
    Other(String),
}

/// Progress of one recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    SpeechStarted,
    SpeechEnded,
    Result { transcript: String, is_final: bool },
    Error(RecognitionFailure),
    /// Always the last event of a session.
    Ended,
}

/// Backend-agnostic speech recognition engine.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Whether the platform can recognize speech at all.
    fn is_available(&self) -> bool;

    /// Open a recognition session reporting on `events`.
    async fn begin(
        &self,
        options: RecognitionOptions,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<(), VoiceError>;

    /// Ask the running session to end. The session still emits `Ended`.
    async fn end(&self) -> Result<(), VoiceError>;
}
