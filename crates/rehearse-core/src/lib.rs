//! Core domain for rehearse: script timeline, practice state, accuracy
//! scoring, settings, and the port traits implemented by adapters.
//!
//! This crate has no knowledge of audio engines, SQLite or HTTP. Adapters
//! live in `rehearse-voice`, `rehearse-db` and `rehearse-sync`; the turn
//! coordinator lives in `rehearse-session`.

pub mod domain;
pub mod ports;
pub mod scoring;
pub mod services;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    Phase, PracticeMode, PracticeState, ProgressKey, ProgressSnapshot, Script, ScriptError,
    ScriptLine, Speaker, VoiceProfile,
};
pub use ports::{
    CoreError, InputEvent, MemoryProgressRepository, OutputEvent, ProgressRepository,
    ProgressStore, RemoteProgressPort, RepositoryError, SettingsRepository, SignalKind,
    SignalSink, SpeakRequest, SpeechError, SpeechInput, SpeechOutput, SpeechSignal, TurnTag,
};
pub use scoring::{Fidelity, ScoringConfig, edit_distance, normalize, score, score_with};
pub use services::{ProgressService, SettingsService};
pub use settings::{
    DEFAULT_COMPLETION_THRESHOLD, DEFAULT_GRACE_TIMEOUT_SECS, PracticeSettings,
    PracticeSettingsUpdate, ResultAdvancePolicy, SettingsError, validate_settings,
};
