//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core domain expects from
//! infrastructure. They contain no implementation details and use only
//! domain types.
//!
//! # Design Rules
//!
//! - No `sqlx` or `reqwest` types in any signature
//! - No audio-engine types: speech ports speak in lines and transcripts
//! - Every asynchronous speech signal carries the [`TurnTag`] it was issued for

pub mod progress;
pub mod settings_repository;
pub mod speech;

use thiserror::Error;

pub use progress::{MemoryProgressRepository, ProgressRepository, ProgressStore, RemoteProgressPort};
pub use settings_repository::SettingsRepository;
pub use speech::{
    InputEvent, OutputEvent, SignalKind, SignalSink, SpeakRequest, SpeechError, SpeechInput,
    SpeechOutput, SpeechSignal, TurnTag,
};

use crate::domain::ScriptError;
use crate::settings::SettingsError;

/// Domain-specific errors for repository operations.
///
/// This error type abstracts away storage implementation details (sqlx,
/// HTTP) and gives services one failure shape to handle.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage backend error (database, filesystem, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote service error (network, HTTP status).
    #[error("Remote error: {0}")]
    Remote(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Core error type for semantic domain errors.
///
/// Adapters map this to their own error types (CLI exit codes, HTTP status).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Speech(#[from] SpeechError),
}
