//! Speech adapters for rehearse.
//!
//! Implements the [`SpeechOutput`](rehearse_core::SpeechOutput) and
//! [`SpeechInput`](rehearse_core::SpeechInput) ports on top of pluggable
//! engines ([`backend::SynthesisEngine`], [`backend::RecognitionEngine`]).
//! Both adapters share an [`EchoGate`] so the recognizer never scores the
//! synthesizer's own voice.

pub mod backend;
pub mod error;
pub mod gate;
pub mod input;
pub mod output;

// Re-export key types for convenience
pub use backend::console::{ConsoleRecognition, ConsoleSynthesis, TranscriptFeeder};
pub use backend::{
    EngineVoice, RecognitionEngine, RecognitionEvent, RecognitionFailure, RecognitionOptions,
    SynthesisEngine, SynthesisEvent, SynthesisFailure, Utterance,
};
pub use error::VoiceError;
pub use gate::EchoGate;
pub use input::{ListenStatus, SpeechInputAdapter};
pub use output::{SpeechOutputAdapter, select_voice};
