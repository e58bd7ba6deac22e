//! Speech ports: the two injected collaborators of the turn coordinator.
//!
//! Speech output and speech input are process-wide singletons that report
//! progress asynchronously. Every call that starts I/O receives a
//! [`SignalSink`] bound to the [`TurnTag`] of the turn it serves; the
//! adapter reports events through it, and the coordinator drops any signal
//! whose tag is no longer current.
//!
//! ```text
//!   coordinator ──speak(req, sink{tag})──▶ SpeechOutput ──Started/Ended──▶ sink
//!   coordinator ──start_listening(sink)──▶ SpeechInput  ──Detected/Final──▶ sink
//! ```

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::VoiceProfile;

/// Identifies the turn an asynchronous signal belongs to.
///
/// `epoch` increases on every dispatch, cancellation, mode change and
/// navigation, so two tags are equal only if nothing happened in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnTag {
    pub line: usize,
    pub epoch: u64,
}

impl TurnTag {
    pub const fn new(line: usize, epoch: u64) -> Self {
        Self { line, epoch }
    }
}

impl fmt::Display for TurnTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}#{}", self.line, self.epoch)
    }
}

/// Errors reported by speech adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    /// The platform has no speech recognition capability.
    #[error("Speech recognition is not available")]
    RecognitionUnavailable,

    /// The user (or OS) refused microphone access.
    #[error("Microphone permission denied")]
    RecognitionPermissionDenied,

    /// Network hiccup, internal abort, no-speech and similar recoverable errors.
    #[error("Speech recognition interrupted: {0}")]
    RecognitionTransient(String),

    /// Synthesis failed for a reason other than our own `stop()`.
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    /// The engine did not acknowledge a stop in time.
    #[error("Speech engine did not settle: {0}")]
    Unsettled(String),
}

impl SpeechError {
    /// Whether the error disables recognition for the rest of the session.
    pub const fn is_fatal_for_recognition(&self) -> bool {
        matches!(
            self,
            Self::RecognitionUnavailable | Self::RecognitionPermissionDenied
        )
    }
}

/// Events reported by a [`SpeechOutput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Started,
    Ended,
    Error(SpeechError),
}

/// Events reported by a [`SpeechInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Started,
    SpeechDetected,
    SpeechEnded,
    /// Everything recognized during the listening session.
    FinalTranscript(String),
    Ended,
    Error(SpeechError),
}

/// Payload of a [`SpeechSignal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalKind {
    Output(OutputEvent),
    Input(InputEvent),
}

/// A tagged event delivered to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechSignal {
    pub tag: TurnTag,
    pub kind: SignalKind,
}

/// Delivers adapter events to the coordinator, stamped with one turn's tag.
#[derive(Debug, Clone)]
pub struct SignalSink {
    tag: TurnTag,
    tx: mpsc::UnboundedSender<SpeechSignal>,
}

impl SignalSink {
    pub const fn new(tag: TurnTag, tx: mpsc::UnboundedSender<SpeechSignal>) -> Self {
        Self { tag, tx }
    }

    pub const fn tag(&self) -> TurnTag {
        self.tag
    }

    /// Report an output event. Returns `false` once the coordinator is gone.
    pub fn output(&self, event: OutputEvent) -> bool {
        self.send(SignalKind::Output(event))
    }

    /// Report an input event. Returns `false` once the coordinator is gone.
    pub fn input(&self, event: InputEvent) -> bool {
        self.send(SignalKind::Input(event))
    }

    fn send(&self, kind: SignalKind) -> bool {
        let delivered = self
            .tx
            .send(SpeechSignal {
                tag: self.tag,
                kind,
            })
            .is_ok();
        if !delivered {
            tracing::trace!(tag = %self.tag, "Speech signal dropped, coordinator gone");
        }
        delivered
    }
}

/// One line to be spoken.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeakRequest {
    pub text: String,
    pub character: String,
    pub profile: VoiceProfile,
    /// Target language, e.g. `"en-US"`.
    pub language_tag: String,
}

/// Speech synthesis port.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Begin speaking `request`.
    ///
    /// Returns once the utterance has been handed to the engine; progress is
    /// reported through `sink` (`Started`, then `Ended` or `Error`).
    async fn speak(&self, request: SpeakRequest, sink: SignalSink) -> Result<(), SpeechError>;

    /// Stop any utterance in flight.
    ///
    /// Returns only after the engine has acknowledged the stop, so a new
    /// `speak` can follow immediately.
    async fn stop(&self) -> Result<(), SpeechError>;
}

/// Speech recognition port.
#[async_trait]
pub trait SpeechInput: Send + Sync {
    /// Start a continuous listening session reporting through `sink`.
    ///
    /// A no-op if already listening. Fails with
    /// [`SpeechError::RecognitionUnavailable`] or
    /// [`SpeechError::RecognitionPermissionDenied`] when recognition cannot
    /// run at all.
    async fn start_listening(&self, sink: SignalSink) -> Result<(), SpeechError>;

    /// End the listening session and wait for the engine to acknowledge.
    ///
    /// Any transcript captured so far is kept.
    async fn stop_listening(&self) -> Result<(), SpeechError>;

    /// Discard the accumulated transcript.
    fn reset_transcript(&self);
}
