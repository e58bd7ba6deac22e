//! Speech input adapter: [`SpeechInput`] over a [`RecognitionEngine`].
//!
//! ```text
//!   Idle ──start_listening──▶ Listening ──stop_listening──▶ Stopping ──Ended──▶ Idle
//!                                  └──────────── engine Ended ─────────────────▶ Idle
//! ```
//!
//! Final results are accumulated for the whole session and delivered as one
//! `FinalTranscript` right before `Ended`. Stopping keeps what was captured.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rehearse_core::{InputEvent, SignalSink, SpeechError, SpeechInput};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::backend::{RecognitionEngine, RecognitionEvent, RecognitionFailure, RecognitionOptions};
use crate::gate::EchoGate;

/// Default bound on waiting for a recognition session to end.
pub const DEFAULT_LISTEN_SETTLE: Duration = Duration::from_millis(500);

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Listening status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenStatus {
    Idle,
    Listening,
    /// `stop_listening` was requested; waiting for the engine's `Ended`.
    Stopping,
}

#[derive(Debug)]
struct Shared {
    status: ListenStatus,
    sink: Option<SignalSink>,
    transcript: String,
}

/// [`SpeechInput`] implementation driving a [`RecognitionEngine`].
pub struct SpeechInputAdapter {
    engine: Arc<dyn RecognitionEngine>,
    gate: EchoGate,
    language_tag: String,
    settle: Duration,
    shared: Arc<Mutex<Shared>>,
    forwarder: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SpeechInputAdapter {
    pub fn new(
        engine: Arc<dyn RecognitionEngine>,
        gate: EchoGate,
        language_tag: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            gate,
            language_tag: language_tag.into(),
            settle: DEFAULT_LISTEN_SETTLE,
            shared: Arc::new(Mutex::new(Shared {
                status: ListenStatus::Idle,
                sink: None,
                transcript: String::new(),
            })),
            forwarder: tokio::sync::Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn status(&self) -> ListenStatus {
        self.shared
            .lock()
            .map_or(ListenStatus::Idle, |s| s.status)
    }

    /// Transcript accumulated so far.
    pub fn transcript(&self) -> String {
        self.shared
            .lock()
            .map(|s| s.transcript.clone())
            .unwrap_or_default()
    }

    fn set_status(&self, status: ListenStatus) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.status = status;
        }
    }

    /// Poll until a pending stop has settled, bounded by the settle time.
    async fn wait_while_stopping(&self) {
        let deadline = Instant::now() + self.settle;
        while self.status() == ListenStatus::Stopping && Instant::now() < deadline {
            tokio::time::sleep(STOP_POLL_INTERVAL).await;
        }
    }

    /// Wait for the current forwarder to finish, bounded by the settle time.
    async fn settle_forwarder(&self) -> Result<(), SpeechError> {
        let Some(mut handle) = self.forwarder.lock().await.take() else {
            return Ok(());
        };
        if tokio::time::timeout(self.settle, &mut handle).await.is_err() {
            handle.abort();
            self.set_status(ListenStatus::Idle);
            tracing::warn!(settle_ms = self.settle.as_millis(), "Recognition did not acknowledge stop");
            return Err(SpeechError::Unsettled("recognition".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SpeechInput for SpeechInputAdapter {
    async fn start_listening(&self, sink: SignalSink) -> Result<(), SpeechError> {
        if !self.engine.is_available() {
            return Err(SpeechError::RecognitionUnavailable);
        }

        match self.status() {
            ListenStatus::Listening => {
                // Already listening: keep the session, route events to the new turn.
                if let Ok(mut shared) = self.shared.lock() {
                    shared.sink = Some(sink);
                }
                return Ok(());
            }
            ListenStatus::Stopping => {
                tracing::debug!("Deferring listen until the previous session settles");
                self.wait_while_stopping().await;
            }
            ListenStatus::Idle => {}
        }

        let tag = sink.tag();
        if let Ok(mut shared) = self.shared.lock() {
            shared.status = ListenStatus::Listening;
            shared.sink = Some(sink);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        if let Err(e) = self
            .engine
            .begin(RecognitionOptions::continuous(self.language_tag.clone()), tx)
            .await
        {
            if let Ok(mut shared) = self.shared.lock() {
                shared.status = ListenStatus::Idle;
                shared.sink = None;
            }
            return Err(e.into_recognition_error());
        }

        tracing::debug!(%tag, "Listening");
        let handle = tokio::spawn(forward_recognition(
            rx,
            Arc::clone(&self.shared),
            self.gate.clone(),
        ));
        *self.forwarder.lock().await = Some(handle);
        Ok(())
    }

    async fn stop_listening(&self) -> Result<(), SpeechError> {
        if self.status() != ListenStatus::Listening {
            return self.settle_forwarder().await;
        }
        self.set_status(ListenStatus::Stopping);

        if let Err(e) = self.engine.end().await {
            tracing::warn!(error = %e, "Recognition end request failed");
        }
        self.settle_forwarder().await
    }

    fn reset_transcript(&self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.transcript.clear();
        }
    }
}

fn map_failure(failure: RecognitionFailure) -> SpeechError {
    match failure {
        RecognitionFailure::NotAllowed => SpeechError::RecognitionPermissionDenied,
        RecognitionFailure::ServiceNotAllowed => SpeechError::RecognitionUnavailable,
        RecognitionFailure::NoSpeech => SpeechError::RecognitionTransient("no-speech".into()),
        RecognitionFailure::Network => SpeechError::RecognitionTransient("network".into()),
        RecognitionFailure::Aborted => SpeechError::RecognitionTransient("aborted".into()),
        RecognitionFailure::Other(reason) => SpeechError::RecognitionTransient(reason),
    }
}

fn emit(shared: &Mutex<Shared>, event: InputEvent) {
    let sink = shared.lock().ok().and_then(|s| s.sink.clone());
    if let Some(sink) = sink {
        sink.input(event);
    }
}

async fn forward_recognition(
    mut rx: mpsc::UnboundedReceiver<RecognitionEvent>,
    shared: Arc<Mutex<Shared>>,
    gate: EchoGate,
) {
    while let Some(event) = rx.recv().await {
        match event {
            RecognitionEvent::Started => emit(&shared, InputEvent::Started),
            RecognitionEvent::SpeechStarted if gate.is_speaking() => {
                tracing::trace!("Speech during playback ignored");
            }
            RecognitionEvent::SpeechStarted => emit(&shared, InputEvent::SpeechDetected),
            RecognitionEvent::SpeechEnded => {
                if !gate.is_speaking() {
                    emit(&shared, InputEvent::SpeechEnded);
                }
            }
            RecognitionEvent::Result {
                transcript,
                is_final,
            } => {
                if !is_final || gate.is_speaking() {
                    continue;
                }
                if let Ok(mut s) = shared.lock() {
                    let piece = transcript.trim();
                    if !piece.is_empty() {
                        if !s.transcript.is_empty() {
                            s.transcript.push(' ');
                        }
                        s.transcript.push_str(piece);
                    }
                }
            }
            RecognitionEvent::Error(failure) => {
                let stopping = shared
                    .lock()
                    .is_ok_and(|s| s.status == ListenStatus::Stopping);
                if stopping && failure == RecognitionFailure::Aborted {
                    continue;
                }
                let error = map_failure(failure);
                tracing::debug!(error = %error, "Recognition error");
                emit(&shared, InputEvent::Error(error));
            }
            RecognitionEvent::Ended => break,
        }
    }

    let (sink, transcript) = match shared.lock() {
        Ok(mut s) => {
            s.status = ListenStatus::Idle;
            (s.sink.take(), s.transcript.clone())
        }
        Err(_) => (None, String::new()),
    };
    if let Some(sink) = sink {
        if !transcript.is_empty() {
            sink.input(InputEvent::FinalTranscript(transcript));
        }
        sink.input(InputEvent::Ended);
    }
}
