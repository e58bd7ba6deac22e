//! Speech output adapter: [`SpeechOutput`] over a [`SynthesisEngine`].
//!
//! Each utterance gets a forwarder task translating engine events into
//! tagged [`OutputEvent`]s. An `Interrupted` or `Canceled` failure is always
//! reported as a normal `Ended`: it is what our own `stop()` produces, and
//! treating it as a failure would stall auto-advance.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rehearse_core::{OutputEvent, SignalSink, SpeakRequest, SpeechError, SpeechOutput, VoiceProfile};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::backend::{EngineVoice, SynthesisEngine, SynthesisEvent, SynthesisFailure, Utterance};
use crate::gate::EchoGate;

/// Default bound on how long `stop()` waits for the engine to acknowledge.
pub const DEFAULT_STOP_SETTLE: Duration = Duration::from_millis(500);

/// Pick the voice for `profile` in `language_tag`.
///
/// Preference order: the profile's assigned voice when its language matches
/// the target language prefix, then the first voice matching the prefix,
/// then any voice.
pub fn select_voice<'a>(
    profile: &VoiceProfile,
    voices: &'a [EngineVoice],
    language_tag: &str,
) -> Option<&'a EngineVoice> {
    let assigned = profile
        .voice_id
        .as_deref()
        .and_then(|id| voices.iter().find(|v| v.id == id))
        .filter(|v| v.speaks(language_tag));

    assigned
        .or_else(|| voices.iter().find(|v| v.speaks(language_tag)))
        .or_else(|| voices.first())
}

/// [`SpeechOutput`] implementation driving a [`SynthesisEngine`].
pub struct SpeechOutputAdapter {
    engine: Arc<dyn SynthesisEngine>,
    gate: EchoGate,
    stop_settle: Duration,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl SpeechOutputAdapter {
    pub fn new(engine: Arc<dyn SynthesisEngine>, gate: EchoGate) -> Self {
        Self {
            engine,
            gate,
            stop_settle: DEFAULT_STOP_SETTLE,
            forwarder: Mutex::new(None),
        }
    }

    #[must_use]
    pub const fn with_stop_settle(mut self, settle: Duration) -> Self {
        self.stop_settle = settle;
        self
    }

    /// Whether an utterance is currently playing.
    pub fn is_speaking(&self) -> bool {
        self.gate.is_speaking()
    }
}

#[async_trait]
impl SpeechOutput for SpeechOutputAdapter {
    async fn speak(&self, request: SpeakRequest, sink: SignalSink) -> Result<(), SpeechError> {
        // One utterance at a time: finish off whatever is still in flight.
        self.stop().await?;

        let voices = self.engine.voices();
        let voice = select_voice(&request.profile, &voices, &request.language_tag);
        let (rate, volume) = request.profile.clamped();
        let utterance = Utterance {
            text: request.text,
            speaker: request.character,
            voice_id: voice.map(|v| v.id.clone()),
            rate,
            volume,
            language_tag: request.language_tag,
        };

        tracing::debug!(
            tag = %sink.tag(),
            voice = utterance.voice_id.as_deref().unwrap_or("default"),
            "Speaking line"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        self.engine
            .utter(utterance, tx)
            .await
            .map_err(crate::VoiceError::into_synthesis_error)?;

        let handle = tokio::spawn(forward_synthesis(rx, sink, self.gate.clone()));
        *self.forwarder.lock().await = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), SpeechError> {
        let Some(mut handle) = self.forwarder.lock().await.take() else {
            return Ok(());
        };
        if handle.is_finished() {
            return Ok(());
        }

        if let Err(e) = self.engine.cancel().await {
            tracing::warn!(error = %e, "Synthesis cancel failed");
        }

        if tokio::time::timeout(self.stop_settle, &mut handle).await.is_err() {
            handle.abort();
            self.gate.stop_speaking();
            tracing::warn!(settle_ms = self.stop_settle.as_millis(), "Synthesis did not acknowledge stop");
            return Err(SpeechError::Unsettled("synthesis".into()));
        }
        Ok(())
    }
}

async fn forward_synthesis(
    mut rx: mpsc::UnboundedReceiver<SynthesisEvent>,
    sink: SignalSink,
    gate: EchoGate,
) {
    while let Some(event) = rx.recv().await {
        match event {
            SynthesisEvent::Started => {
                gate.start_speaking();
                sink.output(OutputEvent::Started);
            }
            SynthesisEvent::Finished
            | SynthesisEvent::Failed(SynthesisFailure::Interrupted | SynthesisFailure::Canceled) => {
                gate.stop_speaking();
                sink.output(OutputEvent::Ended);
                return;
            }
            SynthesisEvent::Failed(SynthesisFailure::Other(reason)) => {
                gate.stop_speaking();
                tracing::warn!(tag = %sink.tag(), reason = %reason, "Speech synthesis failed");
                sink.output(OutputEvent::Error(SpeechError::Synthesis(reason)));
                return;
            }
        }
    }

    // Engine dropped the channel without a terminal event.
    gate.stop_speaking();
    sink.output(OutputEvent::Ended);
}
