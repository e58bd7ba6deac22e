//! Console engines for running a session without audio hardware.
//!
//! [`ConsoleSynthesis`] prints each line and holds it for roughly the time
//! it would take to say it. [`ConsoleRecognition`] turns typed lines into
//! a complete recognition session: speech start, one final result, speech
//! end, session end.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::{
    EngineVoice, RecognitionEngine, RecognitionEvent, RecognitionOptions, SynthesisEngine,
    SynthesisEvent, SynthesisFailure, Utterance,
};
use crate::error::VoiceError;

const WORDS_PER_SECOND: f32 = 2.5;
const MIN_UTTERANCE: Duration = Duration::from_millis(300);

/// Time a console utterance is held for.
pub fn utterance_duration(text: &str, rate: f32) -> Duration {
    #[allow(clippy::cast_precision_loss)]
    let words = text.split_whitespace().count() as f32;
    let secs = words / (WORDS_PER_SECOND * rate.max(0.1));
    Duration::from_secs_f32(secs).max(MIN_UTTERANCE)
}

// ── Synthesis ──────────────────────────────────────────────────────

/// Prints lines to stdout instead of speaking them.
#[derive(Debug, Default)]
pub struct ConsoleSynthesis {
    voices: Vec<EngineVoice>,
    cancel: Mutex<Option<oneshot::Sender<()>>>,
}

impl ConsoleSynthesis {
    pub fn new(voices: Vec<EngineVoice>) -> Self {
        Self {
            voices,
            cancel: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SynthesisEngine for ConsoleSynthesis {
    fn voices(&self) -> Vec<EngineVoice> {
        self.voices.clone()
    }

    async fn utter(
        &self,
        utterance: Utterance,
        events: mpsc::UnboundedSender<SynthesisEvent>,
    ) -> Result<(), VoiceError> {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        {
            let mut slot = self
                .cancel
                .lock()
                .map_err(|e| VoiceError::Synthesis(e.to_string()))?;
            // A newer utterance interrupts the previous one.
            if let Some(previous) = slot.replace(cancel_tx) {
                let _ = previous.send(());
            }
        }

        let hold = utterance_duration(&utterance.text, utterance.rate);
        tokio::spawn(async move {
            let _ = events.send(SynthesisEvent::Started);
            {
                let mut out = std::io::stdout().lock();
                let _ = writeln!(out, "  {}: {}", utterance.speaker, utterance.text);
            }
            tokio::select! {
                () = tokio::time::sleep(hold) => {
                    let _ = events.send(SynthesisEvent::Finished);
                }
                _ = cancel_rx => {
                    let _ = events.send(SynthesisEvent::Failed(SynthesisFailure::Interrupted));
                }
            }
        });
        Ok(())
    }

    async fn cancel(&self) -> Result<(), VoiceError> {
        let pending = self
            .cancel
            .lock()
            .map_err(|e| VoiceError::Synthesis(e.to_string()))?
            .take();
        if let Some(tx) = pending {
            let _ = tx.send(());
        }
        Ok(())
    }
}

// ── Recognition ────────────────────────────────────────────────────

type ActiveSession = Arc<Mutex<Option<mpsc::UnboundedSender<RecognitionEvent>>>>;

/// Recognition engine fed by typed lines.
#[derive(Debug, Default)]
pub struct ConsoleRecognition {
    active: ActiveSession,
}

/// Feeds typed lines into a [`ConsoleRecognition`] engine.
#[derive(Debug, Clone)]
pub struct TranscriptFeeder {
    active: ActiveSession,
}

impl ConsoleRecognition {
    /// Create the engine and the feeder that drives it.
    pub fn new() -> (Self, TranscriptFeeder) {
        let active = ActiveSession::default();
        (
            Self {
                active: Arc::clone(&active),
            },
            TranscriptFeeder { active },
        )
    }
}

impl TranscriptFeeder {
    /// Deliver `text` as one spoken phrase, ending the listening session.
    ///
    /// Returns `false` if nothing was listening.
    pub fn say(&self, text: &str) -> bool {
        let Ok(mut active) = self.active.lock() else {
            return false;
        };
        let Some(events) = active.take() else {
            tracing::debug!("Typed line ignored, not listening");
            return false;
        };
        for event in [
            RecognitionEvent::SpeechStarted,
            RecognitionEvent::Result {
                transcript: text.trim().to_string(),
                is_final: true,
            },
            RecognitionEvent::SpeechEnded,
            RecognitionEvent::Ended,
        ] {
            let _ = events.send(event);
        }
        true
    }

    /// Whether a recognition session is open.
    pub fn is_listening(&self) -> bool {
        self.active.lock().is_ok_and(|a| a.is_some())
    }
}

#[async_trait]
impl RecognitionEngine for ConsoleRecognition {
    fn is_available(&self) -> bool {
        true
    }

    async fn begin(
        &self,
        options: RecognitionOptions,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<(), VoiceError> {
        let mut active = self
            .active
            .lock()
            .map_err(|e| VoiceError::Recognition(e.to_string()))?;
        if active.is_some() {
            return Err(VoiceError::Busy);
        }
        tracing::trace!(language = %options.language_tag, "Console recognition session opened");
        let _ = events.send(RecognitionEvent::Started);
        *active = Some(events);
        Ok(())
    }

    async fn end(&self) -> Result<(), VoiceError> {
        let ended = self
            .active
            .lock()
            .map_err(|e| VoiceError::Recognition(e.to_string()))?
            .take();
        if let Some(events) = ended {
            let _ = events.send(RecognitionEvent::Ended);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<RecognitionEvent>) -> Vec<RecognitionEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[test]
    fn duration_scales_with_words_and_rate() {
        let text = "one two three four five";
        assert_eq!(utterance_duration(text, 1.0), Duration::from_secs(2));
        assert_eq!(utterance_duration(text, 2.0), Duration::from_secs(1));
        assert_eq!(utterance_duration("", 1.0), MIN_UTTERANCE);
    }

    #[tokio::test]
    async fn typed_line_completes_session() {
        let (engine, feeder) = ConsoleRecognition::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        assert!(!feeder.say("too early"));
        engine
            .begin(RecognitionOptions::continuous("en-US"), tx)
            .await
            .unwrap();
        assert!(feeder.is_listening());
        assert!(feeder.say("  To be or not to be "));

        let events = drain(&mut rx);
        assert_eq!(events.first(), Some(&RecognitionEvent::Started));
        assert!(events.contains(&RecognitionEvent::Result {
            transcript: "To be or not to be".into(),
            is_final: true,
        }));
        assert_eq!(events.last(), Some(&RecognitionEvent::Ended));
        assert!(!feeder.is_listening());
    }

    #[tokio::test]
    async fn second_session_is_rejected_while_open() {
        let (engine, _feeder) = ConsoleRecognition::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        engine
            .begin(RecognitionOptions::continuous("en-US"), tx.clone())
            .await
            .unwrap();
        assert_eq!(
            engine.begin(RecognitionOptions::continuous("en-US"), tx).await,
            Err(VoiceError::Busy)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_utterance() {
        let engine = ConsoleSynthesis::new(vec![]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let utterance = Utterance {
            text: "Who's there?".into(),
            speaker: "BARNARDO".into(),
            voice_id: None,
            rate: 1.0,
            volume: 1.0,
            language_tag: "en-US".into(),
        };

        engine.utter(utterance, tx).await.unwrap();
        assert_eq!(rx.recv().await, Some(SynthesisEvent::Started));
        engine.cancel().await.unwrap();
        assert_eq!(
            rx.recv().await,
            Some(SynthesisEvent::Failed(SynthesisFailure::Interrupted))
        );
    }
}
