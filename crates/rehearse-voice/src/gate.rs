//! Echo gate: keeps the recognizer from hearing the synthesizer.
//!
//! The output adapter raises the gate while an utterance is playing; the
//! input adapter drops speech events and final results while it is raised.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag coordinating speech output and speech input.
#[derive(Debug, Clone, Default)]
pub struct EchoGate {
    is_system_speaking: Arc<AtomicBool>,
}

impl EchoGate {
    /// Create a new echo gate (initially open).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an utterance as playing.
    pub fn start_speaking(&self) {
        self.is_system_speaking.store(true, Ordering::SeqCst);
        tracing::trace!("Echo gate: utterance playing, recognition gated");
    }

    /// Mark playback as finished or stopped.
    pub fn stop_speaking(&self) {
        self.is_system_speaking.store(false, Ordering::SeqCst);
        tracing::trace!("Echo gate: silent, recognition open");
    }

    #[must_use]
    pub fn is_speaking(&self) -> bool {
        self.is_system_speaking.load(Ordering::SeqCst)
    }
}
