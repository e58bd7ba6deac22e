//! The turn coordinator.
//!
//! One task owns [`PracticeState`] and applies every transition. It reads
//! three channels: UI commands, speech signals, and timer firings. Each
//! speech signal and timer firing carries the [`TurnTag`] it was issued
//! for; anything not matching the current turn is dropped, so a late
//! `Ended` from a line already left behind cannot move the session.
//!
//! ```text
//!            start/resume
//!   Idle ─────────────────▶ dispatch(line)
//!                              │ user line          │ partner line
//!                              ▼                    ▼
//!                     AwaitingUserSpeech     PlayingPartnerLine
//!                       │ transcript/timeout     │ ended (auto)
//!                       ▼                        ▼
//!                  ShowingResult ──(auto)──▶ advance ──past end──▶ Complete
//!                       │ (manual)
//!                       ▼
//!                     Idle
//! ```

use std::ops::ControlFlow;
use std::sync::Arc;

use rehearse_core::{
    InputEvent, OutputEvent, Phase, PracticeMode, PracticeSettings, PracticeState,
    ProgressSnapshot, ProgressStore, ResultAdvancePolicy, ScoringConfig, Script, SignalKind,
    SignalSink, SpeakRequest, SpeechError, SpeechInput, SpeechOutput, SpeechSignal, TurnTag,
    score_with,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::event::{Command, SessionEvent};
use crate::handle::SessionHandle;
use crate::timer::{self, TimerFired, TimerKind};

/// Entry point for running a practice session.
pub struct PracticeSession;

impl PracticeSession {
    /// Spawn the coordinator task.
    ///
    /// Returns the handle for UI actions and the receiver for session
    /// events. Must be called inside a tokio runtime.
    pub fn spawn(
        config: SessionConfig,
        output: Arc<dyn SpeechOutput>,
        input: Arc<dyn SpeechInput>,
        store: Arc<dyn ProgressStore>,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();

        let line_count = config.script.len();
        let start = config.start_index.min(line_count.saturating_sub(1));
        let mut state = PracticeState::new(start, config.settings.default_mode);
        if let Some(snapshot) = &config.restore {
            state.restore(snapshot, line_count, config.settings.completion_threshold);
        }
        let (state_tx, state_rx) = watch::channel(state.clone());

        let coordinator = Coordinator {
            scoring: config.settings.scoring(),
            script: config.script,
            character: config.character,
            settings: config.settings,
            output,
            input,
            store,
            state,
            state_tx,
            events: event_tx,
            signal_tx,
            timer_tx,
            epoch: 0,
            turn: None,
            timers: Vec::new(),
            grace: None,
            settle_until: None,
            recognition: Recognition::Ready,
            persistence_degraded: false,
        };
        let task = tokio::spawn(coordinator.run(command_rx, signal_rx, timer_rx));

        (SessionHandle::new(command_tx, state_rx, task), event_rx)
    }
}

/// What the session knows about speech recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recognition {
    Ready,
    /// No recognizer; user lines wait for a manual advance.
    Unavailable,
    /// Microphone refused; user lines only time out.
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnKind {
    User,
    Partner,
    Result,
}

/// Bookkeeping for the turn in flight.
#[derive(Debug)]
struct Turn {
    tag: TurnTag,
    kind: TurnKind,
    /// `speak` accepted and no end seen yet.
    speaking: bool,
    /// `start_listening` accepted and no end seen yet.
    listening: bool,
    grace_armed: bool,
    speech_detected: bool,
}

impl Turn {
    const fn new(tag: TurnTag, kind: TurnKind) -> Self {
        Self {
            tag,
            kind,
            speaking: false,
            listening: false,
            grace_armed: false,
            speech_detected: false,
        }
    }
}

struct Coordinator {
    script: Arc<Script>,
    character: String,
    settings: PracticeSettings,
    scoring: ScoringConfig,
    output: Arc<dyn SpeechOutput>,
    input: Arc<dyn SpeechInput>,
    store: Arc<dyn ProgressStore>,
    state: PracticeState,
    state_tx: watch::Sender<PracticeState>,
    events: mpsc::UnboundedSender<SessionEvent>,
    signal_tx: mpsc::UnboundedSender<SpeechSignal>,
    timer_tx: mpsc::UnboundedSender<TimerFired>,
    epoch: u64,
    turn: Option<Turn>,
    timers: Vec<JoinHandle<()>>,
    grace: Option<JoinHandle<()>>,
    /// Next/previous requests before this instant are ignored.
    settle_until: Option<Instant>,
    recognition: Recognition,
    persistence_degraded: bool,
}

impl Coordinator {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut signals: mpsc::UnboundedReceiver<SpeechSignal>,
        mut timers: mpsc::UnboundedReceiver<TimerFired>,
    ) {
        tracing::info!(
            script = %self.script.id(),
            character = %self.character,
            lines = self.script.len(),
            start = self.state.current_line_index,
            mode = %self.state.mode,
            "Practice session ready"
        );

        loop {
            let flow = tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        self.shutdown().await;
                        ControlFlow::Break(())
                    }
                },
                Some(signal) = signals.recv() => {
                    self.handle_signal(signal).await;
                    ControlFlow::Continue(())
                }
                Some(fired) = timers.recv() => {
                    self.handle_timer(fired).await;
                    ControlFlow::Continue(())
                }
            };
            self.publish();
            if flow.is_break() {
                break;
            }
        }
    }

    // ── Plumbing ───────────────────────────────────────────────────

    fn publish(&self) {
        self.state_tx.send_if_modified(|current| {
            if *current == self.state {
                false
            } else {
                current.clone_from(&self.state);
                true
            }
        });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    const fn current_tag(&self) -> TurnTag {
        TurnTag::new(self.state.current_line_index, self.epoch)
    }

    fn is_current(&self, tag: TurnTag) -> bool {
        self.turn.as_ref().is_some_and(|t| t.tag == tag)
    }

    fn sink(&self, tag: TurnTag) -> SignalSink {
        SignalSink::new(tag, self.signal_tx.clone())
    }

    /// Invalidate the turn in flight: new epoch, timers cancelled, speech
    /// output and input stopped and acknowledged.
    async fn cancel_turn(&mut self) {
        self.epoch += 1;
        self.disarm_grace();
        for timer in self.timers.drain(..) {
            timer.abort();
        }

        let Some(turn) = self.turn.take() else {
            return;
        };
        if turn.speaking {
            if let Err(e) = self.output.stop().await {
                tracing::warn!(tag = %turn.tag, error = %e, "Speech output stop failed");
            }
        }
        if turn.listening {
            if let Err(e) = self.input.stop_listening().await {
                tracing::warn!(tag = %turn.tag, error = %e, "Speech input stop failed");
            }
        }
    }

    fn arm_grace(&mut self, tag: TurnTag) {
        let secs = self.settings.grace_timeout_secs;
        self.state.countdown = secs;
        let ticker = timer::grace_countdown(&self.timer_tx, tag, secs);
        if let Some(previous) = self.grace.replace(ticker) {
            previous.abort();
        }
        if let Some(turn) = self.turn.as_mut() {
            turn.grace_armed = true;
        }
    }

    fn disarm_grace(&mut self) {
        if let Some(ticker) = self.grace.take() {
            ticker.abort();
        }
        if let Some(turn) = self.turn.as_mut() {
            turn.grace_armed = false;
        }
        self.state.countdown = 0;
    }

    /// Save the current snapshot locally (and remotely when allowed).
    async fn save_snapshot(&mut self) -> ProgressSnapshot {
        let snapshot = self.state.snapshot(&self.script, &self.character);
        if let Err(e) = self.store.save(&snapshot, self.script.persistable()).await {
            if !self.persistence_degraded {
                tracing::warn!(error = %e, "Progress could not be saved; continuing in memory");
            }
            self.persistence_degraded = true;
        }
        snapshot
    }

    async fn persist(&mut self) {
        let snapshot = self.save_snapshot().await;
        self.emit(SessionEvent::ProgressUpdated(snapshot));
    }

    fn recognition_failed(&mut self, error: &SpeechError) {
        match error {
            SpeechError::RecognitionUnavailable if self.recognition != Recognition::Unavailable => {
                tracing::warn!("Speech recognition unavailable; user lines advance manually");
                self.recognition = Recognition::Unavailable;
                self.emit(SessionEvent::RecognitionUnavailable);
            }
            SpeechError::RecognitionPermissionDenied if self.recognition == Recognition::Ready => {
                tracing::warn!("Microphone permission denied; user lines will time out");
                self.recognition = Recognition::Denied;
                self.emit(SessionEvent::PermissionDenied);
            }
            other => tracing::debug!(error = %other, "Speech recognition error"),
        }
    }

    // ── Turns ──────────────────────────────────────────────────────

    /// Start the turn for the current line.
    async fn dispatch(&mut self) {
        self.cancel_turn().await;
        self.state.clear_turn();
        let tag = self.current_tag();
        if self.script.is_line_for(tag.line, &self.character) {
            self.begin_user_turn(tag).await;
        } else {
            self.begin_partner_turn(tag);
        }
    }

    async fn begin_user_turn(&mut self, tag: TurnTag) {
        tracing::debug!(%tag, "Awaiting user line");
        self.state.phase = Phase::AwaitingUserSpeech;
        self.state.waiting_for_user = true;
        self.turn = Some(Turn::new(tag, TurnKind::User));

        match self.recognition {
            Recognition::Unavailable => return,
            Recognition::Denied => {
                self.arm_grace(tag);
                return;
            }
            Recognition::Ready => {}
        }

        self.input.reset_transcript();
        match self.input.start_listening(self.sink(tag)).await {
            Ok(()) => {
                if let Some(turn) = self.turn.as_mut() {
                    turn.listening = true;
                }
                self.arm_grace(tag);
            }
            Err(e) => {
                self.recognition_failed(&e);
                if self.recognition != Recognition::Unavailable {
                    self.arm_grace(tag);
                }
            }
        }
    }

    fn begin_partner_turn(&mut self, tag: TurnTag) {
        tracing::debug!(%tag, "Partner line");
        self.state.phase = Phase::PlayingPartnerLine;
        self.turn = Some(Turn::new(tag, TurnKind::Partner));
        self.timers.push(timer::once(
            &self.timer_tx,
            tag,
            self.settings.lead_in(),
            TimerKind::LeadIn,
        ));
    }

    async fn speak_partner_line(&mut self, tag: TurnTag) {
        let Some(line) = self.script.line(tag.line) else {
            return;
        };
        let profile = self
            .settings
            .voice_for(line.character.primary())
            .cloned()
            .unwrap_or_default();
        let request = SpeakRequest {
            text: line.text.clone(),
            character: line.character.label(),
            profile,
            language_tag: self.settings.language_tag.clone(),
        };

        match self.output.speak(request, self.sink(tag)).await {
            Ok(()) => {
                if let Some(turn) = self.turn.as_mut() {
                    turn.speaking = true;
                }
            }
            Err(e) => {
                tracing::warn!(%tag, error = %e, "Partner line could not be spoken; skipping");
                self.partner_line_finished().await;
            }
        }
    }

    async fn partner_line_finished(&mut self) {
        if let Some(turn) = self.turn.as_mut() {
            turn.speaking = false;
        }
        match self.state.mode {
            PracticeMode::Auto => self.advance().await,
            PracticeMode::Manual => {
                self.cancel_turn().await;
                self.state.phase = Phase::Idle;
            }
        }
    }

    fn score_transcript(&self, transcript: &str) -> u8 {
        if transcript.trim().is_empty() {
            return 0;
        }
        let expected = self
            .script
            .line(self.state.current_line_index)
            .map_or("", |l| l.text.as_str());
        score_with(expected, transcript, &self.scoring)
    }

    /// Record `attempt` for the current line and show it.
    async fn resolve_user_line(&mut self, attempt: u8) {
        self.cancel_turn().await;
        let index = self.state.current_line_index;
        let stored = self
            .state
            .record_score(index, attempt, self.scoring.completion_threshold);
        tracing::info!(line = index, score = attempt, stored, "Line scored");
        self.persist().await;
        self.show_result(attempt);
    }

    fn show_result(&mut self, accuracy: u8) {
        self.state.phase = Phase::ShowingResult;
        self.state.waiting_for_user = false;
        self.state.countdown = 0;
        self.state.showing_result = true;
        self.state.result_accuracy = Some(accuracy);

        let tag = self.current_tag();
        self.turn = Some(Turn::new(tag, TurnKind::Result));
        self.timers.push(timer::once(
            &self.timer_tx,
            tag,
            self.settings.result_display(self.state.mode),
            TimerKind::ResultShown,
        ));
    }

    async fn result_shown(&mut self) {
        match self.state.mode {
            PracticeMode::Auto => self.advance().await,
            PracticeMode::Manual => {
                self.cancel_turn().await;
                self.state.showing_result = false;
                self.state.phase = Phase::Idle;
            }
        }
    }

    /// Move to the next line, completing past the end.
    async fn advance(&mut self) {
        let next = self.state.current_line_index + 1;
        if next >= self.script.len() {
            self.complete().await;
        } else {
            self.move_to(next).await;
        }
    }

    async fn move_to(&mut self, index: usize) {
        self.cancel_turn().await;
        self.state.current_line_index = index;
        self.state.clear_turn();
        self.persist().await;

        if self.state.playing {
            self.dispatch().await;
        } else if self.state.phase != Phase::Paused {
            self.state.phase = Phase::Idle;
        }
    }

    async fn complete(&mut self) {
        self.cancel_turn().await;
        self.state.clear_turn();
        self.state.playing = false;
        self.state.phase = Phase::Complete;

        let snapshot = self.save_snapshot().await;
        tracing::info!(
            completed = snapshot.completed_lines.len(),
            scored = snapshot.accuracy_scores.len(),
            "Practice session complete"
        );
        self.emit(SessionEvent::Completed(snapshot));
    }

    async fn shutdown(&mut self) -> ProgressSnapshot {
        self.cancel_turn().await;
        self.state.clear_turn();
        self.state.playing = false;
        if self.state.phase != Phase::Complete {
            self.state.phase = Phase::Idle;
        }

        let snapshot = self.save_snapshot().await;
        if self.persistence_degraded {
            self.emit(SessionEvent::PersistenceDegraded);
        }
        tracing::info!(line = snapshot.last_line_index, "Practice session ended");
        snapshot
    }

    // ── Commands ───────────────────────────────────────────────────

    async fn handle_command(&mut self, command: Command) -> ControlFlow<()> {
        tracing::debug!(?command, phase = ?self.state.phase, "Session command");
        match command {
            Command::Start => self.start().await,
            Command::Pause => self.pause().await,
            Command::Resume => self.resume().await,
            Command::Next => self.step(true).await,
            Command::Previous => self.step(false).await,
            Command::JumpTo(index) => self.jump_to(index).await,
            Command::Retry => self.retry().await,
            Command::SetMode(mode) => self.set_mode(mode).await,
            Command::Shutdown(reply) => {
                let snapshot = self.shutdown().await;
                let _ = reply.send(snapshot);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn start(&mut self) {
        match self.state.phase {
            Phase::Idle => {
                self.state.playing = true;
                tracing::info!(line = self.state.current_line_index, "Practice started");
                self.dispatch().await;
            }
            Phase::Paused => self.resume().await,
            Phase::Complete => tracing::debug!("Session complete; start ignored"),
            Phase::AwaitingUserSpeech | Phase::PlayingPartnerLine | Phase::ShowingResult => {}
        }
    }

    async fn pause(&mut self) {
        if !self.state.playing {
            return;
        }
        self.cancel_turn().await;
        self.state.clear_turn();
        self.state.playing = false;
        self.state.phase = Phase::Paused;
        tracing::info!(line = self.state.current_line_index, "Practice paused");
    }

    async fn resume(&mut self) {
        if self.state.phase != Phase::Paused {
            return;
        }
        self.state.playing = true;
        tracing::info!(line = self.state.current_line_index, "Practice resumed");
        self.dispatch().await;
    }

    /// Manual next (`forward`) or previous.
    async fn step(&mut self, forward: bool) {
        let now = Instant::now();
        if self.settle_until.is_some_and(|until| now < until) {
            tracing::debug!("Previous advance still settling; ignored");
            return;
        }

        let phase = self.state.phase;
        if forward && phase == Phase::Complete {
            return;
        }
        if forward
            && phase == Phase::ShowingResult
            && self.settings.result_advance_policy == ResultAdvancePolicy::Ignore
        {
            tracing::debug!("Next ignored while showing result");
            return;
        }

        let current = self.state.current_line_index;
        let target = if forward {
            current + 1
        } else if phase == Phase::Complete {
            current
        } else if let Some(previous) = current.checked_sub(1) {
            previous
        } else {
            return;
        };

        self.settle_until = Some(now + self.settings.advance_settle());
        if target >= self.script.len() {
            self.complete().await;
        } else {
            self.move_to(target).await;
        }
    }

    async fn jump_to(&mut self, index: usize) {
        if index >= self.script.len() {
            tracing::debug!(index, lines = self.script.len(), "Jump outside script ignored");
            return;
        }
        self.move_to(index).await;
    }

    async fn retry(&mut self) {
        if self.state.phase == Phase::Complete {
            return;
        }
        let index = self.state.current_line_index;
        self.state.clear_line(index);
        tracing::info!(line = index, "Retrying line");

        self.cancel_turn().await;
        self.state.clear_turn();
        self.persist().await;
        if self.state.playing {
            self.dispatch().await;
        } else if self.state.phase != Phase::Paused {
            self.state.phase = Phase::Idle;
        }
    }

    async fn set_mode(&mut self, mode: PracticeMode) {
        if self.state.mode == mode {
            return;
        }
        self.state.mode = mode;
        tracing::info!(%mode, "Practice mode changed");

        match self.state.phase {
            Phase::AwaitingUserSpeech | Phase::PlayingPartnerLine => self.dispatch().await,
            Phase::ShowingResult => {
                let accuracy = self.state.result_accuracy.unwrap_or(0);
                self.cancel_turn().await;
                self.show_result(accuracy);
            }
            Phase::Idle | Phase::Paused | Phase::Complete => {}
        }
    }

    // ── Signals and timers ─────────────────────────────────────────

    async fn handle_signal(&mut self, signal: SpeechSignal) {
        if !self.is_current(signal.tag) {
            tracing::trace!(tag = %signal.tag, kind = ?signal.kind, "Stale speech signal dropped");
            return;
        }
        match signal.kind {
            SignalKind::Output(event) => self.on_output(event).await,
            SignalKind::Input(event) => self.on_input(event).await,
        }
    }

    async fn on_output(&mut self, event: OutputEvent) {
        if self.state.phase != Phase::PlayingPartnerLine {
            return;
        }
        match event {
            OutputEvent::Started => tracing::trace!("Partner line started"),
            OutputEvent::Ended => self.partner_line_finished().await,
            OutputEvent::Error(e) => {
                tracing::warn!(error = %e, "Partner line failed; continuing");
                self.partner_line_finished().await;
            }
        }
    }

    async fn on_input(&mut self, event: InputEvent) {
        if self.state.phase != Phase::AwaitingUserSpeech {
            return;
        }
        let Some(turn) = self.turn.as_mut().filter(|t| t.kind == TurnKind::User) else {
            return;
        };

        match event {
            InputEvent::Started | InputEvent::SpeechEnded => {
                tracing::trace!(?event, "Speech input");
            }
            InputEvent::SpeechDetected => {
                turn.speech_detected = true;
                tracing::debug!(tag = %turn.tag, "Speech detected; grace timer cancelled");
                self.disarm_grace();
            }
            InputEvent::FinalTranscript(text) => {
                turn.listening = false;
                let attempt = self.score_transcript(&text);
                self.resolve_user_line(attempt).await;
            }
            InputEvent::Error(e) => {
                let (tag, detected, armed) = (turn.tag, turn.speech_detected, turn.grace_armed);
                self.recognition_failed(&e);
                if e == SpeechError::RecognitionUnavailable {
                    // Manual advance only from here on.
                    self.disarm_grace();
                } else if detected {
                    self.resolve_user_line(0).await;
                } else if !armed {
                    self.arm_grace(tag);
                }
            }
            InputEvent::Ended => {
                turn.listening = false;
                if turn.speech_detected {
                    self.resolve_user_line(0).await;
                } else {
                    tracing::debug!(tag = %turn.tag, "Listening ended without speech");
                }
            }
        }
    }

    async fn handle_timer(&mut self, fired: TimerFired) {
        if !self.is_current(fired.tag) {
            tracing::trace!(tag = %fired.tag, kind = ?fired.kind, "Stale timer dropped");
            return;
        }
        match fired.kind {
            TimerKind::LeadIn => self.speak_partner_line(fired.tag).await,
            TimerKind::GraceTick { remaining } => self.grace_tick(remaining).await,
            TimerKind::ResultShown => self.result_shown().await,
        }
    }

    async fn grace_tick(&mut self, remaining: u32) {
        if !self.turn.as_ref().is_some_and(|t| t.grace_armed) {
            return;
        }
        self.state.countdown = remaining;
        if remaining == 0 {
            tracing::info!(line = self.state.current_line_index, "No speech before grace timeout");
            self.grace = None;
            self.resolve_user_line(0).await;
        }
    }
}
