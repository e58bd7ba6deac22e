//! Scripted collaborators for driving a session under paused time.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rehearse_core::{
    InputEvent, OutputEvent, PracticeSettings, PracticeState, ProgressKey, ProgressSnapshot,
    ProgressStore, RepositoryError, Script, ScriptLine, SignalSink, SpeakRequest, SpeechError,
    SpeechInput, SpeechOutput, Speaker,
};
use rehearse_session::{PracticeSession, SessionConfig, SessionEvent, SessionHandle};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub const HAMLET: &str = "HAMLET";

/// Bernardo, Francisco, Hamlet, Horatio, Hamlet.
pub fn five_line_script() -> Arc<Script> {
    let lines = [
        ("BERNARDO", "Who's there?"),
        ("FRANCISCO", "Nay, answer me. Stand and unfold yourself."),
        (HAMLET, "A little more than kin and less than kind."),
        ("HORATIO", "My lord, I came to see your father's funeral."),
        (HAMLET, "Thrift, thrift, Horatio."),
    ]
    .into_iter()
    .enumerate()
    .map(|(index, (who, text))| ScriptLine {
        id: format!("line-{index}"),
        character: Speaker::One(who.to_string()),
        text: text.to_string(),
        index,
        act_number: 1,
        scene_number: if index < 2 { 1 } else { 2 },
    })
    .collect();
    Arc::new(Script::new("hamlet", lines).unwrap())
}

/// Settings with a 5 second grace timeout.
pub fn settings() -> PracticeSettings {
    PracticeSettings {
        grace_timeout_secs: 5,
        ..PracticeSettings::default()
    }
}

// ── Speech output ──────────────────────────────────────────────────

struct Playing {
    sink: SignalSink,
    task: JoinHandle<()>,
}

/// Speaks every line for a fixed duration.
pub struct FakeOutput {
    duration: Duration,
    fail_lines: Vec<String>,
    error_lines: Vec<String>,
    spoken: Mutex<Vec<String>>,
    stops: Mutex<usize>,
    playing: Mutex<Option<Playing>>,
}

impl FakeOutput {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            fail_lines: Vec::new(),
            error_lines: Vec::new(),
            spoken: Mutex::new(Vec::new()),
            stops: Mutex::new(0),
            playing: Mutex::new(None),
        }
    }

    /// `speak` itself fails for lines containing `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_lines.push(needle.to_string());
        self
    }

    /// Lines containing `needle` report an error instead of ending.
    pub fn erroring_on(mut self, needle: &str) -> Self {
        self.error_lines.push(needle.to_string());
        self
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        *self.stops.lock().unwrap()
    }
}

#[async_trait]
impl SpeechOutput for FakeOutput {
    async fn speak(&self, request: SpeakRequest, sink: SignalSink) -> Result<(), SpeechError> {
        self.stop().await?;
        if self.fail_lines.iter().any(|n| request.text.contains(n.as_str())) {
            return Err(SpeechError::Synthesis("engine refused".into()));
        }
        self.spoken.lock().unwrap().push(request.text.clone());

        let errors = self.error_lines.iter().any(|n| request.text.contains(n.as_str()));
        let duration = self.duration;
        let events = sink.clone();
        let task = tokio::spawn(async move {
            events.output(OutputEvent::Started);
            tokio::time::sleep(duration).await;
            if errors {
                events.output(OutputEvent::Error(SpeechError::Synthesis("glitch".into())));
            } else {
                events.output(OutputEvent::Ended);
            }
        });
        *self.playing.lock().unwrap() = Some(Playing { sink, task });
        Ok(())
    }

    async fn stop(&self) -> Result<(), SpeechError> {
        *self.stops.lock().unwrap() += 1;
        let playing = self.playing.lock().unwrap().take();
        if let Some(playing) = playing {
            if !playing.task.is_finished() {
                playing.task.abort();
                // Mirrors a real engine: an interrupted utterance still ends.
                playing.sink.output(OutputEvent::Ended);
            }
        }
        Ok(())
    }
}

// ── Speech input ───────────────────────────────────────────────────

/// Replays a scripted recognition session per line.
#[derive(Default)]
pub struct FakeInput {
    plans: HashMap<usize, Vec<(Duration, InputEvent)>>,
    start_error: Option<SpeechError>,
    starts: Mutex<Vec<usize>>,
    stops: Mutex<usize>,
    resets: Mutex<usize>,
    listening: Mutex<Option<(SignalSink, JoinHandle<()>)>>,
}

impl FakeInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `start_listening` fails with `error`.
    pub fn failing_with(error: SpeechError) -> Self {
        Self {
            start_error: Some(error),
            ..Self::default()
        }
    }

    /// When listening for `line`, emit each event after its delay
    /// (measured from the previous event).
    pub fn plan(mut self, line: usize, events: Vec<(Duration, InputEvent)>) -> Self {
        self.plans.insert(line, events);
        self
    }

    /// When listening for `line`, the user says `text` after `after`.
    pub fn says(self, line: usize, after: Duration, text: &str) -> Self {
        self.plan(
            line,
            vec![
                (after, InputEvent::SpeechDetected),
                (Duration::from_millis(800), InputEvent::SpeechEnded),
                (Duration::ZERO, InputEvent::FinalTranscript(text.to_string())),
                (Duration::ZERO, InputEvent::Ended),
            ],
        )
    }

    /// Line indices `start_listening` was called for, in order.
    pub fn starts(&self) -> Vec<usize> {
        self.starts.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        *self.stops.lock().unwrap()
    }

    pub fn resets(&self) -> usize {
        *self.resets.lock().unwrap()
    }
}

#[async_trait]
impl SpeechInput for FakeInput {
    async fn start_listening(&self, sink: SignalSink) -> Result<(), SpeechError> {
        let line = sink.tag().line;
        self.starts.lock().unwrap().push(line);
        if let Some(error) = &self.start_error {
            return Err(error.clone());
        }

        let plan = self.plans.get(&line).cloned().unwrap_or_default();
        let events = sink.clone();
        let task = tokio::spawn(async move {
            events.input(InputEvent::Started);
            for (delay, event) in plan {
                tokio::time::sleep(delay).await;
                events.input(event);
            }
        });
        *self.listening.lock().unwrap() = Some((sink, task));
        Ok(())
    }

    async fn stop_listening(&self) -> Result<(), SpeechError> {
        *self.stops.lock().unwrap() += 1;
        let listening = self.listening.lock().unwrap().take();
        if let Some((sink, task)) = listening {
            if !task.is_finished() {
                task.abort();
                sink.input(InputEvent::Ended);
            }
        }
        Ok(())
    }

    fn reset_transcript(&self) {
        *self.resets.lock().unwrap() += 1;
    }
}

// ── Progress store ─────────────────────────────────────────────────

/// Keeps every saved snapshot.
#[derive(Default)]
pub struct RecordingStore {
    fail: bool,
    saved: Mutex<Vec<(ProgressSnapshot, bool)>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save fails.
    pub fn broken() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn saved(&self) -> Vec<(ProgressSnapshot, bool)> {
        self.saved.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<ProgressSnapshot> {
        self.saved.lock().unwrap().last().map(|(s, _)| s.clone())
    }
}

#[async_trait]
impl ProgressStore for RecordingStore {
    async fn save(
        &self,
        snapshot: &ProgressSnapshot,
        persistable: bool,
    ) -> Result<(), RepositoryError> {
        if self.fail {
            return Err(RepositoryError::Storage("disk full".into()));
        }
        self.saved
            .lock()
            .unwrap()
            .push((snapshot.clone(), persistable));
        Ok(())
    }

    async fn load(&self, key: &ProgressKey) -> Result<Option<ProgressSnapshot>, RepositoryError> {
        Ok(self
            .saved
            .lock()
            .unwrap()
            .iter()
            .rev()
            .map(|(s, _)| s)
            .find(|s| s.key() == *key)
            .cloned())
    }
}

// ── Harness ────────────────────────────────────────────────────────

pub struct Harness {
    pub session: SessionHandle,
    pub events: mpsc::UnboundedReceiver<SessionEvent>,
    pub output: Arc<FakeOutput>,
    pub input: Arc<FakeInput>,
    pub store: Arc<RecordingStore>,
    pub state: watch::Receiver<PracticeState>,
}

impl Harness {
    pub fn spawn(
        config: SessionConfig,
        output: FakeOutput,
        input: FakeInput,
        store: RecordingStore,
    ) -> Self {
        let output = Arc::new(output);
        let input = Arc::new(input);
        let store = Arc::new(store);
        let (session, events) = PracticeSession::spawn(
            config,
            Arc::clone(&output) as Arc<dyn SpeechOutput>,
            Arc::clone(&input) as Arc<dyn SpeechInput>,
            Arc::clone(&store) as Arc<dyn ProgressStore>,
        );
        let state = session.subscribe();
        Self {
            session,
            events,
            output,
            input,
            store,
            state,
        }
    }

    /// Hamlet on the five-line script with [`settings`].
    pub fn hamlet(output: FakeOutput, input: FakeInput) -> Self {
        let config = SessionConfig::new(five_line_script(), HAMLET).with_settings(settings());
        Self::spawn(config, output, input, RecordingStore::new())
    }

    /// Wait (in virtual time) until `pred` holds for the published state.
    pub async fn wait_for(&mut self, pred: impl Fn(&PracticeState) -> bool) -> PracticeState {
        tokio::time::timeout(Duration::from_secs(120), self.state.wait_for(|s| pred(s)))
            .await
            .expect("state never reached")
            .expect("session ended")
            .clone()
    }

    /// Let the coordinator run for `d` of virtual time.
    pub async fn run_for(&self, d: Duration) {
        tokio::time::sleep(d).await;
    }

    /// Every event received so far.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

pub fn completions(events: &[SessionEvent]) -> Vec<&ProgressSnapshot> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Completed(s) => Some(s),
            _ => None,
        })
        .collect()
}
