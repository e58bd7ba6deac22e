//! Practice command handler.
//!
//! Runs one session on the console engines. Partner lines are printed and
//! held for their speaking time; the user types their own lines, which are
//! fed to the recognizer as if spoken.

use std::sync::Arc;

use anyhow::Result;
use rehearse_core::{
    PracticeState, ProgressKey, ProgressSnapshot, ProgressStore, Script, SpeechInput, SpeechOutput,
};
use rehearse_session::{PracticeSession, SessionConfig, SessionEvent, SessionHandle};
use rehearse_voice::{
    ConsoleRecognition, ConsoleSynthesis, EchoGate, EngineVoice, SpeechInputAdapter,
    SpeechOutputAdapter, TranscriptFeeder,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::load_script;
use crate::bootstrap::CliContext;
use crate::commands::PracticeArgs;
use crate::error::CliError;
use crate::presentation::{describe_transition, format_summary};
use crate::prompt::{self, HELP, PromptCommand, PromptInput};

/// Voices offered by the console synthesizer.
fn console_voices() -> Vec<EngineVoice> {
    vec![
        EngineVoice::new("console-en-us", "en-US"),
        EngineVoice::new("console-en-gb", "en-GB"),
    ]
}

pub async fn execute(ctx: &CliContext, args: PracticeArgs) -> Result<()> {
    let script = Arc::new(load_script(&args.script)?);
    script
        .ensure_character(&args.character)
        .map_err(CliError::from)?;

    let mut settings = ctx.settings.get().await.map_err(CliError::from)?;
    if let Some(mode) = args.mode {
        settings.default_mode = mode;
    }

    let saved = if args.fresh {
        None
    } else {
        load_saved(ctx, &script, &args.character).await
    };
    let start = resolve_start(args.from, saved.as_ref(), script.len())?;

    let gate = EchoGate::new();
    let (recognition, feeder) = ConsoleRecognition::new();
    let output: Arc<dyn SpeechOutput> = Arc::new(SpeechOutputAdapter::new(
        Arc::new(ConsoleSynthesis::new(console_voices())),
        gate.clone(),
    ));
    let input: Arc<dyn SpeechInput> = Arc::new(SpeechInputAdapter::new(
        Arc::new(recognition),
        gate,
        settings.language_tag.clone(),
    ));

    let config = SessionConfig::new(Arc::clone(&script), args.character.clone())
        .starting_at(start)
        .with_settings(settings)
        .restoring(saved);
    let store: Arc<dyn ProgressStore> = ctx.progress.clone();
    let (session, events) = PracticeSession::spawn(config, output, input, store);

    println!(
        "Rehearsing {} as {} from line {} ({} lines).",
        script.id(),
        args.character,
        start + 1,
        script.len()
    );
    println!("{HELP}");
    session.start().map_err(CliError::from)?;

    let completed = run_console(&session, events, &feeder, &args.character).await?;

    let snapshot = session.shutdown().await.map_err(CliError::from)?;
    let final_snapshot = completed.unwrap_or(snapshot);
    println!("{}", format_summary(&script, &args.character, &final_snapshot));
    Ok(())
}

/// Saved progress for this script and character, if any.
async fn load_saved(ctx: &CliContext, script: &Script, character: &str) -> Option<ProgressSnapshot> {
    let key = ProgressKey::new(script.id(), character);
    match ctx.progress.load(&key).await {
        Ok(saved) => saved,
        Err(e) => {
            tracing::warn!(error = %e, "Saved progress unavailable; starting fresh");
            None
        }
    }
}

/// Line to begin at: `--from` wins, then the saved position, then the top.
fn resolve_start(
    from: Option<usize>,
    saved: Option<&ProgressSnapshot>,
    line_count: usize,
) -> Result<usize, CliError> {
    match from {
        Some(index) if index >= line_count => Err(CliError::Arguments(format!(
            "--from {index} is past the last line ({})",
            line_count.saturating_sub(1)
        ))),
        Some(index) => Ok(index),
        None => Ok(saved.map_or(0, |s| s.last_line_index.min(line_count.saturating_sub(1)))),
    }
}

/// Drive the session from stdin until it completes or the user quits.
///
/// Returns the completion snapshot when the script was finished.
async fn run_console(
    session: &SessionHandle,
    mut events: tokio::sync::mpsc::UnboundedReceiver<SessionEvent>,
    feeder: &TranscriptFeeder,
    character: &str,
) -> Result<Option<ProgressSnapshot>> {
    let mut state = session.subscribe();
    let mut shown: Option<PracticeState> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    return Ok(None);
                }
                let current = state.borrow_and_update().clone();
                if let Some(text) = describe_transition(shown.as_ref(), &current, character) {
                    println!("{text}");
                }
                shown = Some(current);
            }
            event = events.recv() => match event {
                Some(SessionEvent::Completed(snapshot)) => {
                    println!("\nEnd of script.");
                    return Ok(Some(snapshot));
                }
                Some(SessionEvent::RecognitionUnavailable) => {
                    println!("  (speech recognition unavailable: use :next to move past your lines)");
                }
                Some(SessionEvent::PermissionDenied) => {
                    println!("  (microphone access denied: your lines will time out)");
                }
                Some(SessionEvent::PersistenceDegraded) => {
                    println!("  (progress could not be saved)");
                }
                Some(SessionEvent::ProgressUpdated(snapshot)) => {
                    tracing::debug!(line = snapshot.last_line_index, "Progress saved");
                }
                None => return Ok(None),
            },
            line = lines.next_line() => {
                let Some(line) = line? else {
                    return Ok(None);
                };
                match prompt::parse(&line) {
                    PromptInput::Empty => {}
                    PromptInput::Speech(text) => {
                        if !feeder.say(&text) {
                            println!("  (not listening right now)");
                        }
                    }
                    PromptInput::Command(PromptCommand::Quit) => return Ok(None),
                    PromptInput::Command(PromptCommand::Help) => println!("{HELP}"),
                    PromptInput::Command(command) => apply(session, command)?,
                    PromptInput::Invalid(reason) => println!("  {reason}\n{HELP}"),
                }
            }
        }
    }
}

fn apply(session: &SessionHandle, command: PromptCommand) -> Result<(), CliError> {
    match command {
        PromptCommand::Start => session.start(),
        PromptCommand::Next => session.next(),
        PromptCommand::Previous => session.previous(),
        PromptCommand::Pause => session.pause(),
        PromptCommand::Resume => session.resume(),
        PromptCommand::Retry => session.retry_current_line(),
        PromptCommand::Jump(number) => session.jump_to_line(number - 1),
        PromptCommand::Mode(mode) => session.set_mode(mode),
        PromptCommand::Help | PromptCommand::Quit => Ok(()),
    }
    .map_err(CliError::from)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;

    fn saved_at(line: usize) -> ProgressSnapshot {
        ProgressSnapshot {
            script_id: "Hamlet".into(),
            character: "HAMLET".into(),
            last_act_number: 1,
            last_scene_number: 2,
            last_line_index: line,
            completed_lines: vec![],
            accuracy_scores: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn explicit_start_wins_over_saved_position() {
        assert_eq!(resolve_start(Some(3), Some(&saved_at(7)), 10).unwrap(), 3);
    }

    #[test]
    fn saved_position_is_resumed_and_clamped() {
        assert_eq!(resolve_start(None, Some(&saved_at(7)), 10).unwrap(), 7);
        assert_eq!(resolve_start(None, Some(&saved_at(40)), 10).unwrap(), 9);
        assert_eq!(resolve_start(None, None, 10).unwrap(), 0);
    }

    #[test]
    fn start_past_the_end_is_rejected() {
        let err = resolve_start(Some(10), None, 10).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
