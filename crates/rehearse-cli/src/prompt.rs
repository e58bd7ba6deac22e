//! Typed input during a practice session.
//!
//! Lines starting with `:` are session commands; anything else is what the
//! user "said" for the current line.

use rehearse_core::PracticeMode;

pub const HELP: &str = "\
  :next  :prev  :pause  :resume  :retry  :jump N  :mode auto|manual  :quit
  Anything else is your line.";

/// Session commands available from the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptCommand {
    Start,
    Next,
    Previous,
    Pause,
    Resume,
    Retry,
    /// 1-based line number as shown to the user.
    Jump(usize),
    Mode(PracticeMode),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptInput {
    Empty,
    Command(PromptCommand),
    Speech(String),
    Invalid(String),
}

pub fn parse(line: &str) -> PromptInput {
    let line = line.trim();
    if line.is_empty() {
        return PromptInput::Empty;
    }
    let Some(command) = line.strip_prefix(':') else {
        return PromptInput::Speech(line.to_string());
    };

    let mut words = command.split_whitespace();
    let name = words.next().unwrap_or_default().to_ascii_lowercase();
    let argument = words.next();

    let parsed = match (name.as_str(), argument) {
        ("start" | "play", None) => PromptCommand::Start,
        ("next" | "n", None) => PromptCommand::Next,
        ("prev" | "previous" | "p", None) => PromptCommand::Previous,
        ("pause", None) => PromptCommand::Pause,
        ("resume" | "r", None) => PromptCommand::Resume,
        ("retry", None) => PromptCommand::Retry,
        ("help" | "h" | "?", None) => PromptCommand::Help,
        ("quit" | "q" | "exit", None) => PromptCommand::Quit,
        ("jump" | "j", Some(n)) => match n.parse::<usize>() {
            Ok(n) if n > 0 => PromptCommand::Jump(n),
            _ => return PromptInput::Invalid(format!("not a line number: {n}")),
        },
        ("mode", Some(mode)) => match mode.parse() {
            Ok(mode) => PromptCommand::Mode(mode),
            Err(e) => return PromptInput::Invalid(e),
        },
        _ => return PromptInput::Invalid(format!("unknown command: {line}")),
    };
    PromptInput::Command(parsed)
}
