//! Subcommand definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use rehearse_core::{Fidelity, PracticeMode, ResultAdvancePolicy};

#[derive(Subcommand)]
pub enum Commands {
    /// Run a practice session
    Practice(PracticeArgs),
    /// View or change practice settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Show saved progress for a script and character
    Progress {
        /// Script file, or the script title used as its id
        script: String,
        /// Character whose progress to show
        #[arg(long, short = 'c')]
        character: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct PracticeArgs {
    /// Script file (JSON with `title` and `lines`)
    pub script: PathBuf,

    /// Character you are rehearsing
    #[arg(long, short = 'c')]
    pub character: String,

    /// Line index to start at (default: where you left off)
    #[arg(long)]
    pub from: Option<usize>,

    /// Practice mode for this session (auto|manual)
    #[arg(long)]
    pub mode: Option<PracticeMode>,

    /// Ignore saved progress and start clean
    #[arg(long)]
    pub fresh: bool,

    /// Do not sync progress to the remote service
    #[arg(long)]
    pub offline: bool,
}

/// Settings command variants.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show all current practice settings
    Show,
    /// Update practice settings
    Set(SettingsArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Scoring fidelity (exact|semantic|loose)
    #[arg(long)]
    pub fidelity: Option<Fidelity>,
    /// Seconds to wait for you to start speaking (3-15)
    #[arg(long)]
    pub grace_timeout: Option<u32>,
    /// Default practice mode (auto|manual)
    #[arg(long)]
    pub mode: Option<PracticeMode>,
    /// Language tag for voices and recognition, e.g. en-GB
    #[arg(long)]
    pub language: Option<String>,
    /// Per-word edit tolerance for semantic scoring (0.0-1.0)
    #[arg(long)]
    pub tolerance: Option<f32>,
    /// Words semantic scoring skips, comma-separated
    #[arg(long, value_delimiter = ',', conflicts_with = "no_stop_words")]
    pub stop_words: Option<Vec<String>>,
    /// Score every word of three or more letters
    #[arg(long)]
    pub no_stop_words: bool,
    /// Minimum score for a line to count as completed (1-100)
    #[arg(long)]
    pub threshold: Option<u8>,
    /// What "next" does while a result is shown (accept|ignore)
    #[arg(long, value_parser = parse_policy)]
    pub result_advance: Option<ResultAdvancePolicy>,
    /// Base URL of the remote progress service
    #[arg(long, conflicts_with = "clear_sync_url")]
    pub sync_url: Option<String>,
    /// Stop syncing progress remotely
    #[arg(long)]
    pub clear_sync_url: bool,
    /// Assign a voice to a character, as CHARACTER=VOICE_ID (repeatable)
    #[arg(long = "voice", value_parser = parse_voice_assignment)]
    pub voices: Vec<(String, String)>,
    /// Remove a character's voice settings (repeatable)
    #[arg(long = "clear-voice")]
    pub clear_voices: Vec<String>,
}

fn parse_policy(s: &str) -> Result<ResultAdvancePolicy, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "accept" => Ok(ResultAdvancePolicy::Accept),
        "ignore" => Ok(ResultAdvancePolicy::Ignore),
        other => Err(format!("unknown policy '{other}' (expected accept|ignore)")),
    }
}

fn parse_voice_assignment(s: &str) -> Result<(String, String), String> {
    let (character, voice) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CHARACTER=VOICE_ID, got '{s}'"))?;
    let (character, voice) = (character.trim(), voice.trim());
    if character.is_empty() || voice.is_empty() {
        return Err(format!("expected CHARACTER=VOICE_ID, got '{s}'"));
    }
    Ok((character.to_string(), voice.to_string()))
}
