//! Config command handler.

use anyhow::Result;
use rehearse_core::{PracticeSettingsUpdate, VoiceProfile};

use crate::bootstrap::CliContext;
use crate::commands::{ConfigCommand, SettingsArgs};
use crate::error::CliError;

pub async fn execute(ctx: &CliContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let settings = ctx.settings.get().await.map_err(CliError::from)?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            println!("\nDatabase: {}", ctx.database_path.display());
        }
        ConfigCommand::Set(args) => {
            let update = build_update(args);
            let settings = ctx.settings.update(update).await.map_err(CliError::from)?;
            println!("✓ Settings updated.");
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}

fn build_update(args: SettingsArgs) -> PracticeSettingsUpdate {
    let mut update = PracticeSettingsUpdate {
        fidelity: args.fidelity,
        grace_timeout_secs: args.grace_timeout,
        default_mode: args.mode,
        language_tag: args.language,
        semantic_tolerance: args.tolerance,
        semantic_stop_words: if args.no_stop_words {
            Some(Vec::new())
        } else {
            args.stop_words
        },
        completion_threshold: args.threshold,
        result_advance_policy: args.result_advance,
        sync_url: if args.clear_sync_url {
            Some(None)
        } else {
            args.sync_url.map(Some)
        },
        ..PracticeSettingsUpdate::default()
    };
    for (character, voice) in args.voices {
        update
            .voice_profiles
            .insert(character, Some(VoiceProfile::with_voice(voice)));
    }
    for character in args.clear_voices {
        update.voice_profiles.insert(character, None);
    }
    update
}
