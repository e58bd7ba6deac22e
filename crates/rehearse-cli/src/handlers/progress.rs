//! Progress command handler.

use std::path::Path;

use anyhow::Result;
use rehearse_core::{ProgressKey, ProgressStore};

use super::load_script;
use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::{format_progress, format_summary};

/// Print saved progress.
///
/// `script` may be a script file, in which case the per-line summary is
/// shown, or a bare script id.
pub async fn execute(ctx: &CliContext, script: &str, character: &str) -> Result<()> {
    let path = Path::new(script);
    let loaded = if path.is_file() {
        Some(load_script(path)?)
    } else {
        None
    };
    let script_id = loaded.as_ref().map_or(script, |s| s.id());

    let key = ProgressKey::new(script_id, character);
    let Some(snapshot) = ctx.progress.load(&key).await.map_err(CliError::from)? else {
        println!("No saved progress for {character} in {script_id}.");
        return Ok(());
    };

    println!("{}", format_progress(&snapshot));
    if let Some(script) = &loaded {
        println!("{}", format_summary(script, character, &snapshot));
    }
    Ok(())
}
