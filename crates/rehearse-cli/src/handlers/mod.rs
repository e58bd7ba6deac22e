//! Command handlers.
//!
//! Each handler takes the composed [`CliContext`](crate::CliContext) and its
//! parsed arguments.

pub mod config;
pub mod practice;
pub mod progress;

use std::path::Path;

use rehearse_core::Script;

use crate::error::CliError;

/// Read and validate a script file.
pub fn load_script(path: &Path) -> Result<Script, CliError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("cannot read {}: {e}", path.display())))?;
    Ok(Script::from_json_str(&json)?)
}
