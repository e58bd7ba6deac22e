//! Data directory resolution.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CliError;

const APP_DIR: &str = "rehearse";
const DATABASE_FILE: &str = "rehearse.db";

/// Resolve and create the data directory.
///
/// An explicit directory (flag or `REHEARSE_DATA_DIR`) wins; otherwise the
/// platform's local data directory is used.
pub fn data_root(explicit: Option<&Path>) -> Result<PathBuf, CliError> {
    let root = match explicit {
        Some(path) => path.to_path_buf(),
        None => dirs::data_local_dir()
            .ok_or_else(|| CliError::Config("no local data directory on this platform".into()))?
            .join(APP_DIR),
    };

    fs::create_dir_all(&root)
        .map_err(|e| CliError::Io(format!("cannot create {}: {e}", root.display())))?;
    Ok(root)
}

/// Location of the progress database under `root`.
pub fn database_path(root: &Path) -> PathBuf {
    root.join(DATABASE_FILE)
}
