use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Platform data directory for levy, created if missing.
pub fn data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("ng", "levy", "levy")
        .context("could not determine a platform data directory; set LEVY_DATA_DIR")?;
    let dir = dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&dir).context("create data dir")?;
    Ok(dir)
}
