//! Initialize configuration use case

use crate::error::Result;
use crate::infrastructure::config::{Config, CONFIG_FILE};
use std::fs;
use std::path::{Path, PathBuf};

/// Write a default `.linktag.toml` into `path`, returning the file written.
pub fn init(path: &Path) -> Result<PathBuf> {
    // Create the directory if it doesn't exist
    if !path.exists() {
        fs::create_dir_all(path)?;
    }

    let config_path = path.join(CONFIG_FILE);
    Config::default().save_new(&config_path)?;

    tracing::debug!(path = %config_path.display(), "wrote default config");
    Ok(config_path)
}
