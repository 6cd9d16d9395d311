//! Configuration management

use crate::error::{LinktagError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = ".linktag.toml";

const KNOWN_KEYS: &[&str] = &[
    "directory",
    "include_patterns",
    "exclude_patterns",
    "max_file_size",
    "output_report",
    "rename_similarity",
    "vcs_timeout_secs",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Only files within this directory are scanned
    pub directory: PathBuf,
    /// Globs a file must match to be scanned
    pub include_patterns: Vec<String>,
    /// Globs for files and directories to leave out
    pub exclude_patterns: Vec<String>,
    /// Files larger than this many bytes are skipped
    pub max_file_size: u64,
    /// Where to write the JSON report, if anywhere
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_report: Option<PathBuf>,
    /// Minimum similarity percentage for git to report a rename
    pub rename_similarity: u8,
    pub vcs_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            directory: PathBuf::from("."),
            include_patterns: vec!["*".to_string()],
            exclude_patterns: vec![".git".to_string(), "target".to_string()],
            max_file_size: 1024 * 1024,
            output_report: None,
            rename_similarity: 50,
            vcs_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    ///
    /// A missing file is not an error: defaults are used.
    /// Unknown keys are ignored with a warning.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(
                    path = %path.display(),
                    "config file does not exist, using defaults"
                );
                return Ok(Config::default());
            }
            Err(e) => return Err(LinktagError::Io(e)),
        };

        Self::parse(&contents).map_err(|e| {
            LinktagError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Parse config from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(contents)?;
        for key in table.keys() {
            if !KNOWN_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %key, "unknown config key, ignoring it");
            }
        }

        let config: Config = table.try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Write config as TOML, failing if the file already exists
    pub fn save_new(&self, path: &Path) -> Result<()> {
        if path.exists() {
            return Err(LinktagError::Config(format!(
                "Config file already exists: {}",
                path.display()
            )));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.rename_similarity > 100 {
            return Err(LinktagError::Config(format!(
                "rename_similarity must be between 0 and 100, got {}",
                self.rename_similarity
            )));
        }
        if self.vcs_timeout_secs == 0 {
            return Err(LinktagError::Config(
                "vcs_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
