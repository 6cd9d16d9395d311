//! Error types for linktag

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors that abort a linktag run.
///
/// Per-file and per-group problems never surface here; they accumulate in the
/// [`Report`](crate::domain::report::Report) instead.
#[derive(Debug, Error)]
pub enum LinktagError {
    #[error("Scan root not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Not a git repository: {0}")]
    NotARepository(PathBuf),

    #[error("Unknown revision: {0}")]
    BadRevision(String),

    #[error("VCS error: {0}")]
    Vcs(String),

    #[error("VCS command timed out after {timeout_secs}s: {command}")]
    VcsTimeout { command: String, timeout_secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LinktagError {
    /// Get the exit code for this error
    ///
    /// Code 1 is reserved for a completed check that found failures.
    pub fn exit_code(&self) -> i32 {
        match self {
            LinktagError::RootNotFound(_) => 3,
            LinktagError::NotARepository(_)
            | LinktagError::BadRevision(_)
            | LinktagError::Vcs(_)
            | LinktagError::VcsTimeout { .. } => 4,
            _ => 2,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn display_with_suggestions(&self) -> String {
        match self {
            LinktagError::RootNotFound(path) => {
                format!(
                    "Scan root not found: {}\n\n\
                    Suggestions:\n\
                    • Check the 'directory' key in .linktag.toml\n\
                    • Pass an existing directory with --directory",
                    path.display()
                )
            }
            LinktagError::NotARepository(path) => {
                format!(
                    "Not a git repository: {}\n\n\
                    Suggestions:\n\
                    • Run linktag from inside a git work tree\n\
                    • Use 'linktag check --no-vcs' to check tag structure only",
                    path.display()
                )
            }
            LinktagError::BadRevision(rev) => {
                format!(
                    "Unknown revision: '{}'\n\n\
                    Suggestions:\n\
                    • Check the spelling of the branch, tag or commit\n\
                    • In CI, fetch enough history (e.g. fetch-depth: 0)\n\n\
                    Examples:\n\
                    linktag check --commit HEAD\n\
                    linktag check --base origin/main --head HEAD",
                    rev
                )
            }
            LinktagError::VcsTimeout { .. } => {
                format!(
                    "{}\n\n\
                    Suggestions:\n\
                    • Raise 'vcs_timeout_secs' in .linktag.toml",
                    self
                )
            }
            _ => self.to_string(),
        }
    }
}

/// Result type using LinktagError
pub type Result<T> = std::result::Result<T, LinktagError>;
