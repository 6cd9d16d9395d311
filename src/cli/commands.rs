//! CLI command definitions

use crate::domain::change_set::Comparison;
use crate::infrastructure::Config;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "linktag")]
#[command(about = "Check that linked tags across a codebase change together", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true, default_value = ".linktag.toml")]
    pub config: PathBuf,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the scan settings in the config file
#[derive(Args, Debug, Default)]
pub struct ScanArgs {
    /// Only files within this directory are scanned
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Glob for files to include (repeatable; replaces the config list)
    #[arg(long = "include", value_name = "GLOB")]
    pub include_patterns: Vec<String>,

    /// Glob for files or directories to exclude (repeatable; replaces the config list)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude_patterns: Vec<String>,

    /// Skip files larger than this many bytes
    #[arg(long, value_name = "BYTES")]
    pub max_file_size: Option<u64>,
}

impl ScanArgs {
    /// Apply command-line values over a loaded config
    pub fn apply(&self, config: &mut Config) {
        if let Some(directory) = &self.directory {
            config.directory = directory.clone();
        }
        if !self.include_patterns.is_empty() {
            config.include_patterns = self.include_patterns.clone();
        }
        if !self.exclude_patterns.is_empty() {
            config.exclude_patterns = self.exclude_patterns.clone();
        }
        if let Some(size) = self.max_file_size {
            config.max_file_size = size;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan for linked tags and check their change policy
    Check {
        #[command(flatten)]
        scan: ScanArgs,

        /// Check the changes made by this commit
        #[arg(long, value_name = "REV", conflicts_with_all = ["base", "no_vcs"])]
        commit: Option<String>,

        /// Compare from this revision (default: HEAD against the working tree)
        #[arg(long, value_name = "REV", conflicts_with = "no_vcs")]
        base: Option<String>,

        /// Compare up to this revision instead of the working tree
        #[arg(long, value_name = "REV", requires = "base")]
        head: Option<String>,

        /// Only check tag structure, without looking at version control
        #[arg(long)]
        no_vcs: bool,

        /// Write a JSON report to this path
        #[arg(long, value_name = "PATH")]
        output_report: Option<PathBuf>,

        /// Print the JSON report to stdout instead of a summary
        #[arg(long)]
        json: bool,

        /// Treat configuration warnings as failures
        #[arg(long)]
        strict: bool,
    },

    /// List link groups and their tags
    Tags {
        #[command(flatten)]
        scan: ScanArgs,

        /// Only show groups whose id contains this text
        #[arg(value_name = "FILTER")]
        filter: Option<String>,
    },

    /// Write a default .linktag.toml
    Init {
        /// Directory to initialize (default: current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

/// Pick the comparison requested by the check flags
pub fn comparison_from_flags(
    commit: Option<String>,
    base: Option<String>,
    head: Option<String>,
    no_vcs: bool,
) -> Option<Comparison> {
    if no_vcs {
        return None;
    }
    Some(match (commit, base, head) {
        (Some(rev), _, _) => Comparison::Commit { rev },
        (None, Some(base), Some(head)) => Comparison::Range { base, head },
        (None, Some(base), None) => Comparison::WorkingTree { base },
        (None, None, _) => Comparison::WorkingTree {
            base: "HEAD".to_string(),
        },
    })
}
