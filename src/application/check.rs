//! Check use case
//!
//! Orchestrates a full run: scan files (at the "after" commit for commit and
//! range checks) and compute the change set side by side, resolve tags into
//! groups, evaluate policies and assemble the report.

use crate::domain::change_set::{ChangeSet, Comparison};
use crate::domain::policy::PolicyEvaluator;
use crate::domain::report::{Report, ReportAssembler};
use crate::domain::tags::TagResolver;
use crate::error::{LinktagError, Result};
use crate::infrastructure::change_provider::ChangeSetProvider;
use crate::infrastructure::scanner::{FileScanner, ScanOptions, ScanOutput};
use crate::infrastructure::vcs::VersionControl;
use crate::infrastructure::Config;
use std::path::PathBuf;
use std::thread;

/// Options for a check run
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Scan root
    pub root: PathBuf,

    pub scan: ScanOptions,

    /// Version comparison; `None` checks tag structure only
    pub comparison: Option<Comparison>,

    /// Minimum rename similarity percentage
    pub rename_similarity: u8,
}

impl CheckOptions {
    /// Build options from an effective configuration
    pub fn from_config(config: &Config, comparison: Option<Comparison>) -> Self {
        CheckOptions {
            root: config.directory.clone(),
            scan: ScanOptions {
                include_patterns: config.include_patterns.clone(),
                exclude_patterns: config.exclude_patterns.clone(),
                max_file_size: config.max_file_size,
            },
            comparison,
            rename_similarity: config.rename_similarity,
        }
    }
}

/// Service for checking linked tags against a change policy
pub struct CheckService<V: VersionControl> {
    vcs: Option<V>,
}

impl<V: VersionControl> CheckService<V> {
    /// Create a new check service.
    ///
    /// `vcs` may be `None` only for runs without a comparison.
    pub fn new(vcs: Option<V>) -> Self {
        CheckService { vcs }
    }

    /// Execute the check
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The scan root does not exist, or a glob pattern is invalid
    /// - A comparison is requested without a version-control backend
    /// - A revision cannot be resolved, or a VCS command fails or times out
    pub fn execute(&self, options: &CheckOptions) -> Result<Report> {
        let scanner = FileScanner::new(&options.root, &options.scan)?;

        let provider = match (&options.comparison, &self.vcs) {
            (Some(_), Some(vcs)) => Some(ChangeSetProvider::new(vcs, options.rename_similarity)),
            (Some(_), None) => {
                return Err(LinktagError::Vcs(
                    "a comparison was requested but no version control is available".to_string(),
                ))
            }
            (None, _) => None,
        };

        // Commit and range checks read tags from the "after" commit, not the working tree
        let after = match (&options.comparison, &provider) {
            (Some(comparison), Some(provider)) => provider.after_revision(comparison)?,
            _ => None,
        };

        // The scan and the VCS queries are independent until evaluation
        let (scan, changes) = thread::scope(|scope| {
            let change_worker = options
                .comparison
                .as_ref()
                .zip(provider.as_ref())
                .map(|(comparison, provider)| scope.spawn(move || provider.compute(comparison)));

            let scan = match (&after, &self.vcs) {
                (Some(rev), Some(vcs)) => scanner.scan_revision(vcs, rev),
                _ => Ok(scanner.scan()),
            };
            let changes: Option<Result<ChangeSet>> = change_worker.map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            });
            (scan, changes)
        });
        let scan = scan?;
        let changes = changes.transpose()?;

        Ok(Self::assemble(options, scan, changes))
    }

    fn assemble(options: &CheckOptions, scan: ScanOutput, changes: Option<ChangeSet>) -> Report {
        let files_scanned = scan.files_scanned();
        let resolution = TagResolver::resolve_all(&scan.files);
        let parse_errors = scan
            .files
            .into_iter()
            .flat_map(|file| file.errors)
            .collect();

        let verdicts = changes
            .as_ref()
            .map(|changes| PolicyEvaluator::evaluate(&resolution.groups, changes))
            .unwrap_or_default();

        tracing::debug!(
            files = files_scanned,
            groups = resolution.groups.len(),
            verdicts = verdicts.len(),
            "check complete"
        );

        ReportAssembler::new(options.root.clone(), options.comparison.clone())
            .files_scanned(files_scanned)
            .skipped_files(scan.skipped)
            .parse_errors(parse_errors)
            .structural_errors(resolution.errors)
            .groups(resolution.groups)
            .verdicts(verdicts)
            .build()
    }
}
