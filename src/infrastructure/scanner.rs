//! Parallel file scanner
//!
//! Walks the scan root in sorted order (or lists a commit's tree), filters paths
//! through the include and exclude globs, then reads and scans files for
//! markers on the rayon pool. Results keep path order, so output is the same
//! on every run.

use crate::domain::report::{SkipReason, SkippedFile};
use crate::domain::tags::{FileMarkers, MarkerGrammar};
use crate::error::{LinktagError, Result};
use crate::infrastructure::vcs::VersionControl;
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Bytes inspected when sniffing for binary content
const BINARY_SNIFF_LEN: usize = 8 * 1024;

/// Which files to scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_file_size: u64,
}

/// Markers from every scanned file, plus the files passed over
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub files: Vec<FileMarkers>,
    pub skipped: Vec<SkippedFile>,
}

impl ScanOutput {
    /// Number of files actually read and scanned
    pub fn files_scanned(&self) -> usize {
        self.files.len()
    }
}

enum FileOutcome {
    Scanned(FileMarkers),
    Skipped(SkippedFile),
}

pub struct FileScanner {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
    max_file_size: u64,
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Sniff for binary content, decode and scan for markers
fn classify(relative: PathBuf, bytes: Vec<u8>) -> FileOutcome {
    if bytes.iter().take(BINARY_SNIFF_LEN).any(|b| *b == 0) {
        return FileOutcome::Skipped(SkippedFile {
            path: relative,
            reason: SkipReason::Binary,
        });
    }

    match String::from_utf8(bytes) {
        Ok(content) => FileOutcome::Scanned(MarkerGrammar::scan(&content, &relative)),
        Err(_) => FileOutcome::Skipped(SkippedFile {
            path: relative,
            reason: SkipReason::NotUtf8,
        }),
    }
}

/// Root-relative path with `/` separators, matching what git reports
fn relative_path(root: &Path, path: &Path) -> PathBuf {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let joined: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    PathBuf::from(joined.join("/"))
}

impl FileScanner {
    /// Create a scanner rooted at `root`.
    ///
    /// Fails if the root is missing or not a directory, or if a glob is invalid.
    pub fn new(root: &Path, options: &ScanOptions) -> Result<Self> {
        if !root.is_dir() {
            return Err(LinktagError::RootNotFound(root.to_path_buf()));
        }

        Ok(FileScanner {
            root: root.to_path_buf(),
            include: build_globset(&options.include_patterns)?,
            exclude: build_globset(&options.exclude_patterns)?,
            max_file_size: options.max_file_size,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        if self.exclude.is_match(relative) {
            return true;
        }
        relative
            .file_name()
            .is_some_and(|name| self.exclude.is_match(Path::new(name)))
    }

    fn is_included(&self, relative: &Path) -> bool {
        self.include.is_match(relative)
            || relative
                .file_name()
                .is_some_and(|name| self.include.is_match(Path::new(name)))
    }

    /// Collect candidate files in lexicographic order.
    ///
    /// Walk errors become skipped files rather than failures.
    fn collect_files(&self, skipped: &mut Vec<SkippedFile>) -> Vec<PathBuf> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !self.is_excluded(&relative_path(&self.root, entry.path()))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| relative_path(&self.root, p)).unwrap_or_default();
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable path");
                    skipped.push(SkippedFile {
                        path,
                        reason: SkipReason::Unreadable {
                            error: e.to_string(),
                        },
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let relative = relative_path(&self.root, entry.path());
            if self.is_included(&relative) {
                files.push(entry.into_path());
            }
        }

        files
    }

    fn scan_file(&self, path: &Path) -> FileOutcome {
        let relative = relative_path(&self.root, path);
        let skip = |reason: SkipReason| {
            FileOutcome::Skipped(SkippedFile {
                path: relative.clone(),
                reason,
            })
        };

        let size = match fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(e) => return skip(SkipReason::Unreadable { error: e.to_string() }),
        };
        if size > self.max_file_size {
            return skip(SkipReason::TooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        match fs::read(path) {
            Ok(bytes) => classify(relative, bytes),
            Err(e) => skip(SkipReason::Unreadable { error: e.to_string() }),
        }
    }

    /// Whether `relative` or any directory above it is excluded
    fn is_excluded_in_tree(&self, relative: &Path) -> bool {
        relative
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .any(|p| self.is_excluded(p))
    }

    /// Scan every candidate file.
    pub fn scan(&self) -> ScanOutput {
        let mut skipped = Vec::new();
        let candidates = self.collect_files(&mut skipped);
        tracing::debug!(
            root = %self.root.display(),
            candidates = candidates.len(),
            "scanning files"
        );

        let outcomes: Vec<FileOutcome> = candidates
            .par_iter()
            .map(|path| self.scan_file(path))
            .collect();

        Self::gather(outcomes, skipped)
    }

    /// Scan the files recorded at commit `rev` instead of the working tree.
    ///
    /// Tag lines then match the line numbers of a diff whose "after" side is
    /// `rev`. Files that cannot be read from the commit are skipped.
    pub fn scan_revision(&self, vcs: &dyn VersionControl, rev: &str) -> Result<ScanOutput> {
        let mut entries: Vec<_> = vcs
            .tree_files(rev)?
            .into_iter()
            .filter(|e| !self.is_excluded_in_tree(&e.path) && self.is_included(&e.path))
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(rev, candidates = entries.len(), "scanning files at revision");

        let outcomes: Vec<FileOutcome> = entries
            .par_iter()
            .map(|entry| {
                let skip = |reason: SkipReason| {
                    FileOutcome::Skipped(SkippedFile {
                        path: entry.path.clone(),
                        reason,
                    })
                };
                if entry.size > self.max_file_size {
                    return skip(SkipReason::TooLarge {
                        size: entry.size,
                        limit: self.max_file_size,
                    });
                }
                match vcs.read_file(rev, &entry.path) {
                    Ok(bytes) => classify(entry.path.clone(), bytes),
                    Err(e) => skip(SkipReason::Unreadable { error: e.to_string() }),
                }
            })
            .collect();

        Ok(Self::gather(outcomes, Vec::new()))
    }

    fn gather(outcomes: Vec<FileOutcome>, mut skipped: Vec<SkippedFile>) -> ScanOutput {
        let mut files = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                FileOutcome::Scanned(markers) => {
                    for error in &markers.errors {
                        tracing::debug!(%error, "marker parse error");
                    }
                    files.push(markers);
                }
                FileOutcome::Skipped(file) => {
                    tracing::warn!(path = %file.path.display(), reason = %file.reason, "skipping file");
                    skipped.push(file);
                }
            }
        }

        ScanOutput { files, skipped }
    }
}
