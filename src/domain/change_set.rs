//! Changed line regions per file for one version comparison

use crate::domain::tags::{Extent, Tag};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// What to compare
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Comparison {
    /// A commit against its first parent
    Commit { rev: String },
    /// Two references
    Range { base: String, head: String },
    /// A reference against the working tree, untracked files included
    WorkingTree { base: String },
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Commit { rev } => write!(f, "{}^..{}", rev, rev),
            Comparison::Range { base, head } => write!(f, "{}..{}", base, head),
            Comparison::WorkingTree { base } => write!(f, "{}..working tree", base),
        }
    }
}

/// Inclusive 1-based line range in the "after" revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

/// One changed region of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Hunk {
    /// Lines added or rewritten, located in the "after" revision
    Lines(LineRange),
    /// Lines removed without replacement, right after line `after`
    /// (0 when removed from the top of the file)
    Removed { after: usize },
}

impl Hunk {
    /// Whether this change falls within the inclusive span `[start, end]`.
    ///
    /// A pure removal counts only when it sits strictly between the two
    /// span lines.
    pub fn touches(&self, start: usize, end: usize) -> bool {
        match *self {
            Hunk::Lines(range) => range.start <= end && start <= range.end,
            Hunk::Removed { after } => start <= after && after < end,
        }
    }
}

/// How a single file changed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileChange {
    Modified { hunks: Vec<Hunk> },
    /// New file; every line counts as changed
    Added,
    /// Gone in the "after" revision; tags that still point here are unresolvable
    Deleted,
    Renamed {
        from: PathBuf,
        similarity: u8,
        hunks: Vec<Hunk>,
    },
}

/// Whether the comparison has a "before" side
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Baseline {
    Present { base: String },
    Missing { reason: String },
}

/// Result of checking one tag against the change set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagChange {
    Changed,
    Unchanged,
    /// The tag's file no longer exists on the "after" side
    Unresolvable,
}

/// Per-file changes for one comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub baseline: Baseline,
    pub files: BTreeMap<PathBuf, FileChange>,
}

impl ChangeSet {
    /// An empty change set against an existing baseline
    pub fn new(base: impl Into<String>) -> Self {
        ChangeSet {
            baseline: Baseline::Present { base: base.into() },
            files: BTreeMap::new(),
        }
    }

    /// A change set with no "before" side
    pub fn missing_baseline(reason: impl Into<String>) -> Self {
        ChangeSet {
            baseline: Baseline::Missing {
                reason: reason.into(),
            },
            files: BTreeMap::new(),
        }
    }

    pub fn has_baseline(&self) -> bool {
        matches!(self.baseline, Baseline::Present { .. })
    }

    /// Record a file change, replacing any earlier entry for `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, change: FileChange) {
        self.files.insert(path.into(), change);
    }

    pub fn get(&self, path: &Path) -> Option<&FileChange> {
        self.files.get(path)
    }

    /// Classify a tag against this change set.
    pub fn tag_change(&self, tag: &Tag) -> TagChange {
        let hunks = match self.files.get(&tag.file) {
            None => return TagChange::Unchanged,
            Some(FileChange::Deleted) => return TagChange::Unresolvable,
            Some(FileChange::Added) => return TagChange::Changed,
            Some(FileChange::Modified { hunks }) | Some(FileChange::Renamed { hunks, .. }) => hunks,
        };

        let changed = match tag.extent {
            Extent::WholeFile => !hunks.is_empty(),
            Extent::Span { start, end } => hunks.iter().any(|h| h.touches(start, end)),
        };

        if changed {
            TagChange::Changed
        } else {
            TagChange::Unchanged
        }
    }
}
