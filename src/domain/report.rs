//! Report assembly: the single structured result of a check run

use crate::domain::change_set::Comparison;
use crate::domain::policy::{directionless, Directionless, Outcome, Verdict};
use crate::domain::tags::{LinkGroup, ParseError, StructuralError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A group that is surfaced but excluded from violation reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigWarning {
    pub group_id: String,
    pub kind: Directionless,
    pub tag_count: usize,
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Directionless::UnderLinked => write!(
                f,
                "group '{}' has {} tag(s); at least 2 are needed to link anything",
                self.group_id, self.tag_count
            ),
            Directionless::NoTalker => {
                write!(f, "group '{}' has only listener tags", self.group_id)
            }
            Directionless::NoListener => {
                write!(f, "group '{}' has only talker tags", self.group_id)
            }
        }
    }
}

/// Why the scanner passed over a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    TooLarge { size: u64, limit: u64 },
    Binary,
    NotUtf8,
    Unreadable { error: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooLarge { size, limit } => {
                write!(f, "{} bytes exceeds the {} byte limit", size, limit)
            }
            SkipReason::Binary => f.write_str("binary file"),
            SkipReason::NotUtf8 => f.write_str("not valid UTF-8"),
            SkipReason::Unreadable { error } => write!(f, "unreadable: {}", error),
        }
    }
}

/// A file the scanner skipped with a warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Summary counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    pub files_scanned: usize,
    pub groups: usize,
    pub tags: usize,
    pub satisfied: usize,
    pub violated: usize,
    pub inconclusive: usize,
    pub parse_errors: usize,
    pub structural_errors: usize,
    pub warnings: usize,
}

/// Everything one run found, handed to formatters as-is
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub root: PathBuf,
    /// `None` when no version comparison was requested
    pub comparison: Option<Comparison>,
    pub summary: ReportSummary,
    pub groups: Vec<LinkGroup>,
    pub verdicts: Vec<Verdict>,
    pub parse_errors: Vec<ParseError>,
    pub structural_errors: Vec<StructuralError>,
    pub warnings: Vec<ConfigWarning>,
    pub skipped_files: Vec<SkippedFile>,
}

impl Report {
    /// Whether the run found anything that should fail a build.
    ///
    /// With `strict`, configuration warnings count as failures too.
    pub fn has_failures(&self, strict: bool) -> bool {
        !self.parse_errors.is_empty()
            || !self.structural_errors.is_empty()
            || self.summary.violated > 0
            || (strict && !self.warnings.is_empty())
    }

    pub fn violated(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts
            .iter()
            .filter(|v| v.outcome == Outcome::Violated)
    }
}

/// Collects the pieces of a run into a [`Report`]
#[derive(Debug, Default)]
pub struct ReportAssembler {
    root: PathBuf,
    comparison: Option<Comparison>,
    files_scanned: usize,
    groups: Vec<LinkGroup>,
    verdicts: Vec<Verdict>,
    parse_errors: Vec<ParseError>,
    structural_errors: Vec<StructuralError>,
    skipped_files: Vec<SkippedFile>,
}

impl ReportAssembler {
    pub fn new(root: PathBuf, comparison: Option<Comparison>) -> Self {
        ReportAssembler {
            root,
            comparison,
            ..Self::default()
        }
    }

    pub fn files_scanned(mut self, count: usize) -> Self {
        self.files_scanned = count;
        self
    }

    pub fn skipped_files(mut self, skipped: Vec<SkippedFile>) -> Self {
        self.skipped_files = skipped;
        self
    }

    pub fn parse_errors(mut self, errors: Vec<ParseError>) -> Self {
        self.parse_errors = errors;
        self
    }

    pub fn structural_errors(mut self, errors: Vec<StructuralError>) -> Self {
        self.structural_errors = errors;
        self
    }

    pub fn groups(mut self, groups: Vec<LinkGroup>) -> Self {
        self.groups = groups;
        self
    }

    pub fn verdicts(mut self, verdicts: Vec<Verdict>) -> Self {
        self.verdicts = verdicts;
        self
    }

    /// Derive warnings and counts, then build the report.
    pub fn build(self) -> Report {
        let warnings: Vec<ConfigWarning> = self
            .groups
            .iter()
            .filter_map(|group| {
                directionless(group).map(|kind| ConfigWarning {
                    group_id: group.id.clone(),
                    kind,
                    tag_count: group.tags.len(),
                })
            })
            .collect();

        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        let count = |outcome: Outcome| self.verdicts.iter().filter(|v| v.outcome == outcome).count();
        let summary = ReportSummary {
            files_scanned: self.files_scanned,
            groups: self.groups.len(),
            tags: self.groups.iter().map(|g| g.tags.len()).sum(),
            satisfied: count(Outcome::Satisfied),
            violated: count(Outcome::Violated),
            inconclusive: count(Outcome::Inconclusive),
            parse_errors: self.parse_errors.len(),
            structural_errors: self.structural_errors.len(),
            warnings: warnings.len(),
        };

        Report {
            generated_at: Utc::now(),
            root: self.root,
            comparison: self.comparison,
            summary,
            groups: self.groups,
            verdicts: self.verdicts,
            parse_errors: self.parse_errors,
            structural_errors: self.structural_errors,
            warnings,
            skipped_files: self.skipped_files,
        }
    }
}
