//! End-to-end check runs through the library with a scripted version-control backend

use linktag::application::{CheckOptions, CheckService};
use linktag::domain::change_set::{Comparison, Hunk, LineRange};
use linktag::domain::policy::{InconclusiveReason, Outcome};
use linktag::domain::tags::Extent;
use linktag::error::{LinktagError, Result};
use linktag::infrastructure::scanner::ScanOptions;
use linktag::infrastructure::vcs::{ChangedFile, FileStatus, TreeEntry, VersionControl};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

mod common;
use common::{write_fixture, NOTES, SOURCE};

/// Commits `c0 <- c1`; `c1` carries the scripted diff and holds the fixture files
struct ScriptedVcs {
    files: Vec<ChangedFile>,
    hunks: HashMap<PathBuf, Vec<Hunk>>,
    tree: Vec<(PathBuf, String)>,
}

impl ScriptedVcs {
    fn new(changes: &[(&str, FileStatus, Vec<Hunk>)]) -> Self {
        ScriptedVcs {
            files: changes
                .iter()
                .map(|(path, status, _)| ChangedFile {
                    path: PathBuf::from(path),
                    status: status.clone(),
                })
                .collect(),
            hunks: changes
                .iter()
                .map(|(path, _, hunks)| (PathBuf::from(path), hunks.clone()))
                .collect(),
            tree: vec![
                (PathBuf::from("a.rs"), SOURCE.to_string()),
                (PathBuf::from("b.md"), NOTES.to_string()),
            ],
        }
    }
}

impl VersionControl for ScriptedVcs {
    fn resolve(&self, rev: &str) -> Result<Option<String>> {
        Ok(["c0", "c1"].contains(&rev).then(|| rev.to_string()))
    }

    fn parent_of(&self, commit: &str) -> Result<Option<String>> {
        Ok((commit == "c1").then(|| "c0".to_string()))
    }

    fn changed_files(&self, base: &str, _: Option<&str>, _: u8) -> Result<Vec<ChangedFile>> {
        Ok(if base == "c0" { self.files.clone() } else { Vec::new() })
    }

    fn changed_lines(
        &self,
        _: &str,
        _: Option<&str>,
        file: &ChangedFile,
        _: u8,
    ) -> Result<Vec<Hunk>> {
        Ok(self.hunks.get(&file.path).cloned().unwrap_or_default())
    }

    fn untracked_files(&self) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    fn tree_files(&self, rev: &str) -> Result<Vec<TreeEntry>> {
        assert!(["c0", "c1"].contains(&rev), "unexpected revision {}", rev);
        Ok(self
            .tree
            .iter()
            .map(|(path, content)| TreeEntry {
                path: path.clone(),
                size: content.len() as u64,
            })
            .collect())
    }

    fn read_file(&self, _: &str, path: &Path) -> Result<Vec<u8>> {
        self.tree
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, content)| content.clone().into_bytes())
            .ok_or_else(|| LinktagError::Vcs(format!("no blob for {}", path.display())))
    }
}

fn options(root: &Path, comparison: Option<Comparison>) -> CheckOptions {
    CheckOptions {
        root: root.to_path_buf(),
        scan: ScanOptions {
            include_patterns: vec!["*".to_string()],
            exclude_patterns: vec![],
            max_file_size: 1024 * 1024,
        },
        comparison,
        rename_similarity: 50,
    }
}

fn commit(rev: &str) -> Option<Comparison> {
    Some(Comparison::Commit {
        rev: rev.to_string(),
    })
}

fn line(n: usize) -> Hunk {
    Hunk::Lines(LineRange { start: n, end: n })
}

#[test]
fn talker_changed_listener_untouched_is_violated() {
    let temp = TempDir::new().unwrap();
    write_fixture(temp.path());
    let vcs = ScriptedVcs::new(&[("a.rs", FileStatus::Modified, vec![line(5)])]);

    let report = CheckService::new(Some(vcs))
        .execute(&options(temp.path(), commit("c1")))
        .unwrap();

    assert_eq!(report.verdicts.len(), 1);
    let verdict = &report.verdicts[0];
    assert_eq!(verdict.group_id, "g1");
    assert_eq!(verdict.outcome, Outcome::Violated);
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].talker.file, PathBuf::from("a.rs"));
    assert_eq!(verdict.violations[0].listener.file, PathBuf::from("b.md"));
    assert!(report.has_failures(false));
}

#[test]
fn both_sides_changed_is_satisfied() {
    let temp = TempDir::new().unwrap();
    write_fixture(temp.path());
    let vcs = ScriptedVcs::new(&[
        ("a.rs", FileStatus::Modified, vec![line(5)]),
        ("b.md", FileStatus::Modified, vec![line(3)]),
    ]);

    let report = CheckService::new(Some(vcs))
        .execute(&options(temp.path(), commit("c1")))
        .unwrap();

    assert_eq!(report.verdicts[0].outcome, Outcome::Satisfied);
    assert!(!report.has_failures(false));
}

#[test]
fn root_commit_is_inconclusive() {
    let temp = TempDir::new().unwrap();
    write_fixture(temp.path());
    let vcs = ScriptedVcs::new(&[("a.rs", FileStatus::Added, vec![])]);

    let report = CheckService::new(Some(vcs))
        .execute(&options(temp.path(), commit("c0")))
        .unwrap();

    assert!(report
        .verdicts
        .iter()
        .all(|v| v.outcome == Outcome::Inconclusive));
    assert!(matches!(
        report.verdicts[0].reason,
        Some(InconclusiveReason::MissingBaseline { .. })
    ));
    assert_eq!(report.summary.satisfied + report.summary.violated, 0);
}

#[test]
fn commit_check_reads_tags_from_the_commit() {
    let temp = TempDir::new().unwrap();
    write_fixture(temp.path());
    // Later edits shift the span in the working tree to lines 13-17
    let shifted = format!("{}{}", "// later\n".repeat(10), SOURCE);
    std::fs::write(temp.path().join("a.rs"), shifted).unwrap();

    let vcs = ScriptedVcs::new(&[("a.rs", FileStatus::Modified, vec![line(5)])]);
    let report = CheckService::new(Some(vcs))
        .execute(&options(temp.path(), commit("c1")))
        .unwrap();

    let verdict = &report.verdicts[0];
    assert_eq!(verdict.outcome, Outcome::Violated);
    assert_eq!(
        verdict.violations[0].talker.extent,
        Extent::Span { start: 3, end: 7 }
    );
}

#[test]
fn unknown_revision_is_an_error() {
    let temp = TempDir::new().unwrap();
    write_fixture(temp.path());
    let vcs = ScriptedVcs::new(&[]);

    let err = CheckService::new(Some(vcs))
        .execute(&options(temp.path(), commit("nope")))
        .unwrap_err();
    assert!(matches!(err, LinktagError::BadRevision(rev) if rev == "nope"));
}

#[test]
fn structure_only_without_comparison() {
    let temp = TempDir::new().unwrap();
    write_fixture(temp.path());

    let report = CheckService::<ScriptedVcs>::new(None)
        .execute(&options(temp.path(), None))
        .unwrap();

    assert!(report.verdicts.is_empty());
    assert_eq!(report.summary.groups, 1);
    assert_eq!(report.summary.tags, 2);
    assert_eq!(report.summary.files_scanned, 2);
}

#[test]
fn repeated_runs_agree() {
    let temp = TempDir::new().unwrap();
    write_fixture(temp.path());
    let vcs = ScriptedVcs::new(&[("a.rs", FileStatus::Modified, vec![line(4)])]);
    let service = CheckService::new(Some(vcs));

    let first = service.execute(&options(temp.path(), commit("c1"))).unwrap();
    let second = service.execute(&options(temp.path(), commit("c1"))).unwrap();
    assert_eq!(first.verdicts, second.verdicts);
    assert_eq!(first.groups, second.groups);
}
