//! Builds a [`ChangeSet`] for a comparison through the [`VersionControl`] port

use crate::domain::change_set::{ChangeSet, Comparison, FileChange};
use crate::error::{LinktagError, Result};
use crate::infrastructure::vcs::{ChangedFile, FileStatus, VersionControl};

pub struct ChangeSetProvider<'a> {
    vcs: &'a dyn VersionControl,
    rename_similarity: u8,
}

/// Resolved "before" and "after" sides of a comparison
enum Sides {
    Resolved { base: String, head: Option<String> },
    NoBaseline(String),
}

impl<'a> ChangeSetProvider<'a> {
    pub fn new(vcs: &'a dyn VersionControl, rename_similarity: u8) -> Self {
        ChangeSetProvider {
            vcs,
            rename_similarity,
        }
    }

    fn require(&self, rev: &str) -> Result<String> {
        self.vcs
            .resolve(rev)?
            .ok_or_else(|| LinktagError::BadRevision(rev.to_string()))
    }

    fn sides(&self, comparison: &Comparison) -> Result<Sides> {
        match comparison {
            Comparison::Commit { rev } => {
                let head = self.require(rev)?;
                Ok(match self.vcs.parent_of(&head)? {
                    Some(base) => Sides::Resolved {
                        base,
                        head: Some(head),
                    },
                    None => Sides::NoBaseline(format!("commit {} has no parent", rev)),
                })
            }
            Comparison::Range { base, head } => Ok(Sides::Resolved {
                base: self.require(base)?,
                head: Some(self.require(head)?),
            }),
            Comparison::WorkingTree { base } => match self.vcs.resolve(base)? {
                Some(base) => Ok(Sides::Resolved { base, head: None }),
                None if base == "HEAD" => Ok(Sides::NoBaseline(
                    "repository has no commits yet".to_string(),
                )),
                None => Err(LinktagError::BadRevision(base.clone())),
            },
        }
    }

    /// Commit whose content is the "after" side of `comparison`.
    ///
    /// `None` means the working tree. Tag extents must be read from this side
    /// for hunks to line up with them.
    pub fn after_revision(&self, comparison: &Comparison) -> Result<Option<String>> {
        match comparison {
            Comparison::Commit { rev } => Ok(Some(self.require(rev)?)),
            Comparison::Range { head, .. } => Ok(Some(self.require(head)?)),
            Comparison::WorkingTree { .. } => Ok(None),
        }
    }

    /// Compute the change set for `comparison`.
    ///
    /// A missing "before" side yields a change set with a missing baseline;
    /// unknown revisions and VCS failures are errors.
    pub fn compute(&self, comparison: &Comparison) -> Result<ChangeSet> {
        let (base, head) = match self.sides(comparison)? {
            Sides::Resolved { base, head } => (base, head),
            Sides::NoBaseline(reason) => {
                tracing::warn!(%comparison, %reason, "no baseline; verdicts will be inconclusive");
                return Ok(ChangeSet::missing_baseline(reason));
            }
        };

        let mut changes = ChangeSet::new(base.clone());
        let files = self
            .vcs
            .changed_files(&base, head.as_deref(), self.rename_similarity)?;

        for file in &files {
            if let FileStatus::Renamed { from, similarity } = &file.status {
                if *similarity < self.rename_similarity {
                    changes.insert(from.clone(), FileChange::Deleted);
                    changes.insert(file.path.clone(), FileChange::Added);
                    continue;
                }
            }
            let change = self.file_change(&base, head.as_deref(), file)?;
            changes.insert(file.path.clone(), change);
        }

        if head.is_none() {
            for path in self.vcs.untracked_files()? {
                changes.insert(path, FileChange::Added);
            }
        }

        tracing::debug!(%comparison, files = changes.files.len(), "computed change set");
        Ok(changes)
    }

    fn file_change(&self, base: &str, head: Option<&str>, file: &ChangedFile) -> Result<FileChange> {
        Ok(match &file.status {
            FileStatus::Added => FileChange::Added,
            FileStatus::Deleted => FileChange::Deleted,
            FileStatus::Modified => FileChange::Modified {
                hunks: self
                    .vcs
                    .changed_lines(base, head, file, self.rename_similarity)?,
            },
            FileStatus::Renamed { from, similarity } => FileChange::Renamed {
                from: from.clone(),
                similarity: *similarity,
                hunks: self
                    .vcs
                    .changed_lines(base, head, file, self.rename_similarity)?,
            },
        })
    }
}
