//! Tag resolution: pairs span markers, builds whole-file tags, groups by id

use super::grammar::{FileMarkers, Marker, PolicyKind, TagKind};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// The region of a file a tag covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Extent {
    /// Inclusive line range, begin marker line to end marker line
    Span { start: usize, end: usize },
    WholeFile,
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extent::Span { start, end } => write!(f, "lines {}-{}", start, end),
            Extent::WholeFile => f.write_str("whole file"),
        }
    }
}

/// A resolved tag with a concrete extent
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Tag {
    pub file: PathBuf,
    pub extent: Extent,
    pub group_id: String,
    pub policy: PolicyKind,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.file.display(), self.extent, self.policy)
    }
}

/// How a set of span markers failed to pair up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralErrorKind {
    UnmatchedBegin,
    UnmatchedEnd,
    DuplicateBegin,
    DuplicateEnd,
    EmptyOrReversedSpan,
}

impl fmt::Display for StructuralErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StructuralErrorKind::UnmatchedBegin => "span_begin without a matching span_end",
            StructuralErrorKind::UnmatchedEnd => "span_end without a matching span_begin",
            StructuralErrorKind::DuplicateBegin => "more than one span_begin",
            StructuralErrorKind::DuplicateEnd => "more than one span_end",
            StructuralErrorKind::EmptyOrReversedSpan => "span_end is not after span_begin",
        };
        f.write_str(s)
    }
}

/// A (file, group id, policy) combination whose span markers do not form a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralError {
    pub file: PathBuf,
    pub group_id: String,
    pub policy: PolicyKind,
    pub kind: StructuralErrorKind,
    /// Lines of every span_begin marker involved
    pub begin_lines: Vec<usize>,
    /// Lines of every span_end marker involved
    pub end_lines: Vec<usize>,
}

impl fmt::Display for StructuralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .begin_lines
            .iter()
            .chain(self.end_lines.iter())
            .map(|l| l.to_string())
            .collect();
        write!(
            f,
            "{}:{}: {} for group '{}' ({})",
            self.file.display(),
            lines.join(","),
            self.kind,
            self.group_id,
            self.policy
        )
    }
}

/// All tags sharing a group id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkGroup {
    pub id: String,
    pub tags: Vec<Tag>,
}

/// Output of resolving a whole scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub groups: Vec<LinkGroup>,
    pub errors: Vec<StructuralError>,
}

impl Resolution {
    /// Total number of valid tags across all groups
    pub fn tag_count(&self) -> usize {
        self.groups.iter().map(|g| g.tags.len()).sum()
    }
}

#[derive(Default)]
struct SpanMarkers<'a> {
    begins: Vec<&'a Marker>,
    ends: Vec<&'a Marker>,
}

pub struct TagResolver;

impl TagResolver {
    /// Resolve the markers of a single file into tags.
    pub fn resolve_file(markers: &[Marker]) -> (Vec<Tag>, Vec<StructuralError>) {
        let mut tags = Vec::new();
        let mut errors = Vec::new();
        let mut spans: BTreeMap<(&str, PolicyKind), SpanMarkers> = BTreeMap::new();

        for marker in markers {
            match marker.tag_kind {
                TagKind::EntireFile => tags.push(Tag {
                    file: marker.file.clone(),
                    extent: Extent::WholeFile,
                    group_id: marker.group_id.clone(),
                    policy: marker.policy,
                }),
                TagKind::SpanBegin => spans
                    .entry((marker.group_id.as_str(), marker.policy))
                    .or_default()
                    .begins
                    .push(marker),
                TagKind::SpanEnd => spans
                    .entry((marker.group_id.as_str(), marker.policy))
                    .or_default()
                    .ends
                    .push(marker),
            }
        }

        for ((group_id, policy), span) in spans {
            match Self::pair(&span) {
                Ok((begin, end)) => tags.push(Tag {
                    file: begin.file.clone(),
                    extent: Extent::Span {
                        start: begin.line,
                        end: end.line,
                    },
                    group_id: group_id.to_string(),
                    policy,
                }),
                Err(kind) => {
                    let first = span.begins.first().or(span.ends.first());
                    errors.push(StructuralError {
                        file: first.map(|m| m.file.clone()).unwrap_or_default(),
                        group_id: group_id.to_string(),
                        policy,
                        kind,
                        begin_lines: span.begins.iter().map(|m| m.line).collect(),
                        end_lines: span.ends.iter().map(|m| m.line).collect(),
                    });
                }
            }
        }

        (tags, errors)
    }

    fn pair<'a>(span: &SpanMarkers<'a>) -> Result<(&'a Marker, &'a Marker), StructuralErrorKind> {
        match (span.begins.as_slice(), span.ends.as_slice()) {
            ([begin], [end]) if begin.line < end.line => Ok((*begin, *end)),
            ([_], [_]) => Err(StructuralErrorKind::EmptyOrReversedSpan),
            ([], _) => Err(StructuralErrorKind::UnmatchedEnd),
            (_, []) => Err(StructuralErrorKind::UnmatchedBegin),
            ([_, _, ..], _) => Err(StructuralErrorKind::DuplicateBegin),
            (_, _) => Err(StructuralErrorKind::DuplicateEnd),
        }
    }

    /// Resolve every scanned file, then group tags globally by id.
    ///
    /// Groups come out sorted by id; tags within a group by file and extent.
    pub fn resolve_all(files: &[FileMarkers]) -> Resolution {
        let mut all_tags = Vec::new();
        let mut errors = Vec::new();

        for file in files {
            let (tags, file_errors) = Self::resolve_file(&file.markers);
            all_tags.extend(tags);
            errors.extend(file_errors);
        }

        for error in &errors {
            tracing::debug!(%error, "structural error");
        }

        Resolution {
            groups: Self::group(all_tags),
            errors,
        }
    }

    /// Group tags by id, merging across files and policy kinds.
    pub fn group(tags: Vec<Tag>) -> Vec<LinkGroup> {
        let mut by_id: BTreeMap<String, Vec<Tag>> = BTreeMap::new();
        for tag in tags {
            by_id.entry(tag.group_id.clone()).or_default().push(tag);
        }

        by_id
            .into_iter()
            .map(|(id, mut tags)| {
                tags.sort();
                LinkGroup { id, tags }
            })
            .collect()
    }
}
