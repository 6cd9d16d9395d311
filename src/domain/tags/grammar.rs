//! Marker grammar: recognizes `@linked_tag{group:kind[:policy]}` anywhere in a line

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Regex for the sentinel and its payload.
///
/// The payload runs up to the first `}` on the line; a missing closing brace
/// leaves capture 3 empty so the marker can be reported as unterminated.
fn marker_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"@(linked_tag|claim|proof)\{([^}]*)(\})?").unwrap())
}

/// What a marker delimits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    SpanBegin,
    SpanEnd,
    EntireFile,
}

impl FromStr for TagKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "span_begin" => Ok(TagKind::SpanBegin),
            "span_end" => Ok(TagKind::SpanEnd),
            "entire_file" => Ok(TagKind::EntireFile),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TagKind::SpanBegin => "span_begin",
            TagKind::SpanEnd => "span_end",
            TagKind::EntireFile => "entire_file",
        };
        f.write_str(s)
    }
}

/// Expected-change direction of a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// Must change when a talker in its group changes
    Listener,
    /// Its changes must be mirrored by the listeners in its group
    Talker,
    /// Both talker and listener
    #[default]
    All,
}

impl PolicyKind {
    /// Whether changes to this tag create expectations on others.
    pub fn is_talker(self) -> bool {
        matches!(self, PolicyKind::Talker | PolicyKind::All)
    }

    /// Whether this tag is expected to follow changes of others.
    pub fn is_listener(self) -> bool {
        matches!(self, PolicyKind::Listener | PolicyKind::All)
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    /// Accepts both `talker` and `talker_policy` spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_suffix("_policy").unwrap_or(s) {
            "listener" => Ok(PolicyKind::Listener),
            "talker" => Ok(PolicyKind::Talker),
            "all" => Ok(PolicyKind::All),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PolicyKind::Listener => "listener",
            PolicyKind::Talker => "talker",
            PolicyKind::All => "all",
        };
        f.write_str(s)
    }
}

/// A single recognized marker occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    /// Path relative to the scan root
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// 1-based byte column of the sentinel
    pub column: usize,
    /// Byte offset of the sentinel within the file
    pub offset: usize,
    pub group_id: String,
    pub tag_kind: TagKind,
    pub policy: PolicyKind,
    /// The full matched text, e.g. `@linked_tag{g1:span_begin}`
    pub raw: String,
}

/// Why a marker payload was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MarkerError {
    #[error("payload is missing its closing brace")]
    Unterminated,

    #[error("expected 'group_id:tag_type[:policy_type]', found '{0}'")]
    MissingFields(String),

    #[error("too many ':'-separated fields in '{0}'")]
    TooManyFields(String),

    #[error("group id is empty")]
    EmptyGroupId,

    #[error("group id contains a brace or non-printable characters")]
    InvalidGroupId,

    #[error("unknown tag type '{0}' (expected span_begin, span_end or entire_file)")]
    UnknownTagType(String),

    #[error("unknown policy type '{0}' (expected listener, talker or all)")]
    UnknownPolicy(String),
}

/// A marker that matched the sentinel but whose payload is malformed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub raw: String,
    pub error: MarkerError,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} ({})",
            self.file.display(),
            self.line,
            self.column,
            self.error,
            self.raw
        )
    }
}

/// Markers and parse errors found in a single file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMarkers {
    pub file: PathBuf,
    pub markers: Vec<Marker>,
    pub errors: Vec<ParseError>,
}

/// Parsed payload fields
#[derive(Debug, PartialEq, Eq)]
struct Payload {
    group_id: String,
    tag_kind: TagKind,
    policy: PolicyKind,
}

fn parse_payload(payload: &str) -> Result<Payload, MarkerError> {
    let fields: Vec<&str> = payload.split(':').map(str::trim).collect();
    if fields.len() < 2 {
        return Err(MarkerError::MissingFields(payload.to_string()));
    }
    if fields.len() > 3 {
        return Err(MarkerError::TooManyFields(payload.to_string()));
    }

    let group_id = fields[0];
    if group_id.is_empty() {
        return Err(MarkerError::EmptyGroupId);
    }
    if group_id.chars().any(|c| c.is_control() || c == '{' || c == '}') {
        return Err(MarkerError::InvalidGroupId);
    }

    let tag_kind = TagKind::from_str(fields[1]).map_err(MarkerError::UnknownTagType)?;
    let policy = match fields.get(2) {
        Some(p) => PolicyKind::from_str(p).map_err(MarkerError::UnknownPolicy)?,
        None => PolicyKind::default(),
    };

    Ok(Payload {
        group_id: group_id.to_string(),
        tag_kind,
        policy,
    })
}

pub struct MarkerGrammar;

impl MarkerGrammar {
    /// Scan every line of `content`, collecting markers and per-marker errors.
    ///
    /// `file` is recorded verbatim on every result; callers pass the
    /// root-relative path.
    pub fn scan(content: &str, file: &Path) -> FileMarkers {
        let mut result = FileMarkers {
            file: file.to_path_buf(),
            ..FileMarkers::default()
        };

        let mut line_offset = 0;
        for (index, line) in content.split('\n').enumerate() {
            Self::scan_line(line, index + 1, line_offset, file, &mut result);
            line_offset += line.len() + 1;
        }

        result
    }

    fn scan_line(
        line: &str,
        line_number: usize,
        line_offset: usize,
        file: &Path,
        output: &mut FileMarkers,
    ) {
        // Tolerate CRLF files
        let line = line.strip_suffix('\r').unwrap_or(line);

        for cap in marker_regex().captures_iter(line) {
            let Some(whole) = cap.get(0) else {
                continue;
            };
            let column = whole.start() + 1;
            let raw = whole.as_str().to_string();

            let parsed = if cap.get(3).is_none() {
                Err(MarkerError::Unterminated)
            } else {
                parse_payload(&cap[2])
            };

            match parsed {
                Ok(payload) => output.markers.push(Marker {
                    file: file.to_path_buf(),
                    line: line_number,
                    column,
                    offset: line_offset + whole.start(),
                    group_id: payload.group_id,
                    tag_kind: payload.tag_kind,
                    policy: payload.policy,
                    raw,
                }),
                Err(error) => output.errors.push(ParseError {
                    file: file.to_path_buf(),
                    line: line_number,
                    column,
                    raw,
                    error,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(content: &str) -> FileMarkers {
        MarkerGrammar::scan(content, Path::new("src/lib.rs"))
    }

    #[test]
    fn test_parse_payload_defaults_policy_to_all() {
        let payload = parse_payload("g1:span_begin").unwrap();
        assert_eq!(payload.group_id, "g1");
        assert_eq!(payload.tag_kind, TagKind::SpanBegin);
        assert_eq!(payload.policy, PolicyKind::All);
    }

    #[test]
    fn test_policy_suffix_synonyms() {
        assert_eq!(PolicyKind::from_str("listener_policy"), Ok(PolicyKind::Listener));
        assert_eq!(PolicyKind::from_str("talker_policy"), Ok(PolicyKind::Talker));
        assert_eq!(PolicyKind::from_str("all_policy"), Ok(PolicyKind::All));
        assert_eq!(PolicyKind::from_str("talker"), Ok(PolicyKind::Talker));
        assert!(PolicyKind::from_str("shouter").is_err());
        assert!(PolicyKind::from_str("_policy").is_err());
    }

    #[test]
    fn test_marker_in_different_comment_styles() {
        let content = "\
// @linked_tag{a:span_begin}
# @linked_tag{b:entire_file:listener}
<!-- @linked_tag{c:span_end:talker_policy} -->
plain text @linked_tag{d:entire_file}";
        let result = scan(content);

        assert!(result.errors.is_empty());
        let ids: Vec<&str> = result.markers.iter().map(|m| m.group_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(result.markers[1].policy, PolicyKind::Listener);
        assert_eq!(result.markers[2].policy, PolicyKind::Talker);
        assert_eq!(result.markers[2].tag_kind, TagKind::SpanEnd);
    }

    #[test]
    fn test_claim_and_proof_aliases() {
        let result = scan("/// @claim{api/init:span_begin}\n// @proof{api/init:span_end}");
        assert_eq!(result.markers.len(), 2);
        assert_eq!(result.markers[0].group_id, "api/init");
        assert_eq!(result.markers[0].raw, "@claim{api/init:span_begin}");
        assert_eq!(result.markers[1].tag_kind, TagKind::SpanEnd);
    }

    #[test]
    fn test_positions() {
        let result = scan("first\n  x @linked_tag{g:entire_file}\n");
        let marker = &result.markers[0];
        assert_eq!(marker.line, 2);
        assert_eq!(marker.column, 5);
        assert_eq!(marker.offset, 6 + 4);
        assert_eq!(marker.file, PathBuf::from("src/lib.rs"));
    }

    #[test]
    fn test_multiple_markers_on_one_line() {
        let result = scan("@linked_tag{a:entire_file} and @proof{b:entire_file:talker}");
        assert_eq!(result.markers.len(), 2);
        assert_eq!(result.markers[1].column, 32);
    }

    #[test]
    fn test_crlf_lines() {
        let result = scan("// @linked_tag{g:span_begin}\r\nbody\r\n// @linked_tag{g:span_end}\r\n");
        assert_eq!(result.markers.len(), 2);
        assert_eq!(result.markers[1].line, 3);
    }

    #[test]
    fn test_malformed_payloads_are_line_errors() {
        let content = "\
@linked_tag{just_an_id}
@linked_tag{:span_begin}
@linked_tag{g:middle}
@linked_tag{g:span_end:sometimes}
@linked_tag{g:span_end:all:extra}
@linked_tag{g:span_begin
@linked_tag{a{b:entire_file}
@linked_tag{ok:entire_file}";
        let result = scan(content);

        let errors: Vec<&MarkerError> = result.errors.iter().map(|e| &e.error).collect();
        assert_eq!(
            errors,
            vec![
                &MarkerError::MissingFields("just_an_id".to_string()),
                &MarkerError::EmptyGroupId,
                &MarkerError::UnknownTagType("middle".to_string()),
                &MarkerError::UnknownPolicy("sometimes".to_string()),
                &MarkerError::TooManyFields("g:span_end:all:extra".to_string()),
                &MarkerError::Unterminated,
                &MarkerError::InvalidGroupId,
            ]
        );
        assert_eq!(result.errors[5].line, 6);
        assert_eq!(result.errors[6].line, 7);

        // A bad line does not stop the scan
        assert_eq!(result.markers.len(), 1);
        assert_eq!(result.markers[0].group_id, "ok");
    }

    #[test]
    fn test_whitespace_in_payload_is_trimmed() {
        let result = scan("@linked_tag{ g1 : span_begin : listener }");
        assert_eq!(result.markers[0].group_id, "g1");
        assert_eq!(result.markers[0].policy, PolicyKind::Listener);
    }

    #[test]
    fn test_no_markers() {
        let result = scan("fn main() {\n    println!(\"@ not a tag {}\");\n}\n");
        assert!(result.markers.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_parse_error_display() {
        let result = scan("\n@linked_tag{x}");
        assert_eq!(
            result.errors[0].to_string(),
            "src/lib.rs:2:1: expected 'group_id:tag_type[:policy_type]', found 'x' (@linked_tag{x})"
        );
    }
}
