//! Version-control port and its git CLI adapter

use crate::domain::change_set::Hunk;
use crate::error::{LinktagError, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Status of a file between two revisions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Deleted,
    Modified,
    Renamed { from: PathBuf, similarity: u8 },
}

/// One entry of a changed-files listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: PathBuf,
    pub status: FileStatus,
}

/// A regular file recorded in a commit's tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: PathBuf,
    pub size: u64,
}

/// What the change-set provider and the scanner need from a version-control system.
///
/// `head: None` means the working tree. Paths are relative to the scan root.
pub trait VersionControl: Send + Sync {
    /// Resolve a revision to a commit id, or `None` if it does not exist.
    fn resolve(&self, rev: &str) -> Result<Option<String>>;

    /// First parent of a commit, or `None` for a root (or shallow boundary) commit.
    fn parent_of(&self, commit: &str) -> Result<Option<String>>;

    /// Files changed between `base` and `head`, with renames detected at
    /// `similarity` percent or above.
    fn changed_files(&self, base: &str, head: Option<&str>, similarity: u8)
        -> Result<Vec<ChangedFile>>;

    /// Changed regions of one file, in "after" line numbers.
    fn changed_lines(
        &self,
        base: &str,
        head: Option<&str>,
        file: &ChangedFile,
        similarity: u8,
    ) -> Result<Vec<Hunk>>;

    /// Untracked, non-ignored files in the working tree.
    fn untracked_files(&self) -> Result<Vec<PathBuf>>;

    /// Regular files under the scan root as recorded at commit `rev`.
    fn tree_files(&self, rev: &str) -> Result<Vec<TreeEntry>>;

    /// Content of `path` (relative to the scan root) at commit `rev`.
    fn read_file(&self, rev: &str, path: &Path) -> Result<Vec<u8>>;
}

/// Git adapter that shells out to the `git` CLI
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
    timeout: Duration,
}

struct GitOutput {
    success: bool,
    stdout: Vec<u8>,
    stderr: String,
}

impl GitCli {
    /// Create an adapter for the work tree containing `root`.
    ///
    /// Fails if `root` is not inside a git work tree.
    pub fn open(root: &Path, timeout: Duration) -> Result<Self> {
        let git = GitCli {
            root: root.to_path_buf(),
            timeout,
        };

        let output = git.run(&["rev-parse", "--is-inside-work-tree"])?;
        if !output.success || String::from_utf8_lossy(&output.stdout).trim() != "true" {
            return Err(LinktagError::NotARepository(root.to_path_buf()));
        }
        Ok(git)
    }

    /// Run git in the scan root, killing it once the timeout elapses.
    fn run(&self, args: &[&str]) -> Result<GitOutput> {
        let mut command = Command::new("git");
        command.arg("-C").arg(&self.root).args(args);
        run_with_timeout(command, format!("git {}", args.join(" ")), self.timeout)
    }

    /// Run git and fail on a non-zero exit
    fn run_checked(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = self.run(args)?;
        if !output.success {
            return Err(LinktagError::Vcs(format!(
                "git {} failed: {}",
                args.join(" "),
                output.stderr
            )));
        }
        Ok(output.stdout)
    }

    fn diff_args<'a>(base: &'a str, head: Option<&'a str>, rename: &'a str) -> Vec<&'a str> {
        let mut args = vec![
            "diff",
            "--relative",
            "--no-color",
            "--no-ext-diff",
            rename,
            base,
        ];
        if let Some(head) = head {
            args.push(head);
        }
        args
    }
}

impl VersionControl for GitCli {
    fn resolve(&self, rev: &str) -> Result<Option<String>> {
        let spec = format!("{}^{{commit}}", rev);
        let output = self.run(&["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.success {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }

    fn parent_of(&self, commit: &str) -> Result<Option<String>> {
        let stdout = self.run_checked(&["rev-list", "--parents", "-n", "1", commit])?;
        let line = String::from_utf8_lossy(&stdout);
        Ok(line.split_whitespace().nth(1).map(str::to_string))
    }

    fn changed_files(
        &self,
        base: &str,
        head: Option<&str>,
        similarity: u8,
    ) -> Result<Vec<ChangedFile>> {
        let rename = format!("-M{}%", similarity);
        let mut args = Self::diff_args(base, head, &rename);
        args.insert(1, "--name-status");
        args.insert(2, "-z");
        let stdout = self.run_checked(&args)?;
        parse_name_status(&stdout)
    }

    fn changed_lines(
        &self,
        base: &str,
        head: Option<&str>,
        file: &ChangedFile,
        similarity: u8,
    ) -> Result<Vec<Hunk>> {
        let rename = format!("-M{}%", similarity);
        let path = file.path.to_string_lossy();
        let from = match &file.status {
            FileStatus::Renamed { from, .. } => Some(from.to_string_lossy()),
            _ => None,
        };

        let mut args = Self::diff_args(base, head, &rename);
        args.insert(1, "-U0");
        args.push("--");
        if let Some(from) = &from {
            args.push(from.as_ref());
        }
        args.push(path.as_ref());

        let stdout = self.run_checked(&args)?;
        Ok(parse_hunks(&String::from_utf8_lossy(&stdout)))
    }

    fn untracked_files(&self) -> Result<Vec<PathBuf>> {
        let stdout = self.run_checked(&["ls-files", "--others", "--exclude-standard", "-z"])?;
        Ok(stdout
            .split(|b| *b == 0)
            .filter(|entry| !entry.is_empty())
            .map(|entry| PathBuf::from(String::from_utf8_lossy(entry).into_owned()))
            .collect())
    }

    fn tree_files(&self, rev: &str) -> Result<Vec<TreeEntry>> {
        // Without --full-tree, ls-tree lists the scan root only, relative to it
        let stdout = self.run_checked(&["ls-tree", "-r", "-l", "-z", rev])?;
        parse_ls_tree(&stdout)
    }

    fn read_file(&self, rev: &str, path: &Path) -> Result<Vec<u8>> {
        let object = format!("{}:./{}", rev, path.to_string_lossy());
        self.run_checked(&["cat-file", "blob", &object])
    }
}

/// Spawn `command` with piped output and wait for it, killing it after `timeout`.
fn run_with_timeout(mut command: Command, command_line: String, timeout: Duration) -> Result<GitOutput> {
    tracing::debug!(command = %command_line, "running");

    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| LinktagError::Vcs(format!("failed to run {}: {}", command_line, e)))?;

    // Drain pipes on their own threads so a chatty git cannot block on a full pipe
    let stdout_reader = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            out.read_to_end(&mut buf).map(|_| buf)
        })
    });
    let stderr_reader = child.stderr.take().map(|mut err| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            err.read_to_end(&mut buf).map(|_| buf)
        })
    });

    let start = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(LinktagError::VcsTimeout {
                command: command_line,
                timeout_secs: timeout.as_secs(),
            });
        }
        thread::sleep(Duration::from_millis(10));
    };

    let collect = |reader: Option<thread::JoinHandle<std::io::Result<Vec<u8>>>>| -> Result<Vec<u8>> {
        match reader {
            Some(handle) => handle
                .join()
                .map_err(|_| LinktagError::Vcs("pipe reader panicked".to_string()))?
                .map_err(LinktagError::Io),
            None => Ok(Vec::new()),
        }
    };

    Ok(GitOutput {
        success: status.success(),
        stdout: collect(stdout_reader)?,
        stderr: String::from_utf8_lossy(&collect(stderr_reader)?).trim().to_string(),
    })
}

/// Parse `git diff --name-status -z` output.
///
/// Records are NUL-separated: a status token, then one path (two for renames
/// and copies). Copies are reported as additions of the new path.
pub fn parse_name_status(output: &[u8]) -> Result<Vec<ChangedFile>> {
    let mut tokens = output
        .split(|b| *b == 0)
        .filter(|t| !t.is_empty())
        .map(|t| String::from_utf8_lossy(t).into_owned());
    let mut files = Vec::new();

    let malformed = |what: &str| LinktagError::Vcs(format!("malformed name-status output: {}", what));

    while let Some(status) = tokens.next() {
        let code = status.chars().next().unwrap_or(' ');
        let mut next_path = || tokens.next().map(PathBuf::from).ok_or_else(|| malformed(&status));

        let file = match code {
            'A' => ChangedFile {
                path: next_path()?,
                status: FileStatus::Added,
            },
            'D' => ChangedFile {
                path: next_path()?,
                status: FileStatus::Deleted,
            },
            // Unmerged paths are reported against the working tree as modified
            'M' | 'T' | 'U' => ChangedFile {
                path: next_path()?,
                status: FileStatus::Modified,
            },
            'R' => {
                let similarity = status[1..].parse().unwrap_or(0);
                let from = next_path()?;
                ChangedFile {
                    path: next_path()?,
                    status: FileStatus::Renamed { from, similarity },
                }
            }
            'C' => {
                let _source = next_path()?;
                ChangedFile {
                    path: next_path()?,
                    status: FileStatus::Added,
                }
            }
            _ => {
                return Err(LinktagError::Vcs(format!(
                    "unsupported git diff status '{}'",
                    status
                )))
            }
        };
        files.push(file);
    }

    Ok(files)
}

/// Parse `git ls-tree -r -l -z` output into regular files.
///
/// Entries look like `<mode> <type> <object> <size>\t<path>`; symlinks and
/// submodules are left out.
pub fn parse_ls_tree(output: &[u8]) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();

    for record in output.split(|b| *b == 0).filter(|r| !r.is_empty()) {
        let record = String::from_utf8_lossy(record);
        let malformed = || LinktagError::Vcs(format!("malformed ls-tree output: {}", record));

        let (meta, path) = record.split_once('\t').ok_or_else(malformed)?;
        let fields: Vec<&str> = meta.split_whitespace().collect();
        let [mode, kind, _object, size] = fields.as_slice() else {
            return Err(malformed());
        };
        if *kind != "blob" || *mode == "120000" {
            continue;
        }

        entries.push(TreeEntry {
            path: PathBuf::from(path),
            size: size.parse().map_err(|_| malformed())?,
        });
    }

    Ok(entries)
}

/// Parse the hunk headers of a `git diff -U0` output into "after" regions.
pub fn parse_hunks(diff: &str) -> Vec<Hunk> {
    use crate::domain::change_set::LineRange;
    use regex::Regex;
    use std::sync::OnceLock;

    static REGEX: OnceLock<Regex> = OnceLock::new();
    let header = REGEX
        .get_or_init(|| Regex::new(r"(?m)^@@ -\d+(?:,\d+)? \+(\d+)(?:,(\d+))? @@").unwrap());

    header
        .captures_iter(diff)
        .filter_map(|cap| {
            let start: usize = cap[1].parse().ok()?;
            let count: usize = match cap.get(2) {
                Some(count) => count.as_str().parse().ok()?,
                None => 1,
            };
            Some(if count == 0 {
                Hunk::Removed { after: start }
            } else {
                Hunk::Lines(LineRange {
                    start,
                    end: start + count - 1,
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change_set::LineRange;

    #[test]
    fn test_parse_name_status() {
        let output = b"M\0src/a.rs\0A\0docs/new.md\0D\0old.txt\0R087\0lib/x.rs\0lib/y.rs\0C100\0a.rs\0b.rs\0";
        let files = parse_name_status(output).unwrap();

        assert_eq!(
            files,
            vec![
                ChangedFile {
                    path: PathBuf::from("src/a.rs"),
                    status: FileStatus::Modified
                },
                ChangedFile {
                    path: PathBuf::from("docs/new.md"),
                    status: FileStatus::Added
                },
                ChangedFile {
                    path: PathBuf::from("old.txt"),
                    status: FileStatus::Deleted
                },
                ChangedFile {
                    path: PathBuf::from("lib/y.rs"),
                    status: FileStatus::Renamed {
                        from: PathBuf::from("lib/x.rs"),
                        similarity: 87
                    }
                },
                ChangedFile {
                    path: PathBuf::from("b.rs"),
                    status: FileStatus::Added
                },
            ]
        );
    }

    #[test]
    fn test_parse_name_status_rejects_truncated_output() {
        assert!(parse_name_status(b"R090\0only_one_path\0").is_err());
        assert!(parse_name_status(b"").unwrap().is_empty());
    }

    #[test]
    fn test_parse_name_status_statuses() {
        assert_eq!(
            parse_name_status(b"U\0conflicted.rs\0").unwrap(),
            vec![ChangedFile {
                path: PathBuf::from("conflicted.rs"),
                status: FileStatus::Modified
            }]
        );

        let err = parse_name_status(b"X\0what\0").unwrap_err();
        assert!(err.to_string().contains("unsupported git diff status 'X'"));
    }

    #[test]
    fn test_parse_ls_tree() {
        let output = b"100644 blob 1111111111111111111111111111111111111111      42\ta.rs\0\
100755 blob 2222222222222222222222222222222222222222     7\tbin/run.sh\0\
120000 blob 3333333333333333333333333333333333333333      4\tlink\0\
160000 commit 4444444444444444444444444444444444444444       -\tvendor/sub\0";

        assert_eq!(
            parse_ls_tree(output).unwrap(),
            vec![
                TreeEntry {
                    path: PathBuf::from("a.rs"),
                    size: 42
                },
                TreeEntry {
                    path: PathBuf::from("bin/run.sh"),
                    size: 7
                },
            ]
        );
        assert!(parse_ls_tree(b"100644 blob abc\tno_size\0").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_command_is_killed_at_timeout() {
        let mut command = Command::new("sleep");
        command.arg("5");

        let start = Instant::now();
        let result = run_with_timeout(command, "sleep 5".to_string(), Duration::from_millis(50));

        assert!(matches!(
            result,
            Err(LinktagError::VcsTimeout { ref command, .. }) if command == "sleep 5"
        ));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_fast_command_output_is_collected() {
        let mut command = Command::new("sh");
        command.args(["-c", "printf out; printf err >&2; exit 3"]);

        let output = run_with_timeout(command, "sh".to_string(), Duration::from_secs(10)).unwrap();
        assert!(!output.success);
        assert_eq!(output.stdout, b"out");
        assert_eq!(output.stderr, "err");
    }

    #[test]
    fn test_parse_hunks() {
        let diff = "\
diff --git a/a.rs b/a.rs
index 1111111..2222222 100644
--- a/a.rs
+++ b/a.rs
@@ -5 +5 @@ fn main() {
-    old();
+    new();
@@ -10,0 +11,3 @@
+one
+two
+three
@@ -20,2 +22,0 @@
-gone
-gone too
@@ -1 +0,0 @@
-first line
";
        assert_eq!(
            parse_hunks(diff),
            vec![
                Hunk::Lines(LineRange { start: 5, end: 5 }),
                Hunk::Lines(LineRange { start: 11, end: 13 }),
                Hunk::Removed { after: 22 },
                Hunk::Removed { after: 0 },
            ]
        );
    }

    #[test]
    fn test_parse_hunks_ignores_content_lines() {
        // A removed line that happens to look like a header is prefixed by '-'
        let diff = "@@ -3 +3 @@\n-@@ -1 +1 @@\n+x\n";
        assert_eq!(
            parse_hunks(diff),
            vec![Hunk::Lines(LineRange { start: 3, end: 3 })]
        );
    }
}
