#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::Path;
use std::process;

pub fn linktag_cmd() -> Command {
    let mut cmd = Command::cargo_bin("linktag").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

pub fn git_available() -> bool {
    process::Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run git in `dir` with a throwaway identity, panicking on failure
pub fn git(dir: &Path, args: &[&str]) {
    let output = process::Command::new("git")
        .arg("-C")
        .arg(dir)
        .args([
            "-c",
            "user.name=linktag",
            "-c",
            "user.email=linktag@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

pub fn init_repo(dir: &Path) {
    git(dir, &["init", "-q"]);
}

pub fn commit_all(dir: &Path, message: &str) {
    git(dir, &["add", "-A"]);
    git(dir, &["commit", "-q", "-m", message]);
}

pub const SOURCE: &str = "fn a() {
    let x = 1;
    // @linked_tag{g1:span_begin}
    let y = 2;
    let z = 3;
    let w = 4;
    // @linked_tag{g1:span_end}
    x + y + z + w
}
";

pub const NOTES: &str = "# Notes
<!-- @linked_tag{g1:entire_file:listener} -->
Some text.
";

/// a.rs holds a span for `g1` on lines 3-7, b.md listens to it as a whole file
pub fn write_fixture(dir: &Path) {
    fs::write(dir.join("a.rs"), SOURCE).unwrap();
    fs::write(dir.join("b.md"), NOTES).unwrap();
}

/// Change line 5 of a.rs, inside the `g1` span
pub fn edit_span(dir: &Path) {
    fs::write(dir.join("a.rs"), SOURCE.replace("let z = 3;", "let z = 30;")).unwrap();
}

pub fn edit_notes(dir: &Path) {
    fs::write(dir.join("b.md"), NOTES.replace("Some text.", "More text.")).unwrap();
}
