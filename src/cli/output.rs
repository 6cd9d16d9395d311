//! Output formatting utilities

use crate::application::list_tags::TagInventory;
use crate::domain::policy::{InconclusiveReason, Outcome};
use crate::domain::report::Report;
use crate::error::Result;
use std::fs;
use std::path::Path;

/// Format a check report for the terminal
pub fn format_report(report: &Report) -> String {
    let mut output = String::new();

    for error in &report.parse_errors {
        output.push_str(&format!("ERROR {}\n", error));
    }
    for error in &report.structural_errors {
        output.push_str(&format!("ERROR {}\n", error));
    }
    for warning in &report.warnings {
        output.push_str(&format!(" WARN {}\n", warning));
    }
    for skipped in &report.skipped_files {
        output.push_str(&format!(" WARN skipped {}: {}\n", skipped.path.display(), skipped.reason));
    }

    for verdict in report.violated() {
        output.push_str(&format!("VIOLATED {}\n", verdict.group_id));
        for violation in &verdict.violations {
            output.push_str(&format!(
                "\tchanged:     {}\n\tnot changed: {}\n",
                violation.talker, violation.listener
            ));
        }
    }

    for verdict in &report.verdicts {
        if verdict.outcome != Outcome::Inconclusive {
            continue;
        }
        let reason = match &verdict.reason {
            Some(InconclusiveReason::MissingBaseline { detail }) => detail.clone(),
            Some(InconclusiveReason::UnresolvableTags) => {
                "tags in files that no longer exist".to_string()
            }
            Some(InconclusiveReason::Directionless { .. }) | None => continue,
        };
        output.push_str(&format!("INCONCLUSIVE {}: {}\n", verdict.group_id, reason));
    }

    let s = &report.summary;
    output.push_str(&format!(
        "== {} files scanned, {} tag ids found.\n",
        s.files_scanned, s.groups
    ));
    if report.comparison.is_some() {
        output.push_str(&format!(
            "== {} satisfied, {} violated, {} inconclusive\n",
            s.satisfied, s.violated, s.inconclusive
        ));
    }
    output
}

/// Format link groups for display.
pub fn format_inventory(inventory: &TagInventory) -> String {
    let mut output = String::new();

    for error in &inventory.parse_errors {
        output.push_str(&format!("ERROR {}\n", error));
    }
    for error in &inventory.structural_errors {
        output.push_str(&format!("ERROR {}\n", error));
    }

    if inventory.groups.is_empty() {
        output.push_str("No tags found\n");
        return output;
    }

    for group in &inventory.groups {
        output.push_str(&format!("{}\n", group.id));
        for tag in &group.tags {
            output.push_str(&format!("\t{}\n", tag));
        }
    }

    output
}

/// Write the report as pretty JSON, creating parent directories.
pub fn write_json_report(report: &Report, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}
