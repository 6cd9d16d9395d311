//! CLI layer - Command-line interface

pub mod commands;
pub mod output;

pub use commands::{comparison_from_flags, Cli, Commands, ScanArgs};
pub use output::{format_inventory, format_report, write_json_report};
