//! Infrastructure layer - External I/O and persistence

pub mod change_provider;
pub mod config;
pub mod scanner;
pub mod vcs;

pub use change_provider::ChangeSetProvider;
pub use config::Config;
pub use scanner::{FileScanner, ScanOptions};
pub use vcs::{GitCli, VersionControl};
