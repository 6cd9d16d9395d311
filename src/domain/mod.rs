//! Domain layer - Business logic and domain models

pub mod change_set;
pub mod policy;
pub mod report;
pub mod tags;

pub use change_set::{ChangeSet, Comparison, FileChange};
pub use report::Report;
