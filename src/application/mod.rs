//! Application layer - Use cases and orchestration

pub mod check;
pub mod init;
pub mod list_tags;

pub use check::{CheckOptions, CheckService};
pub use list_tags::{ListTagsService, TagInventory};
