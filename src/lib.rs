//! linktag - Linked tag change-policy checker
//!
//! Scans a source tree for `@linked_tag{...}` markers, groups them by id and
//! checks a version-control diff for groups where one tagged region changed
//! but a linked region was left untouched.

pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod logging;

pub use error::LinktagError;
