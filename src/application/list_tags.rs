//! List tags use case

use crate::domain::tags::{LinkGroup, ParseError, StructuralError, TagResolver};
use crate::error::Result;
use crate::infrastructure::scanner::{FileScanner, ScanOptions};
use std::path::Path;

/// Every link group found under a root, with the problems met on the way
#[derive(Debug, Clone, Default)]
pub struct TagInventory {
    pub groups: Vec<LinkGroup>,
    pub parse_errors: Vec<ParseError>,
    pub structural_errors: Vec<StructuralError>,
}

/// Service for listing link groups without any version comparison.
pub struct ListTagsService;

impl ListTagsService {
    /// Scan `root` and resolve its tags.
    ///
    /// `filter` keeps only groups whose id contains the given text.
    pub fn execute(root: &Path, options: &ScanOptions, filter: Option<&str>) -> Result<TagInventory> {
        let scan = FileScanner::new(root, options)?.scan();
        let resolution = TagResolver::resolve_all(&scan.files);

        let mut groups = resolution.groups;
        if let Some(filter) = filter {
            groups.retain(|g| g.id.contains(filter));
        }

        Ok(TagInventory {
            groups,
            parse_errors: scan.files.into_iter().flat_map(|f| f.errors).collect(),
            structural_errors: resolution.errors,
        })
    }
}
