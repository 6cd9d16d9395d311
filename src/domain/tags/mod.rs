//! Tag system

pub mod grammar;
pub mod resolver;

// Re-export main types
pub use grammar::{FileMarkers, Marker, MarkerError, MarkerGrammar, ParseError, PolicyKind, TagKind};
pub use resolver::{
    Extent, LinkGroup, Resolution, StructuralError, StructuralErrorKind, Tag, TagResolver,
};
