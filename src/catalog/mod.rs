//! Story discovery and the catalog built from it.
//!
//! This module provides:
//! - Story export extraction with the oxc parser
//! - Id and title derivation
//! - Deterministic catalog assembly over a file set
//! - The `meta.json` view of a catalog

mod builder;
mod entry;
mod meta;
pub mod naming;
mod parser;

pub use builder::CatalogBuilder;
pub use entry::{Catalog, CatalogWarning, StoryEntry};
pub use meta::{About, MetaJson, MetaStory};
pub use parser::{parse_story_file, parse_story_source, relative_file_path};

#[cfg(test)]
pub(crate) use entry::test_entry;
