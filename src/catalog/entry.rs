//! Story entries and the catalog that groups them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// One discovered story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryEntry {
    /// Catalog-wide unique id, e.g. `forms--text-input--default`.
    pub id: String,
    /// Display name of the story.
    pub name: String,
    /// Title hierarchy.
    pub levels: Vec<String>,
    /// `levels` joined with ` / `.
    pub title: String,
    /// Name of the exported binding in the source file.
    pub export_name: String,
    /// Project-relative, `/`-separated path of the declaring file.
    pub file_path: String,
    /// First source line of the export (1-based).
    pub loc_start: u32,
    /// Last source line of the export (1-based).
    pub loc_end: u32,
    /// Static story metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

/// Non-fatal problem found while building a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogWarning {
    /// A file failed to parse and contributes no stories.
    ParseFailed { file_path: String, reason: String },
    /// A story id was already claimed by an earlier file.
    IdCollision {
        id: String,
        kept: String,
        dropped: String,
    },
}

impl fmt::Display for CatalogWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseFailed { file_path, reason } => {
                write!(f, "skipped '{file_path}': {reason}")
            }
            Self::IdCollision { id, kept, dropped } => write!(
                f,
                "story id '{id}' in '{dropped}' already defined in '{kept}'"
            ),
        }
    }
}

/// All stories discovered across the matched files.
///
/// Files are keyed by path and stories within a file are sorted by id, so
/// two catalogs built from the same files are structurally identical no
/// matter in which order they were assembled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    files: BTreeMap<String, Vec<StoryEntry>>,
    story_count: usize,
    #[serde(skip)]
    matched_files: usize,
    #[serde(skip)]
    warnings: Vec<CatalogWarning>,
}

impl Catalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file's entries, replacing any previous entries for it.
    pub fn insert_file(&mut self, file_path: impl Into<String>, mut entries: Vec<StoryEntry>) {
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        self.files.insert(file_path.into(), entries);
        self.story_count = self.files.values().map(Vec::len).sum();
    }

    /// Record a build warning.
    pub fn push_warning(&mut self, warning: CatalogWarning) {
        self.warnings.push(warning);
    }

    /// Record how many files the glob matched.
    pub fn set_matched_files(&mut self, count: usize) {
        self.matched_files = count;
    }

    /// Entries per file.
    #[must_use]
    pub fn files(&self) -> &BTreeMap<String, Vec<StoryEntry>> {
        &self.files
    }

    /// Mutable iterator over every entry.
    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut StoryEntry> {
        self.files.values_mut().flatten()
    }

    /// Iterate every story in file, then id order.
    pub fn stories(&self) -> impl Iterator<Item = &StoryEntry> {
        self.files.values().flatten()
    }

    /// Look up a story by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StoryEntry> {
        self.stories().find(|entry| entry.id == id)
    }

    /// Check whether a story id is present.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Set of all story ids.
    #[must_use]
    pub fn ids(&self) -> BTreeSet<&str> {
        self.stories().map(|entry| entry.id.as_str()).collect()
    }

    /// Total number of stories.
    #[must_use]
    pub const fn story_count(&self) -> usize {
        self.story_count
    }

    /// Number of files the glob matched, including ones that failed to parse.
    #[must_use]
    pub const fn matched_files(&self) -> usize {
        self.matched_files
    }

    /// Warnings recorded while building.
    #[must_use]
    pub fn warnings(&self) -> &[CatalogWarning] {
        &self.warnings
    }

    /// Number of matched files that failed to parse.
    #[must_use]
    pub fn parse_failures(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, CatalogWarning::ParseFailed { .. }))
            .count()
    }
}

#[cfg(test)]
pub(crate) fn test_entry(id: &str, file_path: &str, loc_start: u32) -> StoryEntry {
    StoryEntry {
        id: id.to_string(),
        name: id.to_string(),
        levels: vec![file_path.to_string()],
        title: file_path.to_string(),
        export_name: id.to_string(),
        file_path: file_path.to_string(),
        loc_start,
        loc_end: loc_start + 2,
        meta: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_sorts_entries() {
        let mut catalog = Catalog::new();
        catalog.insert_file(
            "a.js",
            vec![test_entry("z", "a.js", 1), test_entry("b", "a.js", 5)],
        );

        let ids: Vec<&str> = catalog.stories().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "z"]);
        assert_eq!(catalog.story_count(), 2);
    }

    #[test]
    fn test_story_count_tracks_replacement() {
        let mut catalog = Catalog::new();
        catalog.insert_file("a.js", vec![test_entry("a", "a.js", 1)]);
        catalog.insert_file("b.js", vec![test_entry("b", "b.js", 1)]);
        catalog.insert_file("a.js", Vec::new());

        assert_eq!(catalog.story_count(), 1);
        assert!(catalog.contains("b"));
        assert!(!catalog.contains("a"));
    }

    #[test]
    fn test_parse_failure_count() {
        let mut catalog = Catalog::new();
        catalog.push_warning(CatalogWarning::ParseFailed {
            file_path: "x.js".to_string(),
            reason: "bad".to_string(),
        });
        catalog.push_warning(CatalogWarning::IdCollision {
            id: "a".to_string(),
            kept: "a.js".to_string(),
            dropped: "b.js".to_string(),
        });

        assert_eq!(catalog.parse_failures(), 1);
        assert_eq!(catalog.warnings().len(), 2);
    }

    #[test]
    fn test_warning_display() {
        let warning = CatalogWarning::IdCollision {
            id: "a--default".to_string(),
            kept: "src/a.js".to_string(),
            dropped: "src/b.js".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "story id 'a--default' in 'src/b.js' already defined in 'src/a.js'"
        );
    }
}
