//! Catalog assembly from the stories glob.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::Instrument;

use super::entry::{Catalog, CatalogWarning};
use super::parser::{parse_story_file, relative_file_path};
use crate::error::CatalogError;
use crate::server::metrics::{CATALOG_BUILDS, PARSE_FAILURES, STORIES_TOTAL};
use crate::server::observability::spans;
use crate::watcher::{resolve_story_files_async, StoryGlob};
use crate::Result;

/// Builds catalogs from the files matching a glob under a project root.
#[derive(Debug, Clone)]
pub struct CatalogBuilder {
    root: PathBuf,
    glob: StoryGlob,
}

impl CatalogBuilder {
    /// Create a builder.
    ///
    /// The root is canonicalized so paths reported by the filesystem watcher
    /// compare equal to the ones produced here.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` does not exist.
    pub fn new(root: impl AsRef<Path>, glob: StoryGlob) -> Result<Self> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|e| CatalogError::enumeration(root, e))?;
        Ok(Self { root, glob })
    }

    /// Canonical project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stories glob.
    #[must_use]
    pub const fn glob(&self) -> &StoryGlob {
        &self.glob
    }

    /// Resolve the glob to a sorted file list.
    ///
    /// # Errors
    ///
    /// Returns an error if the file set cannot be enumerated.
    pub async fn resolve_files(&self) -> Result<Vec<PathBuf>> {
        resolve_story_files_async(&self.root, &self.glob).await
    }

    /// Build a catalog from the current contents of the matched files.
    ///
    /// Files that fail to parse contribute nothing and are reported as
    /// warnings. When two files declare the same story id, the file that
    /// sorts first keeps it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file set cannot be enumerated.
    pub async fn build(&self) -> Result<Catalog> {
        let span = spans::catalog_span(&self.root);
        let files = self.resolve_files().instrument(span.clone()).await?;
        let catalog = self.build_from_files(&files).instrument(span).await;

        CATALOG_BUILDS.inc();
        #[allow(clippy::cast_possible_wrap)]
        STORIES_TOTAL.set(catalog.story_count() as i64);

        tracing::debug!(
            files = catalog.matched_files(),
            stories = catalog.story_count(),
            warnings = catalog.warnings().len(),
            "Catalog built"
        );

        Ok(catalog)
    }

    /// Build a catalog from an explicit file list.
    pub async fn build_from_files(&self, files: &[PathBuf]) -> Catalog {
        let mut sorted: Vec<&PathBuf> = files.iter().collect();
        sorted.sort();
        sorted.dedup();

        let mut catalog = Catalog::new();
        catalog.set_matched_files(sorted.len());

        let mut owners: HashMap<String, String> = HashMap::new();

        for path in sorted {
            let file_path = relative_file_path(&self.root, path);

            let entries = match parse_story_file(&self.root, path).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %file_path, error = %e, "Skipping story file");
                    PARSE_FAILURES.inc();
                    catalog.push_warning(CatalogWarning::ParseFailed {
                        file_path: file_path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let mut kept = Vec::with_capacity(entries.len());
            for entry in entries {
                if let Some(owner) = owners.get(&entry.id) {
                    let warning = CatalogWarning::IdCollision {
                        id: entry.id.clone(),
                        kept: owner.clone(),
                        dropped: file_path.clone(),
                    };
                    tracing::warn!(%warning, "Duplicate story id");
                    catalog.push_warning(warning);
                    continue;
                }
                owners.insert(entry.id.clone(), file_path.clone());
                kept.push(entry);
            }

            // files without stories stay out of the catalog
            if !kept.is_empty() {
                catalog.insert_file(file_path, kept);
            }
        }

        catalog
    }
}
