//! Story file enumeration.
//!
//! Walks the glob's base directory respecting .gitignore and collects the
//! files the stories glob matches.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ignore::WalkBuilder;

use super::filter::{is_excluded, StoryGlob};
use crate::error::CatalogError;
use crate::Result;

/// Scan statistics.
#[derive(Debug, Default)]
struct ScanStats {
    files_found: AtomicU64,
    files_matched: AtomicU64,
    skipped: AtomicU64,
}

/// Resolve the stories glob to a sorted list of absolute file paths.
///
/// `root` must exist. A missing glob base directory is not an error: it
/// simply matches nothing yet.
///
/// # Errors
///
/// Returns an error if `root` is not a directory or part of the tree under
/// the glob base cannot be read. A partial file set is never returned.
pub fn resolve_story_files(root: &Path, glob: &StoryGlob) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(CatalogError::enumeration(root, "project root is not a directory").into());
    }

    let base = glob.base_dir(root);
    if !base.exists() {
        tracing::debug!(base = %base.display(), "Glob base does not exist yet");
        return Ok(Vec::new());
    }

    walk_story_files(root, glob, &base)
}

/// Collect the story files at or below `dir`, which must lie under the
/// glob base.
///
/// Applies the same hidden and ignore rules as [`resolve_story_files`],
/// including to `dir` itself.
///
/// # Errors
///
/// Returns an error if part of the tree cannot be read.
pub fn resolve_story_files_in(root: &Path, glob: &StoryGlob, dir: &Path) -> Result<Vec<PathBuf>> {
    let base = glob.base_dir(root);
    if !dir.starts_with(&base) || is_excluded(&base, dir, true) {
        return Ok(Vec::new());
    }

    walk_story_files(root, glob, dir)
}

fn walk_story_files(root: &Path, glob: &StoryGlob, start: &Path) -> Result<Vec<PathBuf>> {
    let stats = ScanStats::default();
    let mut files = Vec::new();

    let walker = WalkBuilder::new(start)
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .require_git(false)
        .ignore(true)
        .parents(true)
        .build();

    for entry in walker {
        match entry {
            Ok(entry) => {
                let entry_path = entry.path();
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }

                stats.files_found.fetch_add(1, Ordering::Relaxed);

                if glob.matches(root, entry_path) {
                    files.push(entry_path.to_path_buf());
                    stats.files_matched.fetch_add(1, Ordering::Relaxed);
                }
            }
            Err(e) if e.is_partial() => {
                tracing::warn!(error = %e, "Malformed ignore file");
            }
            Err(e) if e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound) => {
                // removed mid-walk; the pending event recomputes
                tracing::debug!(error = %e, "Entry vanished during scan");
                stats.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error walking directory");
                return Err(CatalogError::enumeration(start, e).into());
            }
        }
    }

    files.sort();

    tracing::debug!(
        start = %start.display(),
        found = stats.files_found.load(Ordering::Relaxed),
        matched = stats.files_matched.load(Ordering::Relaxed),
        skipped = stats.skipped.load(Ordering::Relaxed),
        "Story scan complete"
    );

    Ok(files)
}

/// Async version of [`resolve_story_files`].
///
/// # Errors
///
/// Returns an error if enumeration fails or the blocking task panics.
pub async fn resolve_story_files_async(root: &Path, glob: &StoryGlob) -> Result<Vec<PathBuf>> {
    let root = root.to_path_buf();
    let glob = glob.clone();

    tokio::task::spawn_blocking(move || resolve_story_files(&root, &glob))
        .await
        .map_err(|e| crate::Error::internal(format!("Scan task failed: {e}")))?
}
