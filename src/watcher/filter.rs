//! Story glob matching.

use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::Match;

use crate::error::CatalogError;
use crate::Result;

/// Characters that end the literal prefix of a glob.
const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Directories never searched for stories.
const IGNORED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "target",
    "dist",
    "build",
    ".cache",
    "coverage",
];

/// Per-directory ignore files, highest precedence first.
const IGNORE_FILES: &[&str] = &[".ignore", ".gitignore"];

/// Compiled stories glob.
///
/// Relative patterns are matched against paths relative to the project root.
/// Absolute patterns are matched against absolute paths.
#[derive(Debug, Clone)]
pub struct StoryGlob {
    pattern: String,
    matcher: GlobMatcher,
    base: PathBuf,
    absolute: bool,
}

impl StoryGlob {
    /// Compile a glob pattern.
    ///
    /// A leading `./` is ignored. `*` does not cross `/`; `**` does.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid glob.
    pub fn new(pattern: &str) -> Result<Self> {
        let normalized = pattern.trim().trim_start_matches("./");

        let glob = GlobBuilder::new(normalized)
            .literal_separator(true)
            .build()
            .map_err(|e| CatalogError::InvalidGlob {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            pattern: normalized.to_string(),
            matcher: glob.compile_matcher(),
            base: literal_base(normalized),
            absolute: Path::new(normalized).is_absolute(),
        })
    }

    /// The normalized pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Directory part of the pattern that contains no glob syntax.
    ///
    /// Walking and watching start here instead of at the project root.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Directory to walk or watch for this glob under `root`.
    #[must_use]
    pub fn base_dir(&self, root: &Path) -> PathBuf {
        if self.absolute {
            self.base.clone()
        } else {
            root.join(&self.base)
        }
    }

    /// Check whether `path` (absolute, under `root`) is a story file.
    #[must_use]
    pub fn matches(&self, root: &Path, path: &Path) -> bool {
        let candidate = if self.absolute {
            path
        } else {
            match path.strip_prefix(root) {
                Ok(rel) => rel,
                Err(_) => return false,
            }
        };

        !is_default_ignored(candidate) && self.matcher.is_match(candidate)
    }

    /// Check whether `path` is a story file the scanner would report: it
    /// matches the glob and no hidden or ignore rule excludes it.
    #[must_use]
    pub fn accepts(&self, root: &Path, path: &Path) -> bool {
        self.matches(root, path) && !is_excluded(&self.base_dir(root), path, false)
    }
}

/// Check whether a walk over `base` would skip `path`.
///
/// Mirrors the scanner's walker: hidden entries below `base` are skipped,
/// as is anything matched by a `.ignore`, `.gitignore` or `.git/info/exclude`
/// in an ancestor directory. Deeper ignore files take precedence.
pub(crate) fn is_excluded(base: &Path, path: &Path, is_dir: bool) -> bool {
    if let Ok(rel) = path.strip_prefix(base) {
        if is_hidden(rel) {
            return true;
        }
    }

    for dir in path.ancestors().skip(1) {
        for name in IGNORE_FILES {
            let file = dir.join(name);
            if !file.is_file() {
                continue;
            }
            let (matcher, err) = Gitignore::new(&file);
            if let Some(e) = err {
                tracing::debug!(path = %file.display(), error = %e, "Partial ignore file");
            }
            match matcher.matched_path_or_any_parents(path, is_dir) {
                Match::Ignore(_) => return true,
                Match::Whitelist(_) => return false,
                Match::None => {}
            }
        }

        let exclude = dir.join(".git/info/exclude");
        if exclude.is_file() {
            let mut builder = GitignoreBuilder::new(dir);
            if let Some(e) = builder.add(&exclude) {
                tracing::debug!(path = %exclude.display(), error = %e, "Partial exclude file");
            }
            if let Ok(matcher) = builder.build() {
                match matcher.matched_path_or_any_parents(path, is_dir) {
                    Match::Ignore(_) => return true,
                    Match::Whitelist(_) => return false,
                    Match::None => {}
                }
            }
        }
    }

    false
}

/// Check if any component of a relative path is a dotfile.
fn is_hidden(rel: &Path) -> bool {
    rel.components().any(|component| match component {
        Component::Normal(name) => name.to_string_lossy().starts_with('.'),
        _ => false,
    })
}

/// Literal directory prefix of a glob pattern.
fn literal_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let components: Vec<&str> = pattern.split('/').collect();

    // the last component is the file pattern
    for (i, part) in components.iter().enumerate() {
        if i + 1 == components.len() || part.contains(GLOB_META) {
            break;
        }
        if part.is_empty() {
            if i == 0 {
                base.push("/");
            }
            continue;
        }
        base.push(part);
    }

    base
}

/// Check if a path passes through a directory that never holds stories.
pub(crate) fn is_default_ignored(path: &Path) -> bool {
    path.components().any(|component| match component {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            IGNORED_DIRS.iter().any(|dir| *dir == name)
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_base() {
        assert_eq!(
            literal_base("src/**/*.stories.tsx"),
            PathBuf::from("src")
        );
        assert_eq!(
            literal_base("packages/ui/src/*.stories.{js,tsx}"),
            PathBuf::from("packages/ui/src")
        );
        assert_eq!(literal_base("*.stories.js"), PathBuf::new());
        assert_eq!(literal_base("src/a.stories.js"), PathBuf::from("src"));
        assert_eq!(literal_base("/abs/**/*.js"), PathBuf::from("/abs"));
    }

    #[test]
    fn test_glob_matches_relative() {
        let glob = StoryGlob::new("src/**/*.stories.{js,tsx}").unwrap();
        let root = Path::new("/project");

        assert!(glob.matches(root, Path::new("/project/src/a.stories.js")));
        assert!(glob.matches(root, Path::new("/project/src/deep/b.stories.tsx")));
        assert!(!glob.matches(root, Path::new("/project/src/a.test.js")));
        assert!(!glob.matches(root, Path::new("/project/lib/a.stories.js")));
        assert!(!glob.matches(root, Path::new("/elsewhere/src/a.stories.js")));
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let glob = StoryGlob::new("src/*.story.js").unwrap();
        let root = Path::new("/p");

        assert!(glob.matches(root, Path::new("/p/src/a.story.js")));
        assert!(!glob.matches(root, Path::new("/p/src/nested/a.story.js")));
    }

    #[test]
    fn test_leading_dot_slash_is_ignored() {
        let glob = StoryGlob::new("./src/**/*.stories.tsx").unwrap();
        assert_eq!(glob.pattern(), "src/**/*.stories.tsx");
        assert_eq!(glob.base(), Path::new("src"));
    }

    #[test]
    fn test_node_modules_never_match() {
        let glob = StoryGlob::new("**/*.stories.js").unwrap();
        let root = Path::new("/p");

        assert!(glob.matches(root, Path::new("/p/src/a.stories.js")));
        assert!(!glob.matches(root, Path::new("/p/node_modules/pkg/a.stories.js")));
    }

    #[test]
    fn test_invalid_glob() {
        let err = StoryGlob::new("src/[.js").unwrap_err();
        assert!(err.to_string().contains("invalid stories glob"));
    }

    #[test]
    fn test_accepts_skips_hidden_and_gitignored() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        let src = root.join("src");
        std::fs::create_dir_all(src.join(".drafts")).unwrap();
        std::fs::create_dir_all(src.join("generated")).unwrap();
        std::fs::write(root.join(".gitignore"), "generated/\nold.stories.js\n").unwrap();

        let glob = StoryGlob::new("src/**/*.stories.js").unwrap();

        assert!(glob.accepts(&root, &src.join("a.stories.js")));
        assert!(!glob.accepts(&root, &src.join(".drafts/a.stories.js")));
        assert!(!glob.accepts(&root, &src.join("generated/a.stories.js")));
        assert!(!glob.accepts(&root, &src.join("old.stories.js")));
    }

    #[test]
    fn test_nested_ignore_file_wins() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        let keep = root.join("src/keep");
        std::fs::create_dir_all(&keep).unwrap();
        std::fs::write(root.join(".gitignore"), "*.stories.js\n").unwrap();
        std::fs::write(keep.join(".gitignore"), "!*.stories.js\n").unwrap();

        let glob = StoryGlob::new("src/**/*.stories.js").unwrap();

        assert!(glob.accepts(&root, &keep.join("a.stories.js")));
        assert!(!glob.accepts(&root, &root.join("src/b.stories.js")));
    }

    #[test]
    fn test_base_dir() {
        let glob = StoryGlob::new("src/**/*.js").unwrap();
        assert_eq!(glob.base_dir(Path::new("/p")), PathBuf::from("/p/src"));
    }
}
