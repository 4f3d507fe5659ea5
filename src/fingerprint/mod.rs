//! Position-insensitive catalog fingerprints.
//!
//! A fingerprint is the canonical serialization of a catalog with every
//! source position zeroed. Two fingerprints are equal exactly when the
//! catalogs differ in nothing but line numbers, so moving a story around
//! in its file or editing a comment never triggers a reload.

use std::fmt;

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::Result;

/// Hex characters kept in [`Fingerprint::digest`].
const DIGEST_LEN: usize = 12;

/// Canonical, comparison-stable snapshot of a catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Reduce a catalog to its fingerprint.
    ///
    /// The catalog is cloned, so the caller keeps its positions.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be serialized.
    pub fn of(catalog: &Catalog) -> Result<Self> {
        let mut stripped = catalog.clone();
        for entry in stripped.entries_mut() {
            entry.loc_start = 0;
            entry.loc_end = 0;
        }

        let json = serde_json::to_string(&stripped).map_err(CatalogError::from)?;
        Ok(Self(json))
    }

    /// The empty sentinel held before any catalog was observed.
    #[must_use]
    pub const fn empty() -> Self {
        Self(String::new())
    }

    /// Whether this is the empty sentinel.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The serialized form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short blake3 digest for log lines.
    #[must_use]
    pub fn digest(&self) -> String {
        let hash = blake3::hash(self.0.as_bytes()).to_hex();
        hash.as_str()[..DIGEST_LEN].to_string()
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("<none>")
        } else {
            f.write_str(&self.digest())
        }
    }
}

/// Result of trying to fingerprint the current state of the stories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintOutcome {
    /// A fingerprint was computed.
    Ready(Fingerprint),
    /// No trustworthy fingerprint could be computed.
    Unavailable(String),
}

impl FingerprintOutcome {
    /// Fingerprint the result of a catalog build.
    ///
    /// The outcome is `Unavailable` when the build failed, or when files
    /// matched and none of them parsed. A build that matched no files at all
    /// yields a valid, empty fingerprint.
    #[must_use]
    pub fn from_build(build: Result<Catalog>) -> Self {
        let catalog = match build {
            Ok(catalog) => catalog,
            Err(e) => return Self::Unavailable(e.to_string()),
        };

        let matched = catalog.matched_files();
        if matched > 0 && catalog.parse_failures() == matched {
            return Self::Unavailable(format!("all {matched} story files failed to parse"));
        }

        match Fingerprint::of(&catalog) {
            Ok(fingerprint) => Self::Ready(fingerprint),
            Err(e) => Self::Unavailable(e.to_string()),
        }
    }

    /// The fingerprint, if one was computed.
    #[must_use]
    pub const fn fingerprint(&self) -> Option<&Fingerprint> {
        match self {
            Self::Ready(fingerprint) => Some(fingerprint),
            Self::Unavailable(_) => None,
        }
    }

    /// Whether a fingerprint was computed.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}
