//! Error types and Result aliases for storydev.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using storydev's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for storydev operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Story file parse error.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Catalog build error.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// Server/API error.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Failures while turning one story file into entries.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The file could not be read.
    #[error("failed to read '{}': {reason}", path.display())]
    Read { path: PathBuf, reason: String },

    /// The file is not valid JavaScript / TypeScript.
    #[error("syntax error in '{}': {message}", path.display())]
    Syntax { path: PathBuf, message: String },
}

/// Catalog-wide failures. Per-file problems are warnings, not errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The stories glob could not be compiled.
    #[error("invalid stories glob '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    /// The file set could not be enumerated.
    #[error("failed to enumerate '{}': {reason}", path.display())]
    Enumeration { path: PathBuf, reason: String },

    /// The catalog could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },
}

/// Server/API errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {address}: {reason}")]
    BindFailed { address: String, reason: String },

    /// Request handling error.
    #[error("request error: {0}")]
    Request(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl CatalogError {
    /// Create an enumeration error.
    pub fn enumeration(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Enumeration {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
