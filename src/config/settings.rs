//! Configuration settings and validation.

use std::path::PathBuf;
use std::time::Duration;

use crate::watcher::StoryGlob;
use crate::{Error, Result};

/// Default glob for story files, relative to the project root.
pub const DEFAULT_STORIES_GLOB: &str = "src/**/*.stories.{js,jsx,ts,tsx}";

/// Longest accepted debounce window.
const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Main configuration for the storydev server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Glob matching story files, relative to `root`.
    pub stories: String,

    /// Project root the glob is resolved against.
    pub root: PathBuf,

    /// Host address to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines.
    pub log_json: bool,

    /// Debounce window for filesystem events, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stories: DEFAULT_STORIES_GLOB.to_string(),
            root: PathBuf::from("."),
            host: "127.0.0.1".to_string(),
            port: 61000,
            log_level: "info".to_string(),
            log_json: false,
            debounce_ms: 100,
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::config("port cannot be 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.host.is_empty() {
            return Err(Error::config("host cannot be empty"));
        }

        if self.stories.trim().is_empty() {
            return Err(Error::config("stories glob cannot be empty"));
        }

        if self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(Error::config(format!(
                "debounce_ms cannot exceed {MAX_DEBOUNCE_MS}"
            )));
        }

        StoryGlob::new(&self.stories)?;

        Ok(())
    }

    /// Compile the stories glob.
    ///
    /// # Errors
    ///
    /// Returns an error if the glob is invalid.
    pub fn story_glob(&self) -> Result<StoryGlob> {
        StoryGlob::new(&self.stories)
    }

    /// Debounce window as a `Duration`.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Get the server address as a string.
    #[must_use]
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
