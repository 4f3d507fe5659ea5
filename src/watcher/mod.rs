//! File system watching over the stories glob.
//!
//! This module provides:
//! - Glob compilation and matching with default ignores
//! - Gitignore-aware story file enumeration
//! - A debounced notify-rs subscription emitting add/change/unlink batches
//! - The watch session that turns batches into reload decisions

mod events;
mod filter;
mod scanner;
mod session;
#[allow(clippy::module_inception)]
mod watcher;

pub use events::{EventBatch, StoryEvent};
pub use filter::StoryGlob;
pub use scanner::{resolve_story_files, resolve_story_files_async, resolve_story_files_in};
pub use session::{SessionState, SessionStats, SessionStatsSnapshot, WatchSession};
pub use watcher::{StoryWatcher, WatcherConfig};
