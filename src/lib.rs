//! storydev library.
//!
//! Keeps a component-story catalog in sync with the files on disk and
//! reloads connected browsers only when the catalog actually changed.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod reload;
pub mod server;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
