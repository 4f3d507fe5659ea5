//! Live-reload decisions.
//!
//! This module provides:
//! - The `ServerBridge` seam to the dev server's module graph and clients
//! - The reload event wire format
//! - `ReloadDirector`, which turns fingerprint changes into reloads

mod bridge;
mod director;

pub use bridge::{
    InvalidateOutcome, ReloadEvent, ServerBridge, GENERATED_LIST_MODULE_ID, RELOAD_ALL_PATH,
};
pub use director::{ReloadDecision, ReloadDirector};
