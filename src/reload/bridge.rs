//! The dev-server primitives the reload director drives.

use serde::{Deserialize, Serialize};

/// Id of the virtual module listing every story.
pub const GENERATED_LIST_MODULE_ID: &str = "\0virtual:generated-list";

/// Path used for "reload everything".
pub const RELOAD_ALL_PATH: &str = "*";

/// Message pushed to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReloadEvent {
    /// Reload every page whose path matches `path`.
    FullReload {
        /// Path pattern; `*` reloads everything.
        path: String,
    },
    /// Sent once when a client subscribes.
    Connected {
        /// Server version.
        version: String,
    },
}

impl ReloadEvent {
    /// Full reload of every page.
    #[must_use]
    pub fn full_reload() -> Self {
        Self::FullReload {
            path: RELOAD_ALL_PATH.to_string(),
        }
    }

    /// Greeting for a freshly connected client.
    #[must_use]
    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serialize to a JSON string.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"type":"full-reload","path":"*"}"#.to_string())
    }
}

/// Result of asking the module graph to drop a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidateOutcome {
    /// The module was cached and has been dropped.
    Invalidated,
    /// The module was not loaded; nothing to drop.
    NotLoaded,
}

/// Module-graph and client-channel operations of a running dev server.
///
/// Neither operation can fail: a module that was never loaded and a
/// channel without listeners are both ordinary states.
pub trait ServerBridge: Send + Sync {
    /// Drop the cached module with this id.
    fn invalidate_module(&self, module_id: &str) -> InvalidateOutcome;

    /// Push an event to every connected client, returning how many got it.
    fn notify_clients(&self, event: &ReloadEvent) -> usize;
}

impl<B: ServerBridge + ?Sized> ServerBridge for std::sync::Arc<B> {
    fn invalidate_module(&self, module_id: &str) -> InvalidateOutcome {
        (**self).invalidate_module(module_id)
    }

    fn notify_clients(&self, event: &ReloadEvent) -> usize {
        (**self).notify_clients(event)
    }
}
