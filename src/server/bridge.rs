//! `ServerBridge` over the in-process module graph and client hub.

use std::sync::Arc;

use super::module_graph::ModuleGraph;
use super::sse::ClientHub;
use crate::reload::{InvalidateOutcome, ReloadEvent, ServerBridge};

/// Bridge the reload director drives in a running server.
#[derive(Debug, Clone)]
pub struct DevServerBridge {
    graph: Arc<ModuleGraph>,
    hub: ClientHub,
}

impl DevServerBridge {
    /// Create a bridge over shared server state.
    #[must_use]
    pub fn new(graph: Arc<ModuleGraph>, hub: ClientHub) -> Self {
        Self { graph, hub }
    }
}

impl ServerBridge for DevServerBridge {
    fn invalidate_module(&self, module_id: &str) -> InvalidateOutcome {
        if self.graph.invalidate(module_id) {
            tracing::debug!(module = %module_id.escape_debug(), "Module invalidated");
            InvalidateOutcome::Invalidated
        } else {
            InvalidateOutcome::NotLoaded
        }
    }

    fn notify_clients(&self, event: &ReloadEvent) -> usize {
        let clients = self.hub.send(event);
        tracing::debug!(clients, event = %event.to_json(), "Clients notified");
        clients
    }
}
