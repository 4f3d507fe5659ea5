//! The dev server shell around the reload core.
//!
//! This module provides:
//! - The HTTP router (`meta.json`, the generated story list, health, metrics)
//! - An SSE channel pushing reload events to browsers
//! - The module graph and the `ServerBridge` over it
//! - Logging and Prometheus metrics setup

mod app;
mod bridge;
pub mod metrics;
mod module_graph;
pub mod observability;
mod rest;
mod sse;

pub use app::App;
pub use bridge::DevServerBridge;
pub use metrics::init_metrics;
pub use module_graph::{render_story_list, ModuleGraph};
pub use observability::init_tracing;
pub use rest::{create_rest_router, DevState, HealthResponse};
pub use sse::ClientHub;
