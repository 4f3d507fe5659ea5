//! Structured logging and tracing configuration.
//!
//! Provides setup for observability using the `tracing` crate with:
//! - Plain or JSON output
//! - `RUST_LOG` taking precedence over the configured level
//! - Span constructors shared by the catalog and reload paths

use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Registry,
};

/// Initialize tracing.
///
/// `RUST_LOG` wins over `level` when set. Logs go to stderr. Calling this
/// twice in one process is a no-op for the second call.
pub fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let result = if json {
        let json_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr);

        Registry::default()
            .with(env_filter)
            .with(json_layer)
            .try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!("Tracing initialized: level={}, json={}", level, json);
    }
}

/// Span constructors.
pub mod spans {
    use std::path::Path;

    use tracing::{info_span, Span};

    /// Span for one catalog build.
    #[must_use]
    pub fn catalog_span(root: &Path) -> Span {
        info_span!("catalog_build", root = %root.display())
    }

    /// Span for a reload decision.
    #[must_use]
    pub fn reload_span(from: &str, to: &str) -> Span {
        info_span!("reload", from = %from, to = %to)
    }

    /// Span for one HTTP request.
    #[must_use]
    pub fn request_span(method: &str, uri: &str, request_id: &str) -> Span {
        info_span!(
            "http_request",
            method = %method,
            uri = %uri,
            request_id = %request_id,
        )
    }
}
