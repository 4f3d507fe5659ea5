//! Prometheus metrics definitions.

use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};

/// Catalog builds completed.
pub static CATALOG_BUILDS: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "storydev_catalog_builds_total",
        "Total number of catalog builds"
    )
    .expect("metric registers once")
});

/// Story files that failed to parse.
pub static PARSE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "storydev_parse_failures_total",
        "Total number of story files that failed to parse"
    )
    .expect("metric registers once")
});

/// Full reloads sent to clients.
pub static RELOADS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "storydev_reloads_total",
        "Total number of full reloads triggered"
    )
    .expect("metric registers once")
});

/// Stories in the latest catalog.
pub static STORIES_TOTAL: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "storydev_stories_total",
        "Number of stories in the latest catalog"
    )
    .expect("metric registers once")
});

/// Clients subscribed to reload events.
pub static CONNECTED_CLIENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "storydev_connected_clients",
        "Number of clients listening for reload events"
    )
    .expect("metric registers once")
});

/// Initialize all metrics (call once at startup).
pub fn init_metrics() {
    // Access lazy statics to register them
    let _ = &*CATALOG_BUILDS;
    let _ = &*PARSE_FAILURES;
    let _ = &*RELOADS_TOTAL;
    let _ = &*STORIES_TOTAL;
    let _ = &*CONNECTED_CLIENTS;

    tracing::debug!("Prometheus metrics initialized");
}
