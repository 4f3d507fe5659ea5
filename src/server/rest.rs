//! HTTP endpoints of the dev server.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;

use super::bridge::DevServerBridge;
use super::metrics::STORIES_TOTAL;
use super::module_graph::{render_story_list, ModuleGraph};
use super::sse::{reload_stream, ClientHub};
use crate::catalog::{CatalogBuilder, MetaJson};
use crate::reload::GENERATED_LIST_MODULE_ID;

/// State shared by the HTTP handlers and the watch session.
#[derive(Debug)]
pub struct DevState {
    pub builder: Arc<CatalogBuilder>,
    pub graph: Arc<ModuleGraph>,
    pub hub: ClientHub,
}

impl DevState {
    /// Create state with an empty module graph and no clients.
    #[must_use]
    pub fn new(builder: Arc<CatalogBuilder>) -> Self {
        Self {
            builder,
            graph: Arc::new(ModuleGraph::new()),
            hub: ClientHub::new(),
        }
    }

    /// Bridge over this state for the reload director.
    #[must_use]
    pub fn bridge(&self) -> DevServerBridge {
        DevServerBridge::new(Arc::clone(&self.graph), self.hub.clone())
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub stories: i64,
    pub clients: usize,
}

/// Create the dev server router.
pub fn create_rest_router(state: Arc<DevState>) -> Router {
    Router::new()
        .route("/meta.json", get(meta_json))
        .route("/generated-list.js", get(generated_list))
        .route("/__reload", get(reload_stream))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .fallback(fallback)
        .with_state(state)
}

/// Fresh catalog as `meta.json`.
async fn meta_json(State(state): State<Arc<DevState>>) -> Response {
    match state.builder.build().await {
        Ok(catalog) => {
            tracing::debug!(stories = catalog.story_count(), "Serving meta.json");
            Json(MetaJson::from(&catalog)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to build meta.json");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// The generated story list module, regenerated after invalidation.
async fn generated_list(State(state): State<Arc<DevState>>) -> Response {
    let source = if let Some(cached) = state.graph.get(GENERATED_LIST_MODULE_ID) {
        cached
    } else {
        let generation = state.graph.generation();
        match state.builder.build().await {
            Ok(catalog) => {
                tracing::debug!(stories = catalog.story_count(), "Generating story list");
                let rendered = render_story_list(&catalog);
                state
                    .graph
                    .insert_if_generation(GENERATED_LIST_MODULE_ID, generation, rendered.as_str())
                    .unwrap_or_else(|| {
                        tracing::debug!("Story list changed while rendering, not cached");
                        Arc::from(rendered)
                    })
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to generate story list");
                return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
            }
        }
    };

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        source.to_string(),
    )
        .into_response()
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<DevState>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        stories: STORIES_TOTAL.get(),
        clients: state.hub.client_count(),
    };

    tracing::debug!(clients = response.clients, "Health check");

    (StatusCode::OK, Json(response))
}

/// Prometheus metrics endpoint.
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            tracing::trace!("Metrics encoded successfully");
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                buffer,
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                b"Failed to encode metrics".to_vec(),
            )
        }
    }
}

/// Every HEAD request succeeds; anything else unmatched is a 404.
async fn fallback(method: Method) -> StatusCode {
    if method == Method::HEAD {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reload::{InvalidateOutcome, ServerBridge};
    use crate::watcher::StoryGlob;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn create_test_state(tmp: &TempDir) -> Arc<DevState> {
        let src = tmp.path().join("src");
        fs::create_dir_all(&src).unwrap();
        fs::write(
            src.join("button.stories.js"),
            "export default { title: \"Forms/Button\" };\n\nexport const Primary = () => null;\n",
        )
        .unwrap();

        let glob = StoryGlob::new("src/**/*.stories.js").unwrap();
        let builder = CatalogBuilder::new(tmp.path(), glob).unwrap();
        Arc::new(DevState::new(Arc::new(builder)))
    }

    async fn get(app: Router, method: Method, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_meta_json() {
        let tmp = TempDir::new().unwrap();
        let app = create_rest_router(create_test_state(&tmp));

        let (status, body) = get(app, Method::GET, "/meta.json").await;
        assert_eq!(status, StatusCode::OK);

        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        let story = &value["stories"]["forms--button--primary"];
        assert_eq!(story["name"], "Primary");
        assert_eq!(story["title"], "Forms / Button");
        assert_eq!(story["filePath"], "src/button.stories.js");
        assert_eq!(story["locStart"], 3);
    }

    #[tokio::test]
    async fn test_meta_json_is_not_cached() {
        let tmp = TempDir::new().unwrap();
        let state = create_test_state(&tmp);

        let (_, before) = get(create_rest_router(Arc::clone(&state)), Method::GET, "/meta.json").await;
        fs::write(
            tmp.path().join("src/card.stories.js"),
            "export const Default = () => null;",
        )
        .unwrap();
        let (_, after) = get(create_rest_router(state), Method::GET, "/meta.json").await;

        assert!(!before.contains("card--default"));
        assert!(after.contains("card--default"));
    }

    #[tokio::test]
    async fn test_generated_list_is_cached_until_invalidated() {
        let tmp = TempDir::new().unwrap();
        let state = create_test_state(&tmp);

        let (status, body) =
            get(create_rest_router(Arc::clone(&state)), Method::GET, "/generated-list.js").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("forms--button--primary"));
        assert!(state.graph.is_loaded(GENERATED_LIST_MODULE_ID));

        fs::write(
            tmp.path().join("src/card.stories.js"),
            "export const Default = () => null;",
        )
        .unwrap();
        let (_, stale) =
            get(create_rest_router(Arc::clone(&state)), Method::GET, "/generated-list.js").await;
        assert!(!stale.contains("card--default"));

        state.graph.invalidate(GENERATED_LIST_MODULE_ID);
        let (_, fresh) = get(create_rest_router(state), Method::GET, "/generated-list.js").await;
        assert!(fresh.contains("card--default"));
    }

    #[tokio::test]
    async fn test_generated_list_invalidated_mid_render_is_not_cached() {
        let tmp = TempDir::new().unwrap();
        let state = create_test_state(&tmp);

        // an invalidation lands after the handler read the generation
        let seen = state.graph.generation();
        let bridge = state.bridge();
        assert_eq!(
            bridge.invalidate_module(GENERATED_LIST_MODULE_ID),
            InvalidateOutcome::NotLoaded
        );
        let stale = state.graph.insert_if_generation(GENERATED_LIST_MODULE_ID, seen, "stale");
        assert!(stale.is_none());
        assert!(!state.graph.is_loaded(GENERATED_LIST_MODULE_ID));

        let (status, body) =
            get(create_rest_router(Arc::clone(&state)), Method::GET, "/generated-list.js").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("forms--button--primary"));
        assert!(state.graph.is_loaded(GENERATED_LIST_MODULE_ID));
    }

    #[tokio::test]
    async fn test_head_any_path() {
        let tmp = TempDir::new().unwrap();
        let app = create_rest_router(create_test_state(&tmp));

        let (status, _) = get(app, Method::HEAD, "/some/story/route").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_get_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let app = create_rest_router(create_test_state(&tmp));

        let (status, _) = get(app, Method::GET, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_check() {
        let tmp = TempDir::new().unwrap();
        let app = create_rest_router(create_test_state(&tmp));

        let (status, body) = get(app, Method::GET, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("healthy"));
    }

    #[tokio::test]
    async fn test_metrics() {
        let tmp = TempDir::new().unwrap();
        let app = create_rest_router(create_test_state(&tmp));

        let (status, _) = get(app, Method::GET, "/metrics").await;
        assert_eq!(status, StatusCode::OK);
    }
}
