//! Main application server.
//!
//! Provides the complete server application: the HTTP router, the watch
//! session feeding reloads into it, signal handling and graceful shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::bridge::DevServerBridge;
use super::observability::spans;
use super::rest::{create_rest_router, DevState};
use crate::catalog::CatalogBuilder;
use crate::watcher::{StoryWatcher, WatchSession, WatcherConfig};
use crate::{Config, Result};

/// Application server.
pub struct App {
    config: Config,
    state: Arc<DevState>,
}

impl App {
    /// Create a new application.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the project root
    /// does not exist.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let builder = CatalogBuilder::new(&config.root, config.story_glob()?)?;
        let state = Arc::new(DevState::new(Arc::new(builder)));
        Ok(Self { config, state })
    }

    /// Shared server state.
    #[must_use]
    pub fn state(&self) -> Arc<DevState> {
        Arc::clone(&self.state)
    }

    /// Build the router with all endpoints.
    pub(crate) fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_rest_router(Arc::clone(&self.state))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &axum::http::Request<_>| {
                        let request_id = request
                            .headers()
                            .get("x-request-id")
                            .and_then(|v| v.to_str().ok())
                            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);

                        spans::request_span(
                            request.method().as_str(),
                            &request.uri().to_string(),
                            &request_id,
                        )
                    })
                    .on_response(
                        |response: &axum::response::Response,
                         latency: std::time::Duration,
                         _span: &tracing::Span| {
                            tracing::debug!(
                                status = %response.status(),
                                latency_ms = latency.as_millis(),
                                "Request completed"
                            );
                        },
                    ),
            )
            .layer(cors)
    }

    /// Start the watch session on its own task.
    ///
    /// The initial catalog is built and primed before this returns, so the
    /// first filesystem event is compared against the startup state.
    ///
    /// # Errors
    ///
    /// Returns an error if the file set cannot be enumerated or the watcher
    /// cannot subscribe.
    pub async fn spawn_watch_session(
        &self,
        shutdown: CancellationToken,
    ) -> Result<tokio::task::JoinHandle<()>> {
        let builder = Arc::clone(&self.state.builder);
        let initial = builder.resolve_files().await?;

        let watcher_config = WatcherConfig {
            root: builder.root().to_path_buf(),
            glob: builder.glob().clone(),
            debounce: self.config.debounce(),
        };
        let watcher = StoryWatcher::new(&watcher_config, initial)?;

        let bridge: DevServerBridge = self.state.bridge();
        let mut session = WatchSession::new(builder, bridge);
        session.start().await;

        Ok(tokio::spawn(async move {
            let stats = session.watch(watcher, shutdown).await;
            tracing::info!(
                batches = stats.batches,
                reloads = stats.reloads,
                "Watch session stopped"
            );
        }))
    }

    /// Run the server until shutdown signal.
    ///
    /// The server listens for SIGTERM (Unix) and Ctrl+C signals,
    /// then gracefully shuts down all connections and the watch session.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot start or encounters
    /// a fatal error during execution.
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .server_addr()
            .parse()
            .map_err(|e| crate::Error::config(format!("invalid address: {e}")))?;

        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            crate::error::ServerError::BindFailed {
                address: addr.to_string(),
                reason: e.to_string(),
            }
        })?;

        let shutdown = CancellationToken::new();
        let session = self.spawn_watch_session(shutdown.child_token()).await?;

        tracing::info!(%addr, stories = %self.config.stories, "Server listening");

        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::error::ServerError::Request(e.to_string()));

        shutdown.cancel();
        if let Err(e) = session.await {
            tracing::warn!(error = %e, "Watch session task failed");
        }

        served?;
        tracing::info!("Server shut down gracefully");
        Ok(())
    }
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
