//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID, metrics)
//! - Bind server to listener
//! - Coordinate graceful shutdown

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::auth;
use crate::config::HubConfig;
use crate::http::handlers;
use crate::observability::metrics;
use crate::store::Repository;
use crate::trans::TranslationBackend;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Repository,
    pub trans: TranslationBackend,
    pub config: Arc<HubConfig>,
}

/// HTTP server for the translation hub.
pub struct HttpServer {
    router: Router,
    config: HubConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and store.
    pub fn new(config: HubConfig, store: Repository) -> Self {
        let trans = TranslationBackend::new(&config.storage.repo_root, store.clone());

        let state = AppState {
            store,
            trans,
            config: Arc::new(config.clone()),
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &HubConfig, state: AppState) -> Router {
        let admin_router = admin::setup_admin_router(state.clone());

        let app = Router::new()
            .merge(auth::routes())
            .merge(handlers::projects::routes())
            .merge(handlers::components::routes())
            .merge(handlers::files::routes(config.uploads.max_bytes))
            .merge(handlers::feeds::routes())
            .with_state(state);

        app.merge(admin_router)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(axum::middleware::from_fn(track_metrics))
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Stops on Ctrl+C or when the shutdown channel fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_signal() => {}
                    _ = shutdown.recv() => {}
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &HubConfig {
        &self.config
    }
}

/// Per-request counters and latency.
async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
