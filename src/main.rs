//! transhub: web-based translation project management.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                   TRANSHUB                        │
//!                    │                                                   │
//!   Client Request   │  ┌─────────┐    ┌──────────┐    ┌─────────────┐  │
//!   ─────────────────┼─▶│  http   │───▶│ handlers │───▶│    store    │  │
//!                    │  │ server  │    │          │    │  (SQLite)   │  │
//!                    │  └─────────┘    └────┬─────┘    └─────────────┘  │
//!                    │                      │                           │
//!                    │                      ▼                           │
//!                    │               ┌─────────────┐                    │
//!                    │               │    trans    │  working copies,   │
//!                    │               │   backend   │  PO stats, merge   │
//!                    │               └─────────────┘                    │
//!                    │                                                   │
//!                    │  ┌────────────────────────────────────────────┐  │
//!                    │  │           Cross-Cutting Concerns            │  │
//!                    │  │  config · auth · actionlog · observability │  │
//!                    │  └────────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use tokio::net::TcpListener;

use transhub::config::loader::load_config;
use transhub::config::HubConfig;
use transhub::lifecycle::Shutdown;
use transhub::observability::{logging, metrics};
use transhub::store::{Repository, StoreConnection};
use transhub::HttpServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("transhub.toml"));
    let config = if config_path.exists() {
        load_config(&config_path)?
    } else {
        HubConfig::default()
    };

    logging::init_logging(&config.observability.log_filter);

    tracing::info!("transhub v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        database = %config.storage.database_path,
        repo_root = %config.storage.repo_root,
        "Configuration loaded"
    );

    // Open the store and bootstrap the admin account.
    let store = Repository::new(StoreConnection::open(&config.storage.database_path)?);
    store
        .ensure_user(&config.auth.admin_username, &config.auth.admin_password, true)
        .await?;

    // Initialize metrics exporter
    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        address = %local_addr,
        "Listening for connections"
    );

    // Create and run HTTP server
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, store);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
