//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the hub.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the translation hub.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HubConfig {
    /// Listener configuration (bind address, limits).
    pub listener: ListenerConfig,

    /// Persistence and working-copy locations.
    pub storage: StorageConfig,

    /// Translation file upload settings.
    pub uploads: UploadConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Authentication bootstrap settings.
    pub auth: AuthConfig,

    /// Syndication feed settings.
    pub feeds: FeedConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub database_path: String,

    /// Root directory holding component working copies.
    /// Layout: `<repo_root>/<project_slug>/<component_slug>/`.
    pub repo_root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "transhub.db".to_string(),
            repo_root: "repos".to_string(),
        }
    }
}

/// Upload limits for translation file submission.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum accepted upload size in bytes.
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Authentication bootstrap configuration.
///
/// The admin account is created at startup if it does not exist yet.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Username of the bootstrap admin account.
    pub admin_username: String,

    /// Password of the bootstrap admin account.
    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_username: "admin".to_string(),
            admin_password: "admin-secret-key".to_string(),
        }
    }
}

/// Syndication feed configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Absolute URL prefix used when building feed links.
    pub base_url: String,

    /// Maximum number of items per feed.
    pub item_limit: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            item_limit: 20,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default tracing filter when RUST_LOG is unset.
    pub log_filter: String,

    /// Enable the Prometheus metrics exporter.
    pub metrics_enabled: bool,

    /// Bind address for the metrics exporter.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "transhub=debug,tower_http=debug".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9100".to_string(),
        }
    }
}
