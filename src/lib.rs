//! Translation project management hub library.

pub mod actionlog;
pub mod admin;
pub mod auth;
pub mod config;
pub mod forms;
pub mod highlight;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod store;
pub mod trans;

pub use config::HubConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
