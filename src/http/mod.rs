//! HTTP subsystem.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID, metrics)
//! - Bind server to listener and serve until shutdown

pub mod error;
pub mod handlers;
pub mod pages;
pub mod server;

pub use server::{AppState, HttpServer};
