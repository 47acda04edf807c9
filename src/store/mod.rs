//! Persistence subsystem.
//!
//! # Data Flow
//! ```text
//! handler (async)
//!     → Repository method (clones inputs)
//!     → StoreConnection::execute_async (spawn_blocking)
//!     → rusqlite Connection behind a Mutex
//! ```
//!
//! # Design Decisions
//! - One SQLite connection guarded by a Mutex; requests serialize at the store
//! - Repository exposes one method per operation, no query builder
//! - In-memory constructor backs the unit tests

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::StoreConnection;
pub use repository::Repository;

use thiserror::Error;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store task failed: {0}")]
    Background(String),
}

impl StoreError {
    /// True when the underlying SQLite error is a uniqueness violation.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }
}
