//! Database connection management.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::Connection;

use super::schema;
use super::StoreError;

/// Database connection wrapper with thread-safe access.
///
/// SQLite is synchronous; async callers go through [`execute_async`]
/// which moves the work onto the blocking thread pool.
///
/// [`execute_async`]: StoreConnection::execute_async
#[derive(Clone)]
pub struct StoreConnection {
    db_path: PathBuf,
    connection: Arc<Mutex<Connection>>,
}

impl StoreConnection {
    /// Open (creating if needed) the database at the given path and run
    /// schema initialization.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        tracing::info!(path = %db_path.display(), "Opening database");

        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        tracing::debug!("Creating in-memory database");

        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::initialize_schema(&conn)?;

        Ok(Self {
            db_path: PathBuf::from(":memory:"),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run a closure against the connection on the blocking pool.
    pub async fn execute_async<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let connection = self.connection.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = connection.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Background(e.to_string()))?
    }

    /// Run a closure against the connection synchronously.
    ///
    /// Only for startup and tests; handlers use `execute_async`.
    pub fn execute_sync<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        let mut guard = self.connection.lock();
        f(&mut guard)
    }
}
