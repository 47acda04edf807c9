//! Database schema definitions and migrations.

use rusqlite::Connection;

use super::StoreError;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        tracing::info!("Initializing database schema v{}", SCHEMA_VERSION);
        create_all_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        tracing::info!(
            "Migrating database schema from v{} to v{}",
            current_version,
            SCHEMA_VERSION
        );
        migrate_schema(conn, current_version)?;
    } else {
        tracing::debug!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get the current schema version from the database.
fn get_schema_version(conn: &Connection) -> Result<i32, StoreError> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(0);
    }

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

fn migrate_schema(conn: &Connection, from_version: i32) -> Result<(), StoreError> {
    // No migrations yet; v1 is the first published schema.
    let _ = (conn, from_version);
    Ok(())
}

fn create_all_tables(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            username        TEXT NOT NULL UNIQUE,
            password_sha256 TEXT NOT NULL,
            is_admin        INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL
        );

        CREATE TABLE sessions (
            token      TEXT PRIMARY KEY,
            user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL
        );

        CREATE TABLE projects (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            slug             TEXT NOT NULL UNIQUE,
            name             TEXT NOT NULL,
            description      TEXT NOT NULL DEFAULT '',
            long_description TEXT NOT NULL DEFAULT '',
            homepage         TEXT,
            enabled          INTEGER NOT NULL DEFAULT 1,
            created_at       TEXT NOT NULL
        );

        CREATE TABLE units (
            id      INTEGER PRIMARY KEY AUTOINCREMENT,
            name    TEXT NOT NULL,
            root    TEXT NOT NULL,
            kind    TEXT NOT NULL,
            branch  TEXT NOT NULL DEFAULT '',
            web_url TEXT
        );

        CREATE TABLE components (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id  INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            slug        TEXT NOT NULL,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            source_lang TEXT NOT NULL DEFAULT 'en',
            i18n_kind   TEXT NOT NULL DEFAULT 'gettext',
            file_filter TEXT NOT NULL DEFAULT '.*\.po$',
            unit_id     INTEGER REFERENCES units(id) ON DELETE SET NULL,
            created_at  TEXT NOT NULL,
            UNIQUE (project_id, slug)
        );

        CREATE TABLE pofiles (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            component_id  INTEGER NOT NULL REFERENCES components(id) ON DELETE CASCADE,
            filename      TEXT NOT NULL,
            language_code TEXT,
            language_name TEXT,
            total         INTEGER NOT NULL DEFAULT 0,
            translated    INTEGER NOT NULL DEFAULT 0,
            fuzzy         INTEGER NOT NULL DEFAULT 0,
            untranslated  INTEGER NOT NULL DEFAULT 0,
            enabled       INTEGER NOT NULL DEFAULT 1,
            updated_at    TEXT NOT NULL,
            UNIQUE (component_id, filename)
        );

        CREATE TABLE pofile_locks (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            pofile_id     INTEGER NOT NULL UNIQUE REFERENCES pofiles(id) ON DELETE CASCADE,
            owner_user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at    TEXT NOT NULL
        );

        CREATE TABLE action_log (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER REFERENCES users(id) ON DELETE SET NULL,
            action      TEXT NOT NULL,
            object_kind TEXT NOT NULL,
            object_name TEXT NOT NULL,
            message     TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL
        );

        CREATE TABLE messages (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            body       TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX idx_components_project ON components(project_id);
        CREATE INDEX idx_pofiles_component ON pofiles(component_id);
        CREATE INDEX idx_messages_user ON messages(user_id);
        CREATE INDEX idx_action_log_created ON action_log(created_at);
        "#,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_database_gets_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_initialize_twice_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        initialize_schema(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
