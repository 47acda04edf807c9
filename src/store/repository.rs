//! Repository layer for database operations.
//!
//! Provides a high-level API for all database operations, abstracting away
//! the SQL details and providing type-safe access. One method per operation;
//! handlers never see a `Connection`.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::connection::StoreConnection;
use super::models::{
    ActionKind, ActionLogEntry, Component, I18nKind, POFile, POFileLock, Project, Unit, User,
    UserMessage, VcsKind,
};
use super::StoreError;

/// Field values for creating or updating a project.
#[derive(Debug, Clone)]
pub struct ProjectData {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub long_description: String,
    pub homepage: Option<String>,
}

/// Field values for creating or updating a component.
#[derive(Debug, Clone)]
pub struct ComponentData {
    pub slug: String,
    pub name: String,
    pub description: String,
    pub source_lang: String,
    pub i18n_kind: I18nKind,
    pub file_filter: String,
}

/// Field values for creating or updating a unit.
///
/// `name` is filled in by the caller from the component's full name.
#[derive(Debug, Clone)]
pub struct UnitData {
    pub name: String,
    pub root: String,
    pub kind: VcsKind,
    pub branch: String,
    pub web_url: Option<String>,
}

/// Computed statistics for one translation file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct POFileStats {
    pub total: u32,
    pub translated: u32,
    pub fuzzy: u32,
    pub untranslated: u32,
}

/// Repository for database operations.
#[derive(Clone)]
pub struct Repository {
    db: StoreConnection,
}

impl Repository {
    /// Create a new repository with the given connection.
    pub fn new(db: StoreConnection) -> Self {
        Self { db }
    }

    /// Create a repository with an in-memory database (for testing).
    pub fn new_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(StoreConnection::open_in_memory()?))
    }

    // =========================================================================
    // Users & sessions
    // =========================================================================

    /// Create the user if missing, returning its id either way.
    pub async fn ensure_user(
        &self,
        username: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<i64, StoreError> {
        let username = username.to_string();
        let digest = password_digest(password);

        self.db
            .execute_async(move |conn| {
                if let Some(id) = conn
                    .query_row(
                        "SELECT id FROM users WHERE username = ?1",
                        params![username],
                        |row| row.get(0),
                    )
                    .optional()?
                {
                    return Ok(id);
                }
                conn.execute(
                    "INSERT INTO users (username, password_sha256, is_admin, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![username, digest, is_admin, Utc::now()],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    /// Check credentials; on success return the user.
    pub async fn verify_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        let username = username.to_string();
        let digest = password_digest(password);

        self.db
            .execute_async(move |conn| {
                let user = conn
                    .query_row(
                        "SELECT id, username, is_admin, created_at FROM users
                         WHERE username = ?1 AND password_sha256 = ?2",
                        params![username, digest],
                        user_from_row,
                    )
                    .optional()?;
                Ok(user)
            })
            .await
    }

    /// Issue a new session token for the user.
    pub async fn create_session(&self, user_id: i64) -> Result<String, StoreError> {
        let token = Uuid::new_v4().to_string();
        let stored = token.clone();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
                    params![stored, user_id, Utc::now()],
                )?;
                Ok(())
            })
            .await?;
        Ok(token)
    }

    /// Resolve a session token to its user.
    pub async fn session_user(&self, token: &str) -> Result<Option<User>, StoreError> {
        let token = token.to_string();

        self.db
            .execute_async(move |conn| {
                let user = conn
                    .query_row(
                        "SELECT u.id, u.username, u.is_admin, u.created_at
                         FROM sessions s JOIN users u ON u.id = s.user_id
                         WHERE s.token = ?1",
                        params![token],
                        user_from_row,
                    )
                    .optional()?;
                Ok(user)
            })
            .await
    }

    /// Revoke a session token.
    pub async fn delete_session(&self, token: &str) -> Result<(), StoreError> {
        let token = token.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Queue a notification for the user.
    pub async fn push_message(&self, user_id: i64, body: &str) -> Result<(), StoreError> {
        let body = body.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO messages (user_id, body, created_at) VALUES (?1, ?2, ?3)",
                    params![user_id, body, Utc::now()],
                )?;
                Ok(())
            })
            .await
    }

    /// Return and remove the user's queued messages, oldest first.
    pub async fn drain_messages(&self, user_id: i64) -> Result<Vec<UserMessage>, StoreError> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, body, created_at FROM messages
                     WHERE user_id = ?1 ORDER BY id ASC",
                )?;
                let messages = stmt
                    .query_map(params![user_id], |row| {
                        Ok(UserMessage {
                            id: row.get(0)?,
                            body: row.get(1)?,
                            created_at: row.get(2)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                drop(stmt);
                conn.execute("DELETE FROM messages WHERE user_id = ?1", params![user_id])?;
                Ok(messages)
            })
            .await
    }

    // =========================================================================
    // Action log
    // =========================================================================

    /// Append an audit log row.
    pub async fn log_action(
        &self,
        user_id: Option<i64>,
        action: ActionKind,
        object_kind: &str,
        object_name: &str,
        message: &str,
    ) -> Result<(), StoreError> {
        let object_kind = object_kind.to_string();
        let object_name = object_name.to_string();
        let message = message.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO action_log (user_id, action, object_kind, object_name, message, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        user_id,
                        action.to_string(),
                        object_kind,
                        object_name,
                        message,
                        Utc::now()
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Most recent audit entries, newest first.
    pub async fn recent_actions(&self, limit: usize) -> Result<Vec<ActionLogEntry>, StoreError> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, action, object_kind, object_name, message, created_at
                     FROM action_log ORDER BY id DESC LIMIT ?1",
                )?;
                let entries = stmt
                    .query_map(params![limit as i64], |row| {
                        let action: String = row.get(2)?;
                        Ok(ActionLogEntry {
                            id: row.get(0)?,
                            user_id: row.get(1)?,
                            action: action.parse().unwrap_or(ActionKind::Change),
                            object_kind: row.get(3)?,
                            object_name: row.get(4)?,
                            message: row.get(5)?,
                            created_at: row.get(6)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
    }

    // =========================================================================
    // Projects
    // =========================================================================

    /// Insert a new project.
    pub async fn create_project(&self, data: ProjectData) -> Result<Project, StoreError> {
        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO projects (slug, name, description, long_description, homepage, enabled, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
                    params![
                        data.slug,
                        data.name,
                        data.description,
                        data.long_description,
                        data.homepage,
                        Utc::now()
                    ],
                )?;
                let id = conn.last_insert_rowid();
                get_project_by_id(conn, id)
            })
            .await
    }

    /// Update an existing project.
    pub async fn update_project(&self, id: i64, data: ProjectData) -> Result<Project, StoreError> {
        self.db
            .execute_async(move |conn| {
                let changed = conn.execute(
                    "UPDATE projects SET slug = ?1, name = ?2, description = ?3,
                     long_description = ?4, homepage = ?5 WHERE id = ?6",
                    params![
                        data.slug,
                        data.name,
                        data.description,
                        data.long_description,
                        data.homepage,
                        id
                    ],
                )?;
                if changed == 0 {
                    return Err(StoreError::NotFound("project"));
                }
                get_project_by_id(conn, id)
            })
            .await
    }

    /// Look up a project by slug.
    pub async fn get_project(&self, slug: &str) -> Result<Option<Project>, StoreError> {
        let slug = slug.to_string();

        self.db
            .execute_async(move |conn| {
                let project = conn
                    .query_row(
                        &format!("{} WHERE slug = ?1", PROJECT_SELECT),
                        params![slug],
                        project_from_row,
                    )
                    .optional()?;
                Ok(project)
            })
            .await
    }

    /// All projects, newest first.
    pub async fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        self.db
            .execute_async(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("{} ORDER BY created_at DESC", PROJECT_SELECT))?;
                let projects = stmt
                    .query_map([], project_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(projects)
            })
            .await
    }

    /// Delete a project; components, pofiles and locks cascade.
    pub async fn delete_project(&self, id: i64) -> Result<(), StoreError> {
        self.db
            .execute_async(move |conn| {
                // Units hang off components via SET NULL, so collect them first.
                let unit_ids = component_unit_ids(conn, "project_id = ?1", id)?;
                let changed = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
                if changed == 0 {
                    return Err(StoreError::NotFound("project"));
                }
                delete_units(conn, &unit_ids)?;
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Components & units
    // =========================================================================

    /// Insert a component together with its unit, atomically.
    pub async fn create_component(
        &self,
        project_id: i64,
        component: ComponentData,
        unit: UnitData,
    ) -> Result<Component, StoreError> {
        self.db
            .execute_async(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO units (name, root, kind, branch, web_url)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![unit.name, unit.root, unit.kind.to_string(), unit.branch, unit.web_url],
                )?;
                let unit_id = tx.last_insert_rowid();
                tx.execute(
                    "INSERT INTO components
                     (project_id, slug, name, description, source_lang, i18n_kind, file_filter, unit_id, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        project_id,
                        component.slug,
                        component.name,
                        component.description,
                        component.source_lang,
                        component.i18n_kind.to_string(),
                        component.file_filter,
                        unit_id,
                        Utc::now()
                    ],
                )?;
                let id = tx.last_insert_rowid();
                tx.commit()?;
                get_component_by_id(conn, id)
            })
            .await
    }

    /// Update a component and its unit, atomically.
    pub async fn update_component(
        &self,
        id: i64,
        component: ComponentData,
        unit: UnitData,
    ) -> Result<Component, StoreError> {
        self.db
            .execute_async(move |conn| {
                let tx = conn.transaction()?;
                let unit_id: Option<i64> = tx
                    .query_row(
                        "SELECT unit_id FROM components WHERE id = ?1",
                        params![id],
                        |row| row.get(0),
                    )
                    .optional()?
                    .ok_or(StoreError::NotFound("component"))?;
                tx.execute(
                    "UPDATE components SET slug = ?1, name = ?2, description = ?3,
                     source_lang = ?4, i18n_kind = ?5, file_filter = ?6 WHERE id = ?7",
                    params![
                        component.slug,
                        component.name,
                        component.description,
                        component.source_lang,
                        component.i18n_kind.to_string(),
                        component.file_filter,
                        id
                    ],
                )?;
                match unit_id {
                    Some(unit_id) => {
                        tx.execute(
                            "UPDATE units SET name = ?1, root = ?2, kind = ?3, branch = ?4, web_url = ?5
                             WHERE id = ?6",
                            params![unit.name, unit.root, unit.kind.to_string(), unit.branch, unit.web_url, unit_id],
                        )?;
                    }
                    None => {
                        tx.execute(
                            "INSERT INTO units (name, root, kind, branch, web_url)
                             VALUES (?1, ?2, ?3, ?4, ?5)",
                            params![unit.name, unit.root, unit.kind.to_string(), unit.branch, unit.web_url],
                        )?;
                        let new_unit = tx.last_insert_rowid();
                        tx.execute(
                            "UPDATE components SET unit_id = ?1 WHERE id = ?2",
                            params![new_unit, id],
                        )?;
                    }
                }
                tx.commit()?;
                get_component_by_id(conn, id)
            })
            .await
    }

    /// Look up a component by project id and slug.
    pub async fn get_component(
        &self,
        project_id: i64,
        slug: &str,
    ) -> Result<Option<Component>, StoreError> {
        let slug = slug.to_string();

        self.db
            .execute_async(move |conn| {
                let component = conn
                    .query_row(
                        &format!("{} WHERE project_id = ?1 AND slug = ?2", COMPONENT_SELECT),
                        params![project_id, slug],
                        component_from_row,
                    )
                    .optional()?;
                Ok(component)
            })
            .await
    }

    /// Components of a project, by slug.
    pub async fn list_components(&self, project_id: i64) -> Result<Vec<Component>, StoreError> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE project_id = ?1 ORDER BY slug ASC",
                    COMPONENT_SELECT
                ))?;
                let components = stmt
                    .query_map(params![project_id], component_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(components)
            })
            .await
    }

    /// Unit record for a component, if any.
    pub async fn get_unit(&self, unit_id: i64) -> Result<Option<Unit>, StoreError> {
        self.db
            .execute_async(move |conn| {
                let unit = conn
                    .query_row(
                        "SELECT id, name, root, kind, branch, web_url FROM units WHERE id = ?1",
                        params![unit_id],
                        unit_from_row,
                    )
                    .optional()?;
                Ok(unit)
            })
            .await
    }

    /// Delete a component; its unit, pofiles and locks go with it.
    pub async fn delete_component(&self, id: i64) -> Result<(), StoreError> {
        self.db
            .execute_async(move |conn| {
                let unit_ids = component_unit_ids(conn, "id = ?1", id)?;
                let changed = conn.execute("DELETE FROM components WHERE id = ?1", params![id])?;
                if changed == 0 {
                    return Err(StoreError::NotFound("component"));
                }
                delete_units(conn, &unit_ids)?;
                Ok(())
            })
            .await
    }

    // =========================================================================
    // POFiles
    // =========================================================================

    /// Insert or update the stats row for one translation file.
    pub async fn upsert_pofile(
        &self,
        component_id: i64,
        filename: &str,
        language_code: Option<String>,
        language_name: Option<String>,
        stats: POFileStats,
    ) -> Result<POFile, StoreError> {
        let filename = filename.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO pofiles
                     (component_id, filename, language_code, language_name,
                      total, translated, fuzzy, untranslated, enabled, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)
                     ON CONFLICT (component_id, filename) DO UPDATE SET
                       language_code = excluded.language_code,
                       language_name = excluded.language_name,
                       total = excluded.total,
                       translated = excluded.translated,
                       fuzzy = excluded.fuzzy,
                       untranslated = excluded.untranslated,
                       enabled = 1,
                       updated_at = excluded.updated_at",
                    params![
                        component_id,
                        filename,
                        language_code,
                        language_name,
                        stats.total,
                        stats.translated,
                        stats.fuzzy,
                        stats.untranslated,
                        Utc::now()
                    ],
                )?;
                let pofile = conn.query_row(
                    &format!(
                        "{} WHERE component_id = ?1 AND filename = ?2",
                        POFILE_SELECT
                    ),
                    params![component_id, filename],
                    pofile_from_row,
                )?;
                Ok(pofile)
            })
            .await
    }

    /// Look up one translation file record.
    pub async fn get_pofile(
        &self,
        component_id: i64,
        filename: &str,
    ) -> Result<Option<POFile>, StoreError> {
        let filename = filename.to_string();

        self.db
            .execute_async(move |conn| {
                let pofile = conn
                    .query_row(
                        &format!(
                            "{} WHERE component_id = ?1 AND filename = ?2",
                            POFILE_SELECT
                        ),
                        params![component_id, filename],
                        pofile_from_row,
                    )
                    .optional()?;
                Ok(pofile)
            })
            .await
    }

    /// Stats rows for a component, by filename.
    pub async fn list_pofiles(&self, component_id: i64) -> Result<Vec<POFile>, StoreError> {
        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE component_id = ?1 ORDER BY filename ASC",
                    POFILE_SELECT
                ))?;
                let pofiles = stmt
                    .query_map(params![component_id], pofile_from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(pofiles)
            })
            .await
    }

    /// Remove stats rows whose files no longer exist in the working copy.
    pub async fn prune_pofiles(
        &self,
        component_id: i64,
        keep: Vec<String>,
    ) -> Result<usize, StoreError> {
        self.db
            .execute_async(move |conn| {
                let mut stmt =
                    conn.prepare("SELECT id, filename FROM pofiles WHERE component_id = ?1")?;
                let existing = stmt
                    .query_map(params![component_id], |row| {
                        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                drop(stmt);

                let mut pruned = 0;
                for (id, filename) in existing {
                    if !keep.iter().any(|k| k == &filename) {
                        conn.execute("DELETE FROM pofiles WHERE id = ?1", params![id])?;
                        pruned += 1;
                    }
                }
                Ok(pruned)
            })
            .await
    }

    // =========================================================================
    // Locks
    // =========================================================================

    /// Current lock on a translation file, if any.
    pub async fn get_lock(&self, pofile_id: i64) -> Result<Option<POFileLock>, StoreError> {
        self.db
            .execute_async(move |conn| {
                let lock = conn
                    .query_row(
                        "SELECT l.id, l.pofile_id, l.owner_user_id, u.username, l.created_at
                         FROM pofile_locks l JOIN users u ON u.id = l.owner_user_id
                         WHERE l.pofile_id = ?1",
                        params![pofile_id],
                        lock_from_row,
                    )
                    .optional()?;
                Ok(lock)
            })
            .await
    }

    /// Create a lock owned by the user.
    ///
    /// A concurrent create for the same file loses the race at the UNIQUE
    /// constraint and surfaces as `Conflict`.
    pub async fn create_lock(
        &self,
        pofile_id: i64,
        owner_user_id: i64,
    ) -> Result<POFileLock, StoreError> {
        self.db
            .execute_async(move |conn| {
                let inserted = conn.execute(
                    "INSERT INTO pofile_locks (pofile_id, owner_user_id, created_at)
                     VALUES (?1, ?2, ?3)",
                    params![pofile_id, owner_user_id, Utc::now()],
                );
                match inserted {
                    Ok(_) => {}
                    Err(e) => {
                        let err = StoreError::from(e);
                        if err.is_unique_violation() {
                            return Err(StoreError::Conflict("file is already locked".into()));
                        }
                        return Err(err);
                    }
                }
                let lock = conn.query_row(
                    "SELECT l.id, l.pofile_id, l.owner_user_id, u.username, l.created_at
                     FROM pofile_locks l JOIN users u ON u.id = l.owner_user_id
                     WHERE l.pofile_id = ?1",
                    params![pofile_id],
                    lock_from_row,
                )?;
                Ok(lock)
            })
            .await
    }

    /// Remove a lock.
    pub async fn delete_lock(&self, lock_id: i64) -> Result<(), StoreError> {
        self.db
            .execute_async(move |conn| {
                conn.execute("DELETE FROM pofile_locks WHERE id = ?1", params![lock_id])?;
                Ok(())
            })
            .await
    }

    // =========================================================================
    // Admin counters
    // =========================================================================

    /// Row counts for the admin stats endpoint.
    pub async fn entity_counts(&self) -> Result<EntityCounts, StoreError> {
        self.db
            .execute_async(move |conn| {
                let count = |table: &str| -> Result<usize, rusqlite::Error> {
                    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get::<_, i64>(0).map(|n| n as usize)
                    })
                };
                Ok(EntityCounts {
                    projects: count("projects")?,
                    components: count("components")?,
                    pofiles: count("pofiles")?,
                    locks: count("pofile_locks")?,
                    users: count("users")?,
                })
            })
            .await
    }
}

/// Entity counts exposed via the admin API.
#[derive(Debug, Clone, serde::Serialize)]
pub struct EntityCounts {
    pub projects: usize,
    pub components: usize,
    pub pofiles: usize,
    pub locks: usize,
    pub users: usize,
}

// =============================================================================
// Row mapping
// =============================================================================

const PROJECT_SELECT: &str = "SELECT id, slug, name, description, long_description, homepage, \
                              enabled, created_at FROM projects";

const COMPONENT_SELECT: &str = "SELECT id, project_id, slug, name, description, source_lang, \
                                i18n_kind, file_filter, unit_id, created_at FROM components";

const POFILE_SELECT: &str = "SELECT id, component_id, filename, language_code, language_name, \
                             total, translated, fuzzy, untranslated, enabled, updated_at \
                             FROM pofiles";

fn user_from_row(row: &rusqlite::Row<'_>) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        is_admin: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn project_from_row(row: &rusqlite::Row<'_>) -> Result<Project, rusqlite::Error> {
    Ok(Project {
        id: row.get(0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        long_description: row.get(4)?,
        homepage: row.get(5)?,
        enabled: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn component_from_row(row: &rusqlite::Row<'_>) -> Result<Component, rusqlite::Error> {
    let i18n_kind: String = row.get(6)?;
    Ok(Component {
        id: row.get(0)?,
        project_id: row.get(1)?,
        slug: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        source_lang: row.get(5)?,
        i18n_kind: i18n_kind.parse().unwrap_or(I18nKind::Gettext),
        file_filter: row.get(7)?,
        unit_id: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn unit_from_row(row: &rusqlite::Row<'_>) -> Result<Unit, rusqlite::Error> {
    let kind: String = row.get(3)?;
    Ok(Unit {
        id: row.get(0)?,
        name: row.get(1)?,
        root: row.get(2)?,
        kind: kind.parse().unwrap_or(VcsKind::Git),
        branch: row.get(4)?,
        web_url: row.get(5)?,
    })
}

fn pofile_from_row(row: &rusqlite::Row<'_>) -> Result<POFile, rusqlite::Error> {
    Ok(POFile {
        id: row.get(0)?,
        component_id: row.get(1)?,
        filename: row.get(2)?,
        language_code: row.get(3)?,
        language_name: row.get(4)?,
        total: row.get(5)?,
        translated: row.get(6)?,
        fuzzy: row.get(7)?,
        untranslated: row.get(8)?,
        enabled: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn lock_from_row(row: &rusqlite::Row<'_>) -> Result<POFileLock, rusqlite::Error> {
    Ok(POFileLock {
        id: row.get(0)?,
        pofile_id: row.get(1)?,
        owner_user_id: row.get(2)?,
        owner_username: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn get_project_by_id(conn: &Connection, id: i64) -> Result<Project, StoreError> {
    conn.query_row(
        &format!("{} WHERE id = ?1", PROJECT_SELECT),
        params![id],
        project_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("project"))
}

fn get_component_by_id(conn: &Connection, id: i64) -> Result<Component, StoreError> {
    conn.query_row(
        &format!("{} WHERE id = ?1", COMPONENT_SELECT),
        params![id],
        component_from_row,
    )
    .optional()?
    .ok_or(StoreError::NotFound("component"))
}

fn component_unit_ids(
    conn: &Connection,
    where_clause: &str,
    id: i64,
) -> Result<Vec<i64>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT unit_id FROM components WHERE {} AND unit_id IS NOT NULL",
        where_clause
    ))?;
    let ids = stmt
        .query_map(params![id], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn delete_units(conn: &Connection, unit_ids: &[i64]) -> Result<(), StoreError> {
    for unit_id in unit_ids {
        conn.execute("DELETE FROM units WHERE id = ?1", params![unit_id])?;
    }
    Ok(())
}

fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_repo() -> Repository {
        Repository::new_in_memory().unwrap()
    }

    fn project_data(slug: &str) -> ProjectData {
        ProjectData {
            slug: slug.into(),
            name: format!("Project {}", slug),
            description: "A test project".into(),
            long_description: String::new(),
            homepage: None,
        }
    }

    fn component_data(slug: &str) -> ComponentData {
        ComponentData {
            slug: slug.into(),
            name: format!("Component {}", slug),
            description: String::new(),
            source_lang: "en".into(),
            i18n_kind: I18nKind::Gettext,
            file_filter: r"po/.*\.po$".into(),
        }
    }

    fn unit_data(name: &str) -> UnitData {
        UnitData {
            name: name.into(),
            root: "/srv/checkouts/upstream".into(),
            kind: VcsKind::Git,
            branch: "main".into(),
            web_url: None,
        }
    }

    #[tokio::test]
    async fn test_project_round_trip() {
        let repo = test_repo();
        let created = repo.create_project(project_data("desktop")).await.unwrap();
        assert_eq!(created.slug, "desktop");

        let fetched = repo.get_project("desktop").await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);

        repo.delete_project(created.id).await.unwrap();
        assert!(repo.get_project("desktop").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_project_slug_is_rejected() {
        let repo = test_repo();
        repo.create_project(project_data("desktop")).await.unwrap();
        let err = repo.create_project(project_data("desktop")).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_component_created_with_unit() {
        let repo = test_repo();
        let project = repo.create_project(project_data("desktop")).await.unwrap();
        let component = repo
            .create_component(project.id, component_data("ui"), unit_data("desktop.ui"))
            .await
            .unwrap();

        let unit = repo
            .get_unit(component.unit_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unit.name, "desktop.ui");
        assert_eq!(unit.kind, VcsKind::Git);

        // Deleting the component removes the unit too.
        repo.delete_component(component.id).await.unwrap();
        assert!(repo.get_unit(unit.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_component_slug_unique_per_project_only() {
        let repo = test_repo();
        let p1 = repo.create_project(project_data("alpha")).await.unwrap();
        let p2 = repo.create_project(project_data("beta")).await.unwrap();

        repo.create_component(p1.id, component_data("ui"), unit_data("alpha.ui"))
            .await
            .unwrap();
        // Same slug under another project is fine.
        repo.create_component(p2.id, component_data("ui"), unit_data("beta.ui"))
            .await
            .unwrap();
        // Same slug under the same project is not.
        let err = repo
            .create_component(p1.id, component_data("ui"), unit_data("alpha.ui"))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_pofile_upsert_and_prune() {
        let repo = test_repo();
        let project = repo.create_project(project_data("desktop")).await.unwrap();
        let component = repo
            .create_component(project.id, component_data("ui"), unit_data("desktop.ui"))
            .await
            .unwrap();

        let stats = POFileStats {
            total: 10,
            translated: 6,
            fuzzy: 2,
            untranslated: 2,
        };
        repo.upsert_pofile(
            component.id,
            "po/pt_BR.po",
            Some("pt_BR".into()),
            Some("Portuguese".into()),
            stats.clone(),
        )
        .await
        .unwrap();

        // Second upsert updates in place.
        let updated = repo
            .upsert_pofile(
                component.id,
                "po/pt_BR.po",
                Some("pt_BR".into()),
                Some("Portuguese".into()),
                POFileStats {
                    translated: 8,
                    untranslated: 0,
                    ..stats
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.translated, 8);
        assert_eq!(repo.list_pofiles(component.id).await.unwrap().len(), 1);

        let pruned = repo
            .prune_pofiles(component.id, vec!["po/de.po".into()])
            .await
            .unwrap();
        assert_eq!(pruned, 1);
        assert!(repo.list_pofiles(component.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let repo = test_repo();
        let project = repo.create_project(project_data("desktop")).await.unwrap();
        let component = repo
            .create_component(project.id, component_data("ui"), unit_data("desktop.ui"))
            .await
            .unwrap();
        let pofile = repo
            .upsert_pofile(component.id, "po/de.po", None, None, POFileStats::default())
            .await
            .unwrap();

        let alice = repo.ensure_user("alice", "pw", false).await.unwrap();
        let bob = repo.ensure_user("bob", "pw", false).await.unwrap();

        let lock = repo.create_lock(pofile.id, alice).await.unwrap();
        assert_eq!(lock.owner_username, "alice");

        let err = repo.create_lock(pofile.id, bob).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        repo.delete_lock(lock.id).await.unwrap();
        assert!(repo.get_lock(pofile.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_login_and_session() {
        let repo = test_repo();
        repo.ensure_user("admin", "secret", true).await.unwrap();

        assert!(repo
            .verify_login("admin", "wrong")
            .await
            .unwrap()
            .is_none());
        let user = repo.verify_login("admin", "secret").await.unwrap().unwrap();
        assert!(user.is_admin);

        let token = repo.create_session(user.id).await.unwrap();
        let resolved = repo.session_user(&token).await.unwrap().unwrap();
        assert_eq!(resolved.username, "admin");

        repo.delete_session(&token).await.unwrap();
        assert!(repo.session_user(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_messages_drain_once() {
        let repo = test_repo();
        let user = repo.ensure_user("alice", "pw", false).await.unwrap();
        repo.push_message(user, "Lock removed.").await.unwrap();
        repo.push_message(user, "File submitted.").await.unwrap();

        let messages = repo.drain_messages(user).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body, "Lock removed.");

        assert!(repo.drain_messages(user).await.unwrap().is_empty());
    }
}
