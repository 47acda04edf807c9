//! Database entity models.
//!
//! These structures map directly to database tables and provide
//! type-safe access to persisted data.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level grouping of translatable components.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub long_description: String,
    pub homepage: Option<String>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Version-control kind of a unit checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    Git,
    Svn,
    Hg,
    Tar,
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsKind::Git => write!(f, "git"),
            VcsKind::Svn => write!(f, "svn"),
            VcsKind::Hg => write!(f, "hg"),
            VcsKind::Tar => write!(f, "tar"),
        }
    }
}

impl std::str::FromStr for VcsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "git" => Ok(VcsKind::Git),
            "svn" => Ok(VcsKind::Svn),
            "hg" => Ok(VcsKind::Hg),
            "tar" => Ok(VcsKind::Tar),
            _ => Err(format!("unknown VCS kind: {}", s)),
        }
    }
}

/// Checkout metadata record associated with a component.
///
/// The unit's `name` is always derived from its component's full name
/// before either row is written.
#[derive(Debug, Clone, Serialize)]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub root: String,
    pub kind: VcsKind,
    pub branch: String,
    pub web_url: Option<String>,
}

/// Source layout of a component's translatable files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum I18nKind {
    Gettext,
    Intltool,
}

impl fmt::Display for I18nKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            I18nKind::Gettext => write!(f, "gettext"),
            I18nKind::Intltool => write!(f, "intltool"),
        }
    }
}

impl std::str::FromStr for I18nKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gettext" => Ok(I18nKind::Gettext),
            "intltool" => Ok(I18nKind::Intltool),
            _ => Err(format!("unknown i18n kind: {}", s)),
        }
    }
}

/// A translatable software module within a project.
#[derive(Debug, Clone, Serialize)]
pub struct Component {
    pub id: i64,
    pub project_id: i64,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub source_lang: String,
    pub i18n_kind: I18nKind,
    pub file_filter: String,
    pub unit_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Component {
    /// Fully qualified name, `<project_slug>.<component_slug>`.
    pub fn full_name(&self, project_slug: &str) -> String {
        format!("{}.{}", project_slug, self.slug)
    }
}

/// Per-language translation file statistics for a component.
#[derive(Debug, Clone, Serialize)]
pub struct POFile {
    pub id: i64,
    pub component_id: i64,
    pub filename: String,
    pub language_code: Option<String>,
    pub language_name: Option<String>,
    pub total: u32,
    pub translated: u32,
    pub fuzzy: u32,
    pub untranslated: u32,
    pub enabled: bool,
    pub updated_at: DateTime<Utc>,
}

impl POFile {
    pub fn trans_percent(&self) -> u32 {
        percent(self.translated, self.total)
    }

    pub fn fuzzy_percent(&self) -> u32 {
        percent(self.fuzzy, self.total)
    }

    pub fn untrans_percent(&self) -> u32 {
        percent(self.untranslated, self.total)
    }
}

fn percent(part: u32, total: u32) -> u32 {
    if total == 0 {
        0
    } else {
        (part * 100) / total
    }
}

/// Advisory exclusive-edit marker on a translation file.
///
/// Existence of a row means the file is locked.
#[derive(Debug, Clone, Serialize)]
pub struct POFileLock {
    pub id: i64,
    pub pofile_id: i64,
    pub owner_user_id: i64,
    pub owner_username: String,
    pub created_at: DateTime<Utc>,
}

/// An authenticated account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Kind of an audit log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Addition,
    Change,
    Deletion,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Addition => write!(f, "addition"),
            ActionKind::Change => write!(f, "change"),
            ActionKind::Deletion => write!(f, "deletion"),
        }
    }
}

impl std::str::FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "addition" => Ok(ActionKind::Addition),
            "change" => Ok(ActionKind::Change),
            "deletion" => Ok(ActionKind::Deletion),
            _ => Err(format!("unknown action kind: {}", s)),
        }
    }
}

/// One audit log row.
#[derive(Debug, Clone, Serialize)]
pub struct ActionLogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub action: ActionKind,
    pub object_kind: String,
    pub object_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A queued user notification.
#[derive(Debug, Clone, Serialize)]
pub struct UserMessage {
    pub id: i64,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages() {
        let pofile = POFile {
            id: 1,
            component_id: 1,
            filename: "po/pt_BR.po".into(),
            language_code: Some("pt_BR".into()),
            language_name: Some("Portuguese".into()),
            total: 200,
            translated: 150,
            fuzzy: 30,
            untranslated: 20,
            enabled: true,
            updated_at: Utc::now(),
        };
        assert_eq!(pofile.trans_percent(), 75);
        assert_eq!(pofile.fuzzy_percent(), 15);
        assert_eq!(pofile.untrans_percent(), 10);
    }

    #[test]
    fn test_percent_of_empty_file_is_zero() {
        let pofile = POFile {
            id: 1,
            component_id: 1,
            filename: "po/empty.po".into(),
            language_code: None,
            language_name: None,
            total: 0,
            translated: 0,
            fuzzy: 0,
            untranslated: 0,
            enabled: true,
            updated_at: Utc::now(),
        };
        assert_eq!(pofile.trans_percent(), 0);
    }

    #[test]
    fn test_full_name() {
        let component = Component {
            id: 1,
            project_id: 1,
            slug: "ui".into(),
            name: "User Interface".into(),
            description: String::new(),
            source_lang: "en".into(),
            i18n_kind: I18nKind::Gettext,
            file_filter: r".*\.po$".into(),
            unit_id: None,
            created_at: Utc::now(),
        };
        assert_eq!(component.full_name("desktop"), "desktop.ui");
    }

    #[test]
    fn test_kind_round_trips() {
        for kind in ["git", "svn", "hg", "tar"] {
            let parsed: VcsKind = kind.parse().unwrap();
            assert_eq!(parsed.to_string(), kind);
        }
        assert!("cvs".parse::<VcsKind>().is_err());
    }
}
