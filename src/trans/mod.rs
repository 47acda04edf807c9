//! Translation backend subsystem.
//!
//! # Data Flow
//! ```text
//! handler
//!     → TranslationBackend (checkout, stats, file content, submit)
//!         → repo.rs (working copy on disk)
//!         → gettext.rs (PO parsing / merging)
//!         → Repository (POFile stats rows)
//! ```
//!
//! # Design Decisions
//! - Filesystem work runs on the blocking pool; row updates go through the
//!   repository like everything else
//! - Merged renditions are cached in-process per (component, filename) and
//!   dropped by clear_cache or on submit

pub mod gettext;
pub mod language;
pub mod repo;

use std::path::{Path, PathBuf};

use dashmap::DashMap;
use regex::Regex;
use thiserror::Error;

use crate::store::models::{Component, Unit};
use crate::store::repository::POFileStats;
use crate::store::{Repository, StoreError};

/// Error type for translation backend operations.
#[derive(Debug, Error)]
pub enum TransError {
    /// The component's file filter rejects a file the i18n method requires.
    #[error("file filter does not allow {0}")]
    FileFilter(String),

    #[error("invalid file filter: {0}")]
    BadFilter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkout failed: {0}")]
    Checkout(String),

    #[error("invalid path: {0}")]
    BadPath(String),

    #[error("parse error in {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: gettext::PoParseError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("background task failed: {0}")]
    Background(String),
}

impl TransError {
    /// True when the failure means the requested file does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            TransError::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            TransError::BadPath(_) => true,
            _ => false,
        }
    }
}

/// Scanned stats for one translation file in a working copy.
#[derive(Debug, Clone)]
struct ScannedFile {
    filename: String,
    stats: POFileStats,
}

/// Filesystem-backed translation backend.
///
/// Plays the role the data model calls `component.trans`: checkout,
/// statistics, file content and submission for one component at a time.
#[derive(Clone)]
pub struct TranslationBackend {
    repo_root: PathBuf,
    store: Repository,
    merged_cache: std::sync::Arc<DashMap<(i64, String), String>>,
}

impl TranslationBackend {
    pub fn new<P: AsRef<Path>>(repo_root: P, store: Repository) -> Self {
        Self {
            repo_root: repo_root.as_ref().to_path_buf(),
            store,
            merged_cache: std::sync::Arc::new(DashMap::new()),
        }
    }

    /// Working copy directory for a component.
    pub fn work_dir(&self, project_slug: &str, component_slug: &str) -> PathBuf {
        self.repo_root.join(project_slug).join(component_slug)
    }

    /// Ensure the component's working copy exists and is current.
    ///
    /// When the unit points at a readable local directory the working copy
    /// is refreshed from it; otherwise the directory is just created.
    pub async fn prepare_repo(
        &self,
        project_slug: &str,
        component: &Component,
        unit: Option<&Unit>,
    ) -> Result<(), TransError> {
        let work_dir = self.work_dir(project_slug, &component.slug);
        let upstream = unit
            .map(|u| u.root.trim().to_string())
            .filter(|root| !root.is_empty())
            .map(PathBuf::from);
        let full_name = component.full_name(project_slug);

        tokio::task::spawn_blocking(move || -> Result<(), TransError> {
            match upstream {
                Some(upstream) if upstream.is_dir() => {
                    let copied = repo::refresh_working_copy(&work_dir, &upstream)?;
                    tracing::debug!(
                        component = %full_name,
                        copied,
                        "Refreshed working copy"
                    );
                }
                _ => {
                    std::fs::create_dir_all(&work_dir)?;
                }
            }
            Ok(())
        })
        .await
        .map_err(|e| TransError::Background(e.to_string()))?
    }

    /// Recompute statistics for every translation file of the component.
    pub async fn set_stats(
        &self,
        project_slug: &str,
        component: &Component,
    ) -> Result<(), TransError> {
        self.set_stats_filtered(project_slug, component, None).await
    }

    /// Recompute statistics only for files of one language.
    pub async fn set_stats_for_lang(
        &self,
        project_slug: &str,
        component: &Component,
        code: &str,
    ) -> Result<(), TransError> {
        self.set_stats_filtered(project_slug, component, Some(code.to_string()))
            .await
    }

    async fn set_stats_filtered(
        &self,
        project_slug: &str,
        component: &Component,
        lang: Option<String>,
    ) -> Result<(), TransError> {
        let work_dir = self.work_dir(project_slug, &component.slug);
        let filter = component.file_filter.clone();
        let intltool = component.i18n_kind == crate::store::models::I18nKind::Intltool;
        let lang_filter = lang.clone();

        let scanned = tokio::task::spawn_blocking(move || -> Result<Vec<ScannedFile>, TransError> {
            let filter = Regex::new(&filter).map_err(|e| TransError::BadFilter(e.to_string()))?;
            let files = repo::list_files(&work_dir)?;

            if intltool {
                check_intltool_filter(&filter, &files)?;
            }

            let mut scanned = Vec::new();
            for filename in files {
                if !filter.is_match(&filename) || !filename.ends_with(".po") {
                    continue;
                }
                if let Some(code) = &lang_filter {
                    if language::guess_language(&filename).as_deref() != Some(code.as_str()) {
                        continue;
                    }
                }
                let content = std::fs::read_to_string(work_dir.join(&filename))?;
                match gettext::parse(&content) {
                    Ok(doc) => {
                        let po = doc.stats();
                        scanned.push(ScannedFile {
                            filename,
                            stats: POFileStats {
                                total: po.total,
                                translated: po.translated,
                                fuzzy: po.fuzzy,
                                untranslated: po.untranslated,
                            },
                        });
                    }
                    Err(e) => {
                        tracing::warn!(file = %filename, error = %e, "Skipping unparsable PO file");
                    }
                }
            }
            Ok(scanned)
        })
        .await
        .map_err(|e| TransError::Background(e.to_string()))??;

        let mut kept = Vec::with_capacity(scanned.len());
        for file in &scanned {
            let code = language::guess_language(&file.filename);
            let name = code.as_deref().and_then(language::language_name);
            self.store
                .upsert_pofile(
                    component.id,
                    &file.filename,
                    code,
                    name,
                    file.stats.clone(),
                )
                .await?;
            kept.push(file.filename.clone());
        }

        // A language-scoped pass must not prune the other languages' rows.
        if lang.is_none() {
            self.store.prune_pofiles(component.id, kept).await?;
        }

        tracing::debug!(
            component = %component.full_name(project_slug),
            files = scanned.len(),
            "Statistics recomputed"
        );
        Ok(())
    }

    /// Fetch file content from the working copy.
    ///
    /// With `merged` the translation is merged against the component's POT
    /// template (when one exists) and the rendition is cached.
    pub async fn get_file_content(
        &self,
        project_slug: &str,
        component: &Component,
        filename: &str,
        merged: bool,
    ) -> Result<String, TransError> {
        if merged {
            if let Some(hit) = self.merged_cache.get(&(component.id, filename.to_string())) {
                return Ok(hit.clone());
            }
        }

        let work_dir = self.work_dir(project_slug, &component.slug);
        let path = repo::resolve_safe(&work_dir, filename)?;
        let file_label = filename.to_string();

        let content = tokio::task::spawn_blocking(move || -> Result<String, TransError> {
            let raw = std::fs::read_to_string(&path)?;
            if !merged {
                return Ok(raw);
            }
            let template = match find_template(&work_dir)? {
                Some(t) => t,
                None => return Ok(raw),
            };
            let doc = match gettext::parse(&raw) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(file = %file_label, error = %e, "Serving raw content, file does not parse");
                    return Ok(raw);
                }
            };
            let template_raw = std::fs::read_to_string(&template)?;
            let template_doc = match gettext::parse(&template_raw) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(template = %template.display(), error = %e, "Template does not parse");
                    return Ok(raw);
                }
            };
            Ok(gettext::to_string(&gettext::merge(&doc, &template_doc)))
        })
        .await
        .map_err(|e| TransError::Background(e.to_string()))??;

        if merged {
            self.merged_cache
                .insert((component.id, filename.to_string()), content.clone());
        }
        Ok(content)
    }

    /// Drop every cached merged rendition for the component.
    pub fn clear_cache(&self, component_id: i64) {
        self.merged_cache.retain(|(id, _), _| *id != component_id);
    }

    /// Accept an uploaded translation file into the working copy.
    ///
    /// The payload must parse as PO before anything is written.
    pub async fn submit(
        &self,
        project_slug: &str,
        component: &Component,
        filename: &str,
        payload: Vec<u8>,
        message: &str,
        username: &str,
    ) -> Result<(), TransError> {
        let text = String::from_utf8(payload).map_err(|_| TransError::Parse {
            file: filename.to_string(),
            source: gettext::PoParseError {
                line: 0,
                message: "not valid UTF-8".into(),
            },
        })?;
        gettext::parse(&text).map_err(|e| TransError::Parse {
            file: filename.to_string(),
            source: e,
        })?;

        let work_dir = self.work_dir(project_slug, &component.slug);
        let path = repo::resolve_safe(&work_dir, filename)?;

        tokio::task::spawn_blocking(move || -> Result<(), TransError> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, text.as_bytes())?;
            Ok(())
        })
        .await
        .map_err(|e| TransError::Background(e.to_string()))??;

        self.merged_cache
            .remove(&(component.id, filename.to_string()));

        tracing::info!(
            component = %component.full_name(project_slug),
            file = %filename,
            user = %username,
            message = %message,
            "Translation file submitted"
        );
        Ok(())
    }

    /// Guess the language of a translation file from its name.
    pub fn guess_language(&self, filename: &str) -> Option<String> {
        language::guess_language(filename)
    }
}

/// Intltool statistics read POTFILES.in; a filter that rejects it would
/// silently produce wrong numbers, so it is refused up front.
fn check_intltool_filter(filter: &Regex, files: &[String]) -> Result<(), TransError> {
    for file in files {
        let is_potfiles = file == "POTFILES.in" || file.ends_with("/POTFILES.in");
        if is_potfiles && !filter.is_match(file) {
            return Err(TransError::FileFilter(file.clone()));
        }
    }
    Ok(())
}

/// First POT template in the working copy, if any.
fn find_template(work_dir: &Path) -> Result<Option<PathBuf>, TransError> {
    let files = repo::list_files(work_dir)?;
    Ok(files
        .iter()
        .find(|f| f.ends_with(".pot"))
        .map(|f| work_dir.join(f)))
}
