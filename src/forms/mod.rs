//! Form payloads and validation for project and component editing.
//!
//! # Responsibilities
//! - Deserialize urlencoded submissions
//! - Collect every field error, not just the first
//! - Check slug uniqueness against the store
//!
//! # Design Decisions
//! - Validation never persists; handlers only save once both forms pass
//! - Slugs are `[a-z0-9-]+`, matching what the URL routes accept

use serde::Deserialize;

use crate::store::models::{I18nKind, VcsKind};
use crate::store::repository::{ComponentData, ProjectData, UnitData};
use crate::store::{Repository, StoreError};

/// One field validation failure.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FormError {
    pub field: String,
    pub message: String,
}

impl FormError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Project create/update payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectForm {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub long_description: String,
    #[serde(default)]
    pub homepage: String,
}

impl ProjectForm {
    /// Validate the payload; `current_slug` is set when updating so the
    /// project may keep its own slug.
    pub async fn validate(
        &self,
        store: &Repository,
        current_slug: Option<&str>,
    ) -> Result<Result<ProjectData, Vec<FormError>>, StoreError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FormError::new("name", "this field is required"));
        }
        if !valid_slug(&self.slug) {
            errors.push(FormError::new(
                "slug",
                "use lowercase letters, digits and dashes",
            ));
        } else if Some(self.slug.as_str()) != current_slug
            && store.get_project(&self.slug).await?.is_some()
        {
            errors.push(FormError::new("slug", "a project with this slug exists"));
        }
        if !self.homepage.trim().is_empty() && url::Url::parse(self.homepage.trim()).is_err() {
            errors.push(FormError::new("homepage", "not a valid URL"));
        }

        if !errors.is_empty() {
            return Ok(Err(errors));
        }
        Ok(Ok(ProjectData {
            slug: self.slug.clone(),
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            long_description: self.long_description.trim().to_string(),
            homepage: {
                let homepage = self.homepage.trim();
                if homepage.is_empty() {
                    None
                } else {
                    Some(homepage.to_string())
                }
            },
        }))
    }
}

/// Component create/update payload; validated together with [`UnitForm`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentForm {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_lang: String,
    #[serde(default)]
    pub i18n_kind: String,
    #[serde(default)]
    pub file_filter: String,
}

impl ComponentForm {
    pub async fn validate(
        &self,
        store: &Repository,
        project_id: i64,
        current_slug: Option<&str>,
    ) -> Result<Result<ComponentData, Vec<FormError>>, StoreError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(FormError::new("name", "this field is required"));
        }
        if !valid_slug(&self.slug) {
            errors.push(FormError::new(
                "slug",
                "use lowercase letters, digits and dashes",
            ));
        } else if Some(self.slug.as_str()) != current_slug
            && store.get_component(project_id, &self.slug).await?.is_some()
        {
            errors.push(FormError::new(
                "slug",
                "a component with this slug exists in this project",
            ));
        }

        let i18n_kind = match self.i18n_kind.parse::<I18nKind>() {
            Ok(kind) => kind,
            Err(_) => {
                errors.push(FormError::new("i18n_kind", "choose gettext or intltool"));
                I18nKind::Gettext
            }
        };

        let file_filter = if self.file_filter.trim().is_empty() {
            r".*\.po$".to_string()
        } else {
            self.file_filter.trim().to_string()
        };
        if regex::Regex::new(&file_filter).is_err() {
            errors.push(FormError::new("file_filter", "not a valid regex"));
        }

        let source_lang = if self.source_lang.trim().is_empty() {
            "en".to_string()
        } else {
            self.source_lang.trim().to_string()
        };

        if !errors.is_empty() {
            return Ok(Err(errors));
        }
        Ok(Ok(ComponentData {
            slug: self.slug.clone(),
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            source_lang,
            i18n_kind,
            file_filter,
        }))
    }
}

/// Unit (checkout) payload.
///
/// `name` is not part of the form; it is derived from the component's
/// full name after both forms validate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitForm {
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub web_url: String,
}

impl UnitForm {
    pub fn validate(&self) -> Result<UnitData, Vec<FormError>> {
        let mut errors = Vec::new();

        if self.root.trim().is_empty() {
            errors.push(FormError::new("root", "this field is required"));
        }
        let kind = match self.kind.parse::<VcsKind>() {
            Ok(kind) => kind,
            Err(_) => {
                errors.push(FormError::new("kind", "choose git, svn, hg or tar"));
                VcsKind::Git
            }
        };
        if !self.web_url.trim().is_empty() && url::Url::parse(self.web_url.trim()).is_err() {
            errors.push(FormError::new("web_url", "not a valid URL"));
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(UnitData {
            // Filled in by the handler once the component's full name is known.
            name: String::new(),
            root: self.root.trim().to_string(),
            kind,
            branch: self.branch.trim().to_string(),
            web_url: {
                let web_url = self.web_url.trim();
                if web_url.is_empty() {
                    None
                } else {
                    Some(web_url.to_string())
                }
            },
        })
    }
}

/// Combined component + unit payload as posted by the component form page.
///
/// Kept flat because urlencoded deserialization does not nest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentUnitForm {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source_lang: String,
    #[serde(default)]
    pub i18n_kind: String,
    #[serde(default)]
    pub file_filter: String,
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub web_url: String,
}

impl ComponentUnitForm {
    pub fn component(&self) -> ComponentForm {
        ComponentForm {
            slug: self.slug.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            source_lang: self.source_lang.clone(),
            i18n_kind: self.i18n_kind.clone(),
            file_filter: self.file_filter.clone(),
        }
    }

    pub fn unit(&self) -> UnitForm {
        UnitForm {
            root: self.root.clone(),
            kind: self.kind.clone(),
            branch: self.branch.clone(),
            web_url: self.web_url.clone(),
        }
    }
}
