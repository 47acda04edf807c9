//! Request handlers, grouped by resource.

pub mod components;
pub mod feeds;
pub mod files;
pub mod projects;

use crate::http::error::AppError;
use crate::http::server::AppState;
use crate::store::models::{Component, Project};

/// Look up a project by slug or fail with 404.
pub async fn project_or_404(state: &AppState, slug: &str) -> Result<Project, AppError> {
    crate::http::error::get_or_404(state.store.get_project(slug).await?)
}

/// Look up a component by project slug + component slug or fail with 404.
pub async fn component_or_404(
    state: &AppState,
    project_slug: &str,
    component_slug: &str,
) -> Result<(Project, Component), AppError> {
    let project = project_or_404(state, project_slug).await?;
    let component =
        crate::http::error::get_or_404(state.store.get_component(project.id, component_slug).await?)?;
    Ok((project, component))
}
