//! Component create/update/detail/delete handlers, plus statistics
//! recomputation and cache clearing.

use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};

use crate::actionlog::{log_addition, log_change, log_deletion};
use crate::auth::CurrentUser;
use crate::forms::ComponentUnitForm;
use crate::http::error::AppError;
use crate::http::pages;
use crate::http::server::AppState;
use crate::store::models::{Component, POFile, POFileLock, Project, Unit, User};
use crate::trans::TransError;

use super::{component_or_404, project_or_404};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_slug}/components/new",
            get(component_create_page).post(component_create),
        )
        .route(
            "/projects/{project_slug}/components/{component_slug}",
            get(component_detail),
        )
        .route(
            "/projects/{project_slug}/components/{component_slug}/edit",
            get(component_edit_page).post(component_update),
        )
        .route(
            "/projects/{project_slug}/components/{component_slug}/delete",
            get(component_delete_confirm).post(component_delete),
        )
        .route(
            "/projects/{project_slug}/components/{component_slug}/set-stats",
            post(component_set_stats),
        )
        .route(
            "/projects/{project_slug}/components/{component_slug}/clear-cache",
            post(component_clear_cache),
        )
}

fn detail_url(project_slug: &str, component_slug: &str) -> String {
    format!("/projects/{}/components/{}", project_slug, component_slug)
}

async fn component_unit(state: &AppState, component: &Component) -> Result<Option<Unit>, AppError> {
    match component.unit_id {
        Some(unit_id) => Ok(state.store.get_unit(unit_id).await?),
        None => Ok(None),
    }
}

async fn component_detail(
    State(state): State<AppState>,
    Path((project_slug, component_slug)): Path<(String, String)>,
) -> Result<Html<String>, AppError> {
    let (project, component) = component_or_404(&state, &project_slug, &component_slug).await?;
    let unit = component_unit(&state, &component).await?;

    let pofiles = state.store.list_pofiles(component.id).await?;
    let mut with_locks: Vec<(POFile, Option<POFileLock>)> = Vec::with_capacity(pofiles.len());
    for pofile in pofiles {
        let lock = state.store.get_lock(pofile.id).await?;
        with_locks.push((pofile, lock));
    }

    Ok(Html(pages::component_detail(
        &project,
        &component,
        unit.as_ref(),
        &with_locks,
    )))
}

async fn component_create_page(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(project_slug): Path<String>,
) -> Result<Html<String>, AppError> {
    let project = project_or_404(&state, &project_slug).await?;
    Ok(Html(render_form(
        &project,
        None,
        &ComponentUnitForm::default(),
        &[],
    )))
}

async fn component_create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(project_slug): Path<String>,
    Form(form): Form<ComponentUnitForm>,
) -> Result<Response, AppError> {
    let project = project_or_404(&state, &project_slug).await?;
    save_component(&state, &user, &project, None, form).await
}

async fn component_edit_page(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path((project_slug, component_slug)): Path<(String, String)>,
) -> Result<Html<String>, AppError> {
    let (project, component) = component_or_404(&state, &project_slug, &component_slug).await?;
    let unit = component_unit(&state, &component).await?;

    let form = ComponentUnitForm {
        slug: component.slug.clone(),
        name: component.name.clone(),
        description: component.description.clone(),
        source_lang: component.source_lang.clone(),
        i18n_kind: component.i18n_kind.to_string(),
        file_filter: component.file_filter.clone(),
        root: unit.as_ref().map(|u| u.root.clone()).unwrap_or_default(),
        kind: unit
            .as_ref()
            .map(|u| u.kind.to_string())
            .unwrap_or_default(),
        branch: unit.as_ref().map(|u| u.branch.clone()).unwrap_or_default(),
        web_url: unit
            .as_ref()
            .and_then(|u| u.web_url.clone())
            .unwrap_or_default(),
    };
    Ok(Html(render_form(&project, Some(&component), &form, &[])))
}

async fn component_update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_slug, component_slug)): Path<(String, String)>,
    Form(form): Form<ComponentUnitForm>,
) -> Result<Response, AppError> {
    let (project, component) = component_or_404(&state, &project_slug, &component_slug).await?;
    save_component(&state, &user, &project, Some(&component), form).await
}

/// Shared save path for create and update.
///
/// The component form and the unit form validate together; nothing is
/// persisted unless both pass, and the unit's name is derived from the
/// component's full name first.
async fn save_component(
    state: &AppState,
    user: &User,
    project: &Project,
    existing: Option<&Component>,
    form: ComponentUnitForm,
) -> Result<Response, AppError> {
    let current_slug = existing.map(|c| c.slug.as_str());
    let component_result = form
        .component()
        .validate(&state.store, project.id, current_slug)
        .await?;
    let unit_result = form.unit().validate();

    let (component_data, mut unit_data) = match (component_result, unit_result) {
        (Ok(component), Ok(unit)) => (component, unit),
        (component, unit) => {
            let mut errors = Vec::new();
            if let Err(component_errors) = component {
                errors.extend(component_errors);
            }
            if let Err(unit_errors) = unit {
                errors.extend(unit_errors);
            }
            return Ok(Html(render_form(project, existing, &form, &errors)).into_response());
        }
    };

    // The unit is named after the component's full name before either
    // record is written.
    unit_data.name = format!("{}.{}", project.slug, component_data.slug);

    let (component, created) = match existing {
        Some(existing) => (
            state
                .store
                .update_component(existing.id, component_data, unit_data)
                .await?,
            false,
        ),
        None => (
            state
                .store
                .create_component(project.id, component_data, unit_data)
                .await?,
            true,
        ),
    };

    let full_name = component.full_name(&project.slug);
    if created {
        log_addition(&state.store, user, "component", &full_name).await?;
    } else {
        log_change(
            &state.store,
            user,
            "component",
            &full_name,
            "This component has been changed.",
        )
        .await?;
    }

    Ok(Redirect::to(&detail_url(&project.slug, &component.slug)).into_response())
}

fn render_form(
    project: &Project,
    existing: Option<&Component>,
    form: &ComponentUnitForm,
    errors: &[crate::forms::FormError],
) -> String {
    let action = match existing {
        Some(component) => format!(
            "/projects/{}/components/{}/edit",
            project.slug, component.slug
        ),
        None => format!("/projects/{}/components/new", project.slug),
    };
    pages::component_form(
        &action,
        project,
        &form.slug,
        &form.name,
        &form.description,
        &form.source_lang,
        &form.i18n_kind,
        &form.file_filter,
        &form.root,
        &form.kind,
        &form.branch,
        &form.web_url,
        errors,
    )
}

async fn component_delete_confirm(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path((project_slug, component_slug)): Path<(String, String)>,
) -> Result<Html<String>, AppError> {
    let (project, component) = component_or_404(&state, &project_slug, &component_slug).await?;
    Ok(Html(pages::confirm_delete(
        "component",
        &component.full_name(&project.slug),
        &format!(
            "/projects/{}/components/{}/delete",
            project.slug, component.slug
        ),
    )))
}

async fn component_delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_slug, component_slug)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let (project, component) = component_or_404(&state, &project_slug, &component_slug).await?;
    let full_name = component.full_name(&project.slug);

    state.store.delete_component(component.id).await?;
    state
        .store
        .push_message(user.id, &format!("The {} was deleted.", full_name))
        .await?;
    log_deletion(&state.store, &user, "component", &full_name).await?;

    Ok(Redirect::to(&format!("/projects/{}", project.slug)).into_response())
}

async fn component_set_stats(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_slug, component_slug)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let (project, component) = component_or_404(&state, &project_slug, &component_slug).await?;
    let unit = component_unit(&state, &component).await?;
    let full_name = component.full_name(&project.slug);

    tracing::debug!(component = %full_name, "Requested stats calc");

    // Checkout
    state
        .trans
        .prepare_repo(&project.slug, &component, unit.as_ref())
        .await?;

    // Calculate statistics
    match state.trans.set_stats(&project.slug, &component).await {
        Ok(()) => {}
        Err(TransError::FileFilter(file)) => {
            tracing::debug!(
                component = %full_name,
                file = %file,
                "File filter does not allow POTFILES.in file name"
            );
            state
                .store
                .push_message(
                    user.id,
                    "The file filter of this intltool POT-based component does not \
                     seem to allow the POTFILES.in file. Please fix it.",
                )
                .await?;
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(&detail_url(&project_slug, &component_slug)).into_response())
}

async fn component_clear_cache(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path((project_slug, component_slug)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let (_project, component) = component_or_404(&state, &project_slug, &component_slug).await?;
    state.trans.clear_cache(component.id);
    Ok(Redirect::to(&detail_url(&project_slug, &component_slug)).into_response())
}
