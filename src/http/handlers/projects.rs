//! Project create/update/delete handlers.

use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};

use crate::actionlog::{log_addition, log_change, log_deletion};
use crate::auth::CurrentUser;
use crate::forms::ProjectForm;
use crate::http::error::AppError;
use crate::http::pages;
use crate::http::server::AppState;

use super::project_or_404;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(project_list))
        .route(
            "/projects/new",
            get(project_create_page).post(project_create),
        )
        .route("/projects/{project_slug}", get(project_detail))
        .route(
            "/projects/{project_slug}/edit",
            get(project_edit_page).post(project_update),
        )
        .route(
            "/projects/{project_slug}/delete",
            get(project_delete_confirm).post(project_delete),
        )
}

async fn project_list(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let projects = state.store.list_projects().await?;
    Ok(Html(pages::project_list(&projects)))
}

async fn project_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Html<String>, AppError> {
    let project = project_or_404(&state, &slug).await?;
    let components = state.store.list_components(project.id).await?;
    Ok(Html(pages::project_detail(&project, &components)))
}

async fn project_create_page(
    State(_state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> Html<String> {
    Html(pages::project_form("/projects/new", "", "", "", "", "", &[]))
}

async fn project_create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<ProjectForm>,
) -> Result<Response, AppError> {
    let data = match form.validate(&state.store, None).await? {
        Ok(data) => data,
        Err(errors) => {
            return Ok(Html(pages::project_form(
                "/projects/new",
                &form.slug,
                &form.name,
                &form.description,
                &form.long_description,
                &form.homepage,
                &errors,
            ))
            .into_response());
        }
    };

    let project = state.store.create_project(data).await?;
    log_addition(&state.store, &user, "project", &project.name).await?;

    Ok(Redirect::to(&format!("/projects/{}", project.slug)).into_response())
}

async fn project_edit_page(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(slug): Path<String>,
) -> Result<Html<String>, AppError> {
    let project = project_or_404(&state, &slug).await?;
    Ok(Html(pages::project_form(
        &format!("/projects/{}/edit", project.slug),
        &project.slug,
        &project.name,
        &project.description,
        &project.long_description,
        project.homepage.as_deref().unwrap_or(""),
        &[],
    )))
}

async fn project_update(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    Form(form): Form<ProjectForm>,
) -> Result<Response, AppError> {
    let project = project_or_404(&state, &slug).await?;

    let data = match form.validate(&state.store, Some(&project.slug)).await? {
        Ok(data) => data,
        Err(errors) => {
            return Ok(Html(pages::project_form(
                &format!("/projects/{}/edit", project.slug),
                &form.slug,
                &form.name,
                &form.description,
                &form.long_description,
                &form.homepage,
                &errors,
            ))
            .into_response());
        }
    };

    let updated = state.store.update_project(project.id, data).await?;
    log_change(
        &state.store,
        &user,
        "project",
        &updated.name,
        "This project has been changed.",
    )
    .await?;

    Ok(Redirect::to(&format!("/projects/{}", updated.slug)).into_response())
}

async fn project_delete_confirm(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(slug): Path<String>,
) -> Result<Html<String>, AppError> {
    let project = project_or_404(&state, &slug).await?;
    Ok(Html(pages::confirm_delete(
        "project",
        &project.name,
        &format!("/projects/{}/delete", project.slug),
    )))
}

async fn project_delete(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let project = project_or_404(&state, &slug).await?;

    state.store.delete_project(project.id).await?;
    log_deletion(&state.store, &user, "project", &project.name).await?;
    state
        .store
        .push_message(user.id, &format!("The {} was deleted.", project.name))
        .await?;

    Ok(Redirect::to("/projects").into_response())
}
