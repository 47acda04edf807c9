//! Translation file handlers: raw download, highlighted view, upload
//! submission and lock toggling.

use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;

use crate::actionlog::log_change;
use crate::auth::CurrentUser;
use crate::highlight;
use crate::http::error::{get_or_404, AppError};
use crate::http::pages;
use crate::http::server::AppState;
use crate::store::StoreError;
use crate::trans::TransError;

pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_slug}/components/{component_slug}/raw/{*filename}",
            get(file_raw),
        )
        .route(
            "/projects/{project_slug}/components/{component_slug}/view/{*filename}",
            get(file_view),
        )
        .route(
            "/projects/{project_slug}/components/{component_slug}/submit/{*filename}",
            post(file_submit).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/projects/{project_slug}/components/{component_slug}/lock/{*filename}",
            post(toggle_lock),
        )
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    merged: Option<bool>,
}

fn detail_url(project_slug: &str, component_slug: &str) -> String {
    format!("/projects/{}/components/{}", project_slug, component_slug)
}

/// Download name: `<full_name>.<basename>`.
fn download_name(full_name: &str, filename: &str) -> String {
    let basename = filename.rsplit('/').next().unwrap_or(filename);
    format!("{}.{}", full_name, basename)
}

async fn file_raw(
    State(state): State<AppState>,
    Path((project_slug, component_slug, filename)): Path<(String, String, String)>,
    Query(query): Query<FileQuery>,
) -> Result<Response, AppError> {
    let (project, component) =
        super::component_or_404(&state, &project_slug, &component_slug).await?;
    let merged = query.merged.unwrap_or(true);

    let content = state
        .trans
        .get_file_content(&project.slug, &component, &filename, merged)
        .await?;

    tracing::debug!(file = %filename, "Requested raw file");

    let fname = download_name(&component.full_name(&project.slug), &filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=UTF-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", fname),
            ),
        ],
        content,
    )
        .into_response())
}

async fn file_view(
    State(state): State<AppState>,
    Path((project_slug, component_slug, filename)): Path<(String, String, String)>,
    Query(query): Query<FileQuery>,
) -> Result<Response, AppError> {
    let (project, component) =
        super::component_or_404(&state, &project_slug, &component_slug).await?;
    let merged = query.merged.unwrap_or(true);

    let content = state
        .trans
        .get_file_content(&project.slug, &component, &filename, merged)
        .await?;

    let full_name = component.full_name(&project.slug);
    let basename = filename.rsplit('/').next().unwrap_or(&filename);
    let title = format!("{}: {}", full_name, basename);
    let body = highlight::highlight(&content);
    let page = pages::file_view(&title, &body, highlight::STYLE_DEFS);

    let fname = download_name(&full_name, &filename);
    Ok((
        [(
            header::CONTENT_DISPOSITION,
            format!("inline; filename={}", fname),
        )],
        Html(page),
    )
        .into_response())
}

async fn file_submit(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_slug, component_slug, filename)): Path<(String, String, String)>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let (project, component) =
        super::component_or_404(&state, &project_slug, &component_slug).await?;
    let pofile = get_or_404(state.store.get_pofile(component.id, &filename).await?)?;
    let full_name = component.full_name(&project.slug);

    let mut payload: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            payload = Some(bytes.to_vec());
        }
    }

    // Missing upload data is user input error: message plus redirect,
    // never an error page.
    let payload = match payload {
        Some(payload) => payload,
        None => {
            state
                .store
                .push_message(
                    user.id,
                    "Please select a file from your system to be uploaded.",
                )
                .await?;
            return Ok(Redirect::to(&detail_url(&project_slug, &component_slug)).into_response());
        }
    };

    tracing::debug!(component = %full_name, "Checking out for submission");
    let unit = match component.unit_id {
        Some(unit_id) => state.store.get_unit(unit_id).await?,
        None => None,
    };
    state
        .trans
        .prepare_repo(&project.slug, &component, unit.as_ref())
        .await?;

    // Target language from the stats row, falling back to guessing from
    // the filename.
    let (lang_name, lang_code) = match (&pofile.language_name, &pofile.language_code) {
        (Some(name), Some(code)) => (name.clone(), Some(code.clone())),
        _ => (
            pofile.filename.clone(),
            state.trans.guess_language(&pofile.filename),
        ),
    };

    let message = format!("Sending translation for {}", lang_name);

    let outcome = submit_and_recount(
        &state,
        &project.slug,
        &component,
        &pofile.filename,
        payload,
        &message,
        &user.username,
        lang_code.as_deref(),
    )
    .await;

    match outcome {
        Ok(()) => {
            log_change(&state.store, &user, "component", &full_name, &message).await?;
            state
                .store
                .push_message(
                    user.id,
                    &format!("File submitted successfully: {}", pofile.filename),
                )
                .await?;
        }
        Err(e) => {
            tracing::error!(
                file = %pofile.filename,
                component = %full_name,
                error = %e,
                "Error submitting translation file"
            );
            state
                .store
                .push_message(
                    user.id,
                    "Sorry, an error is causing troubles to send your file.",
                )
                .await?;
        }
    }

    Ok(Redirect::to(&detail_url(&project_slug, &component_slug)).into_response())
}

/// Submit the file once, then recompute statistics for its language.
#[allow(clippy::too_many_arguments)]
async fn submit_and_recount(
    state: &AppState,
    project_slug: &str,
    component: &crate::store::models::Component,
    filename: &str,
    payload: Vec<u8>,
    message: &str,
    username: &str,
    lang_code: Option<&str>,
) -> Result<(), TransError> {
    state
        .trans
        .submit(project_slug, component, filename, payload, message, username)
        .await?;

    match lang_code {
        Some(code) => {
            state
                .trans
                .set_stats_for_lang(project_slug, component, code)
                .await
        }
        None => state.trans.set_stats(project_slug, component).await,
    }
}

async fn toggle_lock(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((project_slug, component_slug, filename)): Path<(String, String, String)>,
) -> Result<Response, AppError> {
    let (_project, component) =
        super::component_or_404(&state, &project_slug, &component_slug).await?;
    let pofile = get_or_404(state.store.get_pofile(component.id, &filename).await?)?;

    match state.store.get_lock(pofile.id).await? {
        Some(lock) if lock.owner_user_id == user.id => {
            state.store.delete_lock(lock.id).await?;
            state.store.push_message(user.id, "Lock removed.").await?;
        }
        Some(_) => {
            state
                .store
                .push_message(user.id, "Error: Only the owner of a lock can remove it.")
                .await?;
        }
        None => match state.store.create_lock(pofile.id, user.id).await {
            Ok(_) => {
                state
                    .store
                    .push_message(
                        user.id,
                        "Lock created. Please don't forget to remove it when you're done.",
                    )
                    .await?;
            }
            // Lost the race against a concurrent lock request.
            Err(StoreError::Conflict(_)) => {
                state
                    .store
                    .push_message(user.id, "Error: Only the owner of a lock can remove it.")
                    .await?;
            }
            Err(e) => return Err(e.into()),
        },
    }

    Ok(Redirect::to(&detail_url(&project_slug, &component_slug)).into_response())
}
