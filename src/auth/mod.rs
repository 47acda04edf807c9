//! Session authentication.
//!
//! # Responsibilities
//! - Issue and revoke Bearer session tokens (`/login`, `/logout`)
//! - Resolve the current user from the Authorization header
//! - Drain the user's notification queue (`/messages`)
//!
//! # Design Decisions
//! - Sessions live in the database; a token is a UUID v4
//! - Handlers opt into authentication through the `CurrentUser` extractor;
//!   admin endpoints use `AdminUser` on top

use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};

use crate::http::error::AppError;
use crate::http::server::AppState;
use crate::store::models::{User, UserMessage};
use crate::store::Repository;

/// The authenticated requester. Rejects with 401 when the session is
/// missing or stale.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = user_from_headers(&parts.headers, &state.store).await?;
        Ok(CurrentUser(user))
    }
}

/// An authenticated administrator. 403 for regular accounts.
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = user_from_headers(&parts.headers, &state.store).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

/// Resolve the Bearer token in the headers to a user.
pub async fn user_from_headers(
    headers: &HeaderMap,
    store: &Repository,
) -> Result<User, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    store
        .session_user(token)
        .await?
        .ok_or(AppError::Unauthorized)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub is_admin: bool,
}

/// POST /login: check credentials and issue a session token.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .store
        .verify_login(&form.username, &form.password)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let token = state.store.create_session(user.id).await?;
    tracing::info!(username = %user.username, "User logged in");

    Ok(Json(LoginResponse {
        token,
        username: user.username,
        is_admin: user.is_admin,
    }))
}

/// POST /logout: revoke the presented session token.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    // Validates the session before revoking it.
    let user = user_from_headers(&headers, &state.store).await?;
    if let Some(token) = bearer_token(&headers) {
        state.store.delete_session(token).await?;
    }
    tracing::info!(username = %user.username, "User logged out");
    Ok(Json(serde_json::json!({ "logged_out": true })))
}

/// GET /messages: drain the user's queued notifications, oldest first.
pub async fn messages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<UserMessage>>, AppError> {
    let messages = state.store.drain_messages(user.id).await?;
    Ok(Json(messages))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/messages", get(messages))
}
