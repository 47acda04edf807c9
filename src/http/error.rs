//! Request-level error type and status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::store::StoreError;
use crate::trans::TransError;

/// Error type shared by all handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("authentication required")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Trans(#[from] TransError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::Store(StoreError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("{} not found", what))
            }
            AppError::Trans(e) if e.is_not_found() => {
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            AppError::Store(_) | AppError::Trans(_) => {
                tracing::error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, body).into_response()
    }
}

/// The `get_object_or_404` of this codebase.
pub fn get_or_404<T>(value: Option<T>) -> Result<T, AppError> {
    value.ok_or(AppError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Store(StoreError::NotFound("project"))
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Trans(TransError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "gone"
            )))
            .into_response()
            .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Trans(TransError::Checkout("boom".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_get_or_404() {
        assert!(get_or_404(Some(1)).is_ok());
        assert!(matches!(get_or_404::<i32>(None), Err(AppError::NotFound)));
    }
}
