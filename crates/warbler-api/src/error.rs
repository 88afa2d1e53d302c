use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::pages;

/// Request-level failures that escape a handler. Validation and
/// authorization rejections never land here — those re-render or redirect
/// inside the handlers; this type covers the terminal cases.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("resource not found")]
    NotFound,

    #[error("database error")]
    Database(#[from] anyhow::Error),

    #[error("failed to hash password: {0}")]
    PasswordHash(String),
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(error: argon2::password_hash::Error) -> Self {
        AppError::PasswordHash(error.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => {
                (StatusCode::NOT_FOUND, Html(pages::not_found_page())).into_response()
            }
            AppError::Database(err) => {
                error!("database error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(pages::error_page())).into_response()
            }
            AppError::PasswordHash(err) => {
                error!("password hashing failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(pages::error_page())).into_response()
            }
        }
    }
}
