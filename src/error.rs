use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, AppError>;

/// Errors surfaced at the handler boundary. Every variant maps to one status
/// code and a `{ "message": ... }` body.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// No session, or a session without the required role.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// True when a Postgres unique violation (SQLSTATE 23505) is in the chain.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    })
}

/// Maps a unique-constraint violation to a 400 carrying `msg`.
///
/// Handlers pre-check for duplicates, but two requests can both pass the
/// check; the constraint then decides and the loser gets the same 400.
pub trait OrConflict<T> {
    fn or_conflict(self, msg: &str) -> Result<T>;
}

impl<T> OrConflict<T> for anyhow::Result<T> {
    fn or_conflict(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            if is_unique_violation(&e) {
                warn!(error = %e, "unique constraint violated");
                AppError::validation(msg)
            } else {
                AppError::Internal(e)
            }
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Validation(msg) | AppError::Unauthorized(msg) | AppError::NotFound(msg) => {
                msg.clone()
            }
            AppError::Database(e) => {
                error!(error = %e, "database error");
                "Internal server error".to_string()
            }
            AppError::Internal(e) => {
                error!(error = %e, "internal error");
                "Internal server error".to_string()
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
