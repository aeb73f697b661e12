//! Application error types.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::engine::EngineError;

/// Application errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Engine(e) => match e {
                EngineError::InvalidPagination(_)
                | EngineError::Validation { .. }
                | EngineError::ReferentialViolation(_) => StatusCode::BAD_REQUEST,
                EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
                EngineError::Persistence { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Report a referential violation as a conflict instead of a bad request.
    ///
    /// Used where the caller's request is well formed but the current state
    /// of the store prevents it, e.g. deleting a category that still has items.
    pub fn conflict_on_reference(self) -> Self {
        match self {
            AppError::Engine(EngineError::ReferentialViolation(msg)) => AppError::Conflict(msg),
            other => other,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // 5xx bodies stay vague; the cause goes to the log.
        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "internal server error");
                "internal server error".to_string()
            }
            AppError::Engine(e @ EngineError::Persistence { source, .. }) => {
                tracing::error!(error = %e, cause = %source, "database error");
                "internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

/// Result type alias using AppError.
pub type AppResult<T> = Result<T, AppError>;
