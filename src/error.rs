//! Error types for the Lingua server
//!
//! Every failure leaving the HTTP layer carries a stable machine-readable
//! `code` for client branching and a timestamp for log correlation. Raw
//! internal error text is only exposed through the debug-build `details`
//! field.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::session::SessionError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid file format: {0}")]
    InvalidFormat(String),

    #[error("the document is password protected; remove the password and try again")]
    PasswordProtected,

    #[error("the document appears to be corrupted or damaged")]
    Corrupted,

    #[error("text extraction failed")]
    ExtractionFailed,

    #[error("{0}")]
    OversizedChunk(String),

    #[error("{0}")]
    InvalidChunkIndex(String),

    #[error("no active processing session for document '{0}'")]
    SessionNotFound(String),

    #[error("chunk metadata conflicts with the existing session: {0}")]
    SessionConflict(String),

    #[error("file of {size} bytes exceeds the {max} byte limit")]
    FileTooLarge { size: usize, max: usize },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable code for client branching
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidFormat(_) => "INVALID_FORMAT",
            AppError::PasswordProtected => "PASSWORD_PROTECTED",
            AppError::Corrupted => "CORRUPTED_FILE",
            AppError::ExtractionFailed => "EXTRACTION_FAILED",
            AppError::OversizedChunk(_) => "OVERSIZED_CHUNK",
            AppError::InvalidChunkIndex(_) => "INVALID_CHUNK_INDEX",
            AppError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            AppError::SessionConflict(_) => "SESSION_CONFLICT",
            AppError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidFormat(_)
            | AppError::PasswordProtected
            | AppError::Corrupted
            | AppError::OversizedChunk(_)
            | AppError::InvalidChunkIndex(_)
            | AppError::SessionConflict(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ExtractionFailed | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ExtractionError> for AppError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::InvalidFormat(msg) => AppError::InvalidFormat(msg),
            ExtractionError::PasswordProtected => AppError::PasswordProtected,
            ExtractionError::Corrupted => AppError::Corrupted,
            ExtractionError::Failed => AppError::ExtractionFailed,
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(id) => AppError::SessionNotFound(id),
            SessionError::InvalidChunkIndex { .. } => AppError::InvalidChunkIndex(e.to_string()),
            SessionError::OversizedChunk { .. } => AppError::OversizedChunk(e.to_string()),
            SessionError::Conflict(msg) => AppError::SessionConflict(msg),
            SessionError::Extraction(inner) => inner.into(),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }

        let message = match &self {
            // Keep internal detail out of the client-facing message
            AppError::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            error: message,
            code: self.code(),
            timestamp: chrono::Utc::now(),
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
