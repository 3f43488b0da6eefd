//! Error types for the HTTP surface

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::core::IngestError;
use crate::triage::BulkError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Upload rejected during ingestion (400)
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Multipart body had no field carrying a filename (400)
    #[error("No file uploaded")]
    MissingFile,

    /// `/predict` text was empty after trimming (400)
    #[error("Text must not be empty")]
    EmptyText,

    /// Malformed request body (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload exceeded the configured body limit (413)
    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Inference failed: {0}")]
    Inference(anyhow::Error),

    #[error("Failed to package results: {0}")]
    Packaging(anyhow::Error),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Ingest(_)
            | ApiError::MissingFile
            | ApiError::EmptyText
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Inference(_)
            | ApiError::Packaging(_)
            | ApiError::Internal(_)
            | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Ingest(err) => err.code(),
            ApiError::MissingFile => "MissingFile",
            ApiError::EmptyText => "EmptyText",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::PayloadTooLarge(_) => "PayloadTooLarge",
            ApiError::Inference(_) => "InferenceFailed",
            ApiError::Packaging(_) => "PackagingFailed",
            ApiError::Internal(_) | ApiError::Io(_) => "Internal",
        }
    }
}

impl From<BulkError> for ApiError {
    fn from(err: BulkError) -> Self {
        match err {
            BulkError::Ingest(e) => ApiError::Ingest(e),
            BulkError::Inference(e) => ApiError::Inference(e),
            BulkError::Packaging(e) => ApiError::Packaging(e),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match &self {
            ApiError::Inference(e) | ApiError::Packaging(e) => format!("{e:#}"),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(code, "{message}");
        } else {
            tracing::warn!(code, "{message}");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
