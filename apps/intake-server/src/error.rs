//! Error types for the intake server

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use intake_pipeline::PipelineError;
use pdfjoin_core::PdfJoinError;
use serde::Serialize;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("File '{filename}' exceeds the {limit_mb}MB upload limit")]
    FileTooLarge { filename: String, limit_mb: usize },

    #[error("Request body too large: {0}")]
    RequestTooLarge(String),

    #[error("Invalid image '{filename}': {reason}")]
    InvalidImage { filename: String, reason: String },

    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("Processing timeout after {0}ms")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ServerError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ServerError::FileTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "FILE_TOO_LARGE"),
            ServerError::RequestTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "REQUEST_TOO_LARGE"),
            ServerError::InvalidImage { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_IMAGE")
            }
            ServerError::InvalidPdf(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_PDF"),
            ServerError::Timeout(_) => (StatusCode::REQUEST_TIMEOUT, "TIMEOUT"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for ServerError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyBatch => ServerError::InvalidRequest("No files uploaded".into()),
            PipelineError::Assembly(PdfJoinError::InvalidImage { filename, reason }) => {
                ServerError::InvalidImage { filename, reason }
            }
            PipelineError::Assembly(PdfJoinError::NoDocuments) => {
                ServerError::InvalidRequest("No PDF or image files to assemble".into())
            }
            PipelineError::Assembly(PdfJoinError::ParseError(msg)) => ServerError::InvalidPdf(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<MultipartError> for ServerError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ServerError::RequestTooLarge(err.body_text())
        } else {
            ServerError::InvalidRequest(format!("Malformed multipart body: {}", err.body_text()))
        }
    }
}
