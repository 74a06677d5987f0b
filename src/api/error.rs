use crate::models::ErrorResponse;
use crate::services::scratch::ScratchError;
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

pub const INVALID_FILE_TYPE: &str = "Invalid file type. Please upload a ZIP file.";
pub const INVALID_ZIP_FILE: &str = "Uploaded file is not a valid ZIP file.";
pub const MISSING_FILE_FIELD: &str = "Missing required file field 'file'.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unprocessable Entity: {0}")]
    Unprocessable(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(
                "Request body exceeds the maximum allowed limit".to_string(),
            )
        } else {
            AppError::BadRequest(e.body_text())
        }
    }
}

impl From<ScratchError> for AppError {
    fn from(e: ScratchError) -> Self {
        match e {
            ScratchError::InvalidArchive(cause) => {
                tracing::debug!("Rejected archive: {}", cause);
                AppError::BadRequest(INVALID_ZIP_FILE.to_string())
            }
            // Upload stream failures originate from the multipart parser
            ScratchError::Upload(io) => {
                match io
                    .get_ref()
                    .and_then(|inner| inner.downcast_ref::<MultipartError>())
                {
                    Some(multipart) if multipart.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                        AppError::PayloadTooLarge(
                            "Request body exceeds the maximum allowed limit".to_string(),
                        )
                    }
                    _ => AppError::BadRequest(format!("Failed to read upload: {}", io)),
                }
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
