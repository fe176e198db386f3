//! Error types for the ingest server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::upload::{Rejection, StoreError};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Message shown for every server-side upload failure
pub const UPLOAD_FAILED_MESSAGE: &str = "Error uploading file";

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("Malformed upload request: {0}")]
    Malformed(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("File not found")]
    NotFound,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Rejected(Rejection::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Rejected(_) | AppError::Malformed(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Store(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client. Server faults never leak paths or
    /// OS errors.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Rejected(rejection) => rejection.to_string(),
            AppError::Malformed(_) => "Malformed upload request".to_string(),
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::NotFound => "File not found".to_string(),
            AppError::Store(StoreError::TooLarge { max }) => {
                Rejection::TooLarge { max: *max }.to_string()
            }
            AppError::Store(_) => UPLOAD_FAILED_MESSAGE.to_string(),
            AppError::Io(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Store(StoreError::TooLarge { .. }) => {
                tracing::debug!("Client error: {}", self);
            }
            AppError::Store(_) => {
                tracing::error!("Upload failed: {}", self);
            }
            AppError::Io(_) => {
                tracing::error!("Internal error: {}", self);
            }
            AppError::Unauthorized => {
                tracing::info!("Authorization error: {}", self);
            }
            AppError::Rejected(_) | AppError::Malformed(_) | AppError::NotFound => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let body = Json(ErrorResponse {
            message: self.user_message(),
        });

        (self.status_code(), body).into_response()
    }
}
