//! REST API error mapping.
//!
//! Every error body has the shape `{"detail": <message>}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};

use super::logs::log_error;
use crate::error::PipelineError;

/// Message returned for any authentication failure.
pub const AUTH_FAILED_MESSAGE: &str = "Incorrect username or password";

/// Message returned when the upload has no readable `file` part.
pub const UNREADABLE_FILE_MESSAGE: &str = "File could not be read.";

/// Errors surfaced by the HTTP layer.
#[derive(Debug)]
pub enum ApiError {
    Authentication,
    UnreadableFile,
    Pipeline(PipelineError),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Authentication => StatusCode::UNAUTHORIZED,
            ApiError::UnreadableFile => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Pipeline(PipelineError::Csv(_) | PipelineError::Schema(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Pipeline(PipelineError::Coercion(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::Authentication => AUTH_FAILED_MESSAGE.to_string(),
            // Decoding details are logged, not returned.
            ApiError::UnreadableFile | ApiError::Pipeline(PipelineError::Csv(_)) => {
                UNREADABLE_FILE_MESSAGE.to_string()
            }
            ApiError::Pipeline(err) => err.to_string(),
        }
    }
}

/// Build the standard error body.
pub fn error_response(message: &str) -> Value {
    json!({ "detail": message })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log_error(format!("Upload failed: {}", self.message()));
        } else if let ApiError::Pipeline(ref err) = self {
            tracing::warn!(error = %err, "upload rejected");
        }
        (status, Json(error_response(&self.message()))).into_response()
    }
}
