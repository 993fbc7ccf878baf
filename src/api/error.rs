//! API error types with JSON error responses.
//!
//! Every pipeline failure kind is caught here and converted to a
//! single user-facing message with an HTTP status; nothing escapes as
//! an unhandled error. Body shape is `{ "error": "<message>" }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::grading::{GradingError, InferenceError};

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Unparseable model output")]
    Parse,
    #[error("Submission superseded")]
    Superseded,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::Inference(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message.clone())
            }
            ApiError::Parse => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to parse the AI response. Please try again.".to_string(),
            ),
            ApiError::Superseded => (
                StatusCode::CONFLICT,
                "Superseded by a newer submission.".to_string(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred.".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

impl From<GradingError> for ApiError {
    fn from(err: GradingError) -> Self {
        match err {
            GradingError::Input(detail) => {
                tracing::warn!(detail, "Rejected non-image submission");
                ApiError::BadRequest("Please select a valid image file.".into())
            }
            GradingError::Decode(detail) => {
                tracing::warn!(detail, "Undecodable image submission");
                ApiError::BadRequest(
                    "That file could not be read as an image. Please try another photo.".into(),
                )
            }
            GradingError::Inference(inference) => {
                tracing::error!(error = %inference, "Inference boundary failure");
                // The boundary's own message is shown when it has one;
                // transport-level failures get the generic message.
                match inference {
                    InferenceError::Api { message, .. } if !message.trim().is_empty() => {
                        ApiError::Inference(message)
                    }
                    _ => ApiError::Inference(
                        "Failed to grade the worksheet. Please try again.".into(),
                    ),
                }
            }
            GradingError::Parse(parse) => {
                tracing::error!(error = %parse, "Unparseable grading reply");
                ApiError::Parse
            }
        }
    }
}
