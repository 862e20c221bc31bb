// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::submission::SubmissionError;
use crate::token::TokenError;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., duplicate submission)
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
/// Internal detail is logged server-side and never echoed to the caller.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Recovers validator outcomes into client-visible categories before they
/// cross the HTTP boundary.
impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::InvalidPayload => {
                AppError::BadRequest("Invalid encrypted payload".to_string())
            }
            SubmissionError::MissingIdentity => {
                AppError::BadRequest("Missing sso_id or exam_name".to_string())
            }
            SubmissionError::InvalidRequestData => {
                AppError::BadRequest("Invalid request data".to_string())
            }
            SubmissionError::NoValidResponses => {
                AppError::BadRequest("No valid responses in payload".to_string())
            }
            SubmissionError::CandidateNotFound => {
                AppError::NotFound("Candidate not found".to_string())
            }
            SubmissionError::CandidateNotFoundBySso => {
                AppError::NotFound("Candidate not found for SSO id".to_string())
            }
            SubmissionError::IdentityMismatch => {
                AppError::BadRequest("Identity mismatch".to_string())
            }
            SubmissionError::AlreadySubmitted => {
                AppError::Conflict("Responses already submitted".to_string())
            }
            SubmissionError::Persistence(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::MissingToken | TokenError::Decode | TokenError::MalformedIdentity => {
                AppError::AuthError("Invalid session token".to_string())
            }
            TokenError::AlreadySubmitted => {
                AppError::Conflict("Responses already submitted".to_string())
            }
            TokenError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}
