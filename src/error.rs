//! Client-facing error taxonomy.
//!
//! Only input validation fails a request. Everything that can go wrong after
//! validation degrades the report instead, so these all map to 400.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// A required field was missing or blank. Holds the field list as shown
    /// to the user, e.g. "Code and language".
    #[error("{0} are required.")]
    MissingField(&'static str),

    #[error("Code exceeds maximum length of {max} characters.")]
    CodeTooLong { length: usize, max: usize },
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingField(_) => "MISSING_FIELD",
            ApiError::CodeTooLong { .. } => "CODE_TOO_LONG",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
