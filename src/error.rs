//! Error taxonomy shared by HTTP and WebSocket surfaces.
//!
//! Terminal conditions (NotFound, DuplicateSubmission, InvalidState) are
//! surfaced to the caller with distinct statuses; ContentionTimeout is the
//! only retryable variant and says so in the response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// An entity referenced by the request does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A repeat submission for the same (user, puzzle) inside the replay window.
    #[error("answer for puzzle {puzzle_id} was already submitted; wait before retrying")]
    DuplicateSubmission { puzzle_id: String },

    /// The operation does not apply to the entity's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The completion lock could not be acquired within the bounded wait.
    #[error("completion lock not acquired within {waited_ms}ms")]
    ContentionTimeout { waited_ms: u64 },

    /// Broken server-side content or tuning. Not recoverable by retry.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The caller supplied a timezone name that is not a known IANA zone.
    #[error("unknown timezone: {0}")]
    InvalidTimezone(String),
}

impl AppError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        AppError::NotFound { kind, id: id.into() }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ContentionTimeout { .. })
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::DuplicateSubmission { .. } => StatusCode::CONFLICT,
            AppError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ContentionTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidTimezone(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound { .. } => "not_found",
            AppError::DuplicateSubmission { .. } => "duplicate_submission",
            AppError::InvalidState(_) => "invalid_state",
            AppError::ContentionTimeout { .. } => "contention_timeout",
            AppError::Configuration(_) => "configuration_error",
            AppError::InvalidTimezone(_) => "invalid_timezone",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
            retryable: self.is_retryable(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_contention_is_retryable() {
        assert!(AppError::ContentionTimeout { waited_ms: 2000 }.is_retryable());
        assert!(!AppError::not_found("puzzle", "p1").is_retryable());
        assert!(!AppError::DuplicateSubmission { puzzle_id: "p1".into() }.is_retryable());
        assert!(!AppError::InvalidState("quest not fully answered".into()).is_retryable());
    }

    #[test]
    fn statuses_map_per_taxonomy() {
        assert_eq!(AppError::not_found("user", "u1").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::DuplicateSubmission { puzzle_id: "p".into() }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::ContentionTimeout { waited_ms: 1 }.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::InvalidTimezone("Foo/Bar".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
