//! HTTP rendering of [`TokenError`].

use crate::error::TokenError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};
use uuid::Uuid;

/// Error response JSON
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error payload
    pub error: ErrorBody,
}

/// Error payload. Internal detail stays in the log line keyed by
/// `request_id`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable code from [`TokenError::code`]
    pub code: &'static str,
    /// Client-safe message
    pub message: String,
    /// Correlates the response with server logs
    pub request_id: String,
}

impl IntoResponse for TokenError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();

        let (status, message) = if self.is_authorization_failure() {
            debug!(request_id = %request_id, error = %self, "Request unauthorized");
            (StatusCode::UNAUTHORIZED, "unauthorized".to_string())
        } else if let Self::InvalidRequest(message) = &self {
            debug!(request_id = %request_id, error = %self, "Invalid request");
            (StatusCode::BAD_REQUEST, message.clone())
        } else {
            error!(request_id = %request_id, error = %self, "Request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            )
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message,
                request_id,
            },
        };

        (status, Json(body)).into_response()
    }
}
