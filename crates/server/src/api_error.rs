use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pgcat_core::error::ErrorKind;
use pgcat_core::Error;
use pgcat_wire::{ErrorBody, ErrorEnvelope};

/// Top-level error type returned by every handler. Wraps `pgcat_core::Error`
/// and implements `IntoResponse`, mapping each taxonomy kind to its HTTP
/// status and the `{"error": {...}}` body shape from spec.md §7.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let kind_name = match self.0.kind() {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal",
        };

        match status {
            StatusCode::INTERNAL_SERVER_ERROR => {
                tracing::error!(error = %self.0, "request failed");
            }
            _ => tracing::warn!(error = %self.0, "request rejected"),
        }

        let body = ErrorEnvelope {
            error: ErrorBody {
                kind: kind_name.to_string(),
                message: self.0.to_string(),
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}
