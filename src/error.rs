/// Unified error types for the Petaldrop server
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum DropError {
    /// Database errors; the only database is the record store, so these
    /// are transient storage failures to callers
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Validation errors (client-caused, never retried)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Upload exceeds the image size cap
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Blob storage errors (transient)
    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    /// Record storage errors (transient)
    #[error("Record storage error: {0}")]
    RecordStorage(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert DropError to an HTTP response
///
/// Transient storage errors carry a Retry-After hint so callers can
/// distinguish "try again shortly" from client faults.
impl IntoResponse for DropError {
    fn into_response(self) -> Response {
        let (status, error_code, message, retry_after) = match &self {
            DropError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
                false,
            ),
            DropError::PayloadTooLarge(_) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PayloadTooLarge",
                self.to_string(),
                false,
            ),
            DropError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                self.to_string(),
                false,
            ),
            DropError::BlobStorage(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "StorageUnavailable",
                "Image storage is temporarily unavailable. Please try again in a moment."
                    .to_string(),
                true,
            ),
            DropError::RecordStorage(_) | DropError::Database(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "StorageUnavailable",
                "Service temporarily unavailable. Please try again.".to_string(),
                true,
            ),
            DropError::Internal(_) | DropError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
                false,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        if retry_after {
            (status, [(header::RETRY_AFTER, "5")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

/// Result type alias for service operations
pub type DropResult<T> = Result<T, DropError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let resp = DropError::Validation("bad coords".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_transient_storage_carries_retry_hint() {
        let resp = DropError::RecordStorage("kv down".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            resp.headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
            Some("5")
        );
    }

    #[test]
    fn test_database_failure_is_transient_to_callers() {
        let resp = DropError::Database(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(resp.headers().contains_key(header::RETRY_AFTER));
    }

    #[test]
    fn test_internal_does_not_leak_details() {
        let resp = DropError::Internal("secret connection string".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_oversized_maps_to_413() {
        let resp = DropError::PayloadTooLarge("image over limit".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
