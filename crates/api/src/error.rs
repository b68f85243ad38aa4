//! Application-level error type and the uniform error envelope.
//!
//! Every failure response carries `{ "error": true, "message", "code",
//! "details"? }` with `code` drawn from a fixed enum so the UI can render
//! differentiated messages. Raw remote error lists ride in `details` for
//! diagnostics only; internal errors are logged in full and sanitized in
//! the response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use bundlekit_core::error::CoreError;
use bundlekit_store::error::StoreError;

/// Stable error codes of the envelope.
pub const CODE_NOT_FOUND: &str = "NOT_FOUND";
pub const CODE_VALIDATION: &str = "VALIDATION";
pub const CODE_DUPLICATE: &str = "DUPLICATE";
pub const CODE_LIMIT_EXCEEDED: &str = "LIMIT_EXCEEDED";
pub const CODE_INTERNAL: &str = "INTERNAL";

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`StoreError`] for remote
/// failures, and implements [`IntoResponse`] to produce the uniform JSON
/// error envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `bundlekit-core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A remote-store error from `bundlekit-store`.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Store(StoreError::Core(core)) => classify_core_error(core),
            AppError::Store(store) => classify_store_error(store),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, CODE_VALIDATION, msg, None)
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    CODE_INTERNAL,
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let mut body = json!({
            "error": true,
            "message": message,
            "code": code,
        });
        if let Some(details) = details {
            body["details"] = details;
        }

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a domain error into status, code, message, and details.
fn classify_core_error(
    err: CoreError,
) -> (StatusCode, &'static str, String, Option<serde_json::Value>) {
    match err {
        CoreError::NotFound { entity, ref id } => (
            StatusCode::NOT_FOUND,
            CODE_NOT_FOUND,
            format!("{entity} with id {id} not found"),
            None,
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, CODE_VALIDATION, msg, None),
        CoreError::Duplicate(msg) => (StatusCode::CONFLICT, CODE_DUPLICATE, msg, None),
        CoreError::LimitExceeded(msg) => {
            (StatusCode::BAD_REQUEST, CODE_LIMIT_EXCEEDED, msg, None)
        }
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                CODE_INTERNAL,
                "An internal error occurred".to_string(),
                None,
            )
        }
    }
}

/// Classify a remote-store error.
///
/// Remote user errors keep their verbatim text in `details`; a
/// "has already been taken" collision maps to the duplicate taxonomy, any
/// other user error to validation. Transport and pipeline failures are
/// logged in full and sanitized to an internal error.
fn classify_store_error(
    err: StoreError,
) -> (StatusCode, &'static str, String, Option<serde_json::Value>) {
    match &err {
        StoreError::NotFound { id } => (
            StatusCode::NOT_FOUND,
            CODE_NOT_FOUND,
            format!("Record with id {id} not found"),
            None,
        ),
        StoreError::UserErrors(errors) => {
            let details = serde_json::to_value(errors).ok();
            if err.is_taken() {
                (
                    StatusCode::CONFLICT,
                    CODE_DUPLICATE,
                    "A record with this title already exists".to_string(),
                    details,
                )
            } else {
                (
                    StatusCode::BAD_REQUEST,
                    CODE_VALIDATION,
                    err.to_string(),
                    details,
                )
            }
        }
        StoreError::UploadTimeout { attempts } => {
            tracing::error!(attempts, "Upload pipeline timed out");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                CODE_INTERNAL,
                "Image processing did not finish in time".to_string(),
                None,
            )
        }
        other => {
            tracing::error!(error = %other, "Remote store error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                CODE_INTERNAL,
                "An internal error occurred".to_string(),
                None,
            )
        }
    }
}
