//! Error handling for the API server
//!
//! A single error type that maps to HTTP responses. Handlers return
//! `Result<T, ApiError>` and errors from the shared crate convert with `?`.
//!
//! User-not-found and daily-limit-reached are both `400 Bad Request`, but carry
//! different `error` codes so clients can tell them apart.
//!
//! # Example
//!
//! ```
//! use dailytodo_api::error::{ApiError, ApiResult};
//! use axum::Json;
//! use serde_json::json;
//!
//! async fn handler(raw_id: String) -> ApiResult<Json<serde_json::Value>> {
//!     let id: i64 = raw_id
//!         .parse()
//!         .map_err(|_| ApiError::BadRequest("Invalid user id".to_string()))?;
//!     Ok(Json(json!({ "id": id })))
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dailytodo_shared::quota::QuotaError;
use dailytodo_shared::store::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400) - malformed id, empty task text
    BadRequest(String),

    /// User does not exist (400)
    UserNotFound(String),

    /// Task does not exist (400)
    TaskNotFound(String),

    /// Task belongs to a different user (403)
    Forbidden(String),

    /// Daily task quota exhausted (400)
    DailyLimitReached {
        /// Tasks already created today
        current: i64,
        /// The user's daily limit
        limit: i64,
    },

    /// Conflict (409) - duplicate user id
    Conflict(String),

    /// Unprocessable entity (422) - form validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "daily_limit_reached")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    /// Machine-readable code sent in the `error` field
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::UserNotFound(_) => "user_not_found",
            ApiError::TaskNotFound(_) => "task_not_found",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::DailyLimitReached { .. } => "daily_limit_reached",
            ApiError::Conflict(_) => "conflict",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::InternalError(_) => "internal_error",
        }
    }

    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::UserNotFound(_)
            | ApiError::TaskNotFound(_)
            | ApiError::DailyLimitReached { .. } => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::UserNotFound(msg) => write!(f, "User not found: {}", msg),
            ApiError::TaskNotFound(msg) => write!(f, "Task not found: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::DailyLimitReached { current, limit } => {
                write!(f, "Daily task limit reached ({}/{})", current, limit)
            }
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match self {
            ApiError::BadRequest(msg)
            | ApiError::UserNotFound(msg)
            | ApiError::TaskNotFound(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Conflict(msg) => (msg, None),
            ApiError::DailyLimitReached { current, limit } => (
                format!("Daily task limit reached ({}/{})", current, limit),
                None,
            ),
            ApiError::ValidationError(errors) => {
                ("Request validation failed".to_string(), Some(errors))
            }
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("An internal error occurred".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            error: code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert storage errors to API errors
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UserExists(id) => {
                ApiError::Conflict(format!("User {} already exists", id))
            }
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Convert admission outcomes to API errors
impl From<QuotaError> for ApiError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::InvalidUserId(_) => ApiError::BadRequest("Invalid user id".to_string()),
            QuotaError::EmptyTask => ApiError::BadRequest("Task cannot be empty".to_string()),
            QuotaError::UserNotFound(_) => ApiError::UserNotFound("User ID not found".to_string()),
            QuotaError::LimitExceeded { current, limit } => {
                ApiError::DailyLimitReached { current, limit }
            }
            QuotaError::Store(err) => err.into(),
        }
    }
}

/// Convert form validation failures to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::DailyLimitReached {
            current: 2,
            limit: 2,
        };
        assert_eq!(err.to_string(), "Daily task limit reached (2/2)");
    }

    #[test]
    fn test_not_found_and_limit_share_status_but_not_code() {
        let not_found: ApiError = QuotaError::UserNotFound(3).into();
        let limited: ApiError = QuotaError::LimitExceeded {
            current: 1,
            limit: 1,
        }
        .into();

        assert_eq!(not_found.status(), StatusCode::BAD_REQUEST);
        assert_eq!(limited.status(), StatusCode::BAD_REQUEST);
        assert_ne!(not_found.code(), limited.code());
    }

    #[test]
    fn test_store_errors() {
        let conflict: ApiError = StoreError::UserExists(7).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let down: ApiError = QuotaError::Store(StoreError::Unavailable("timeout".into())).into();
        assert_eq!(down.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(down.code(), "internal_error");
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = ApiError::InternalError("password=hunter2".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.error, "internal_error");
        assert!(!body.message.contains("hunter2"));
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail {
                field: "name".to_string(),
                message: "Name cannot be empty".to_string(),
            },
            ValidationErrorDetail {
                field: "max_tasks_per_day".to_string(),
                message: "Must not be negative".to_string(),
            },
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
