//! API route handlers
//!
//! Organized by resource:
//!
//! - `health`: Health check endpoint
//! - `users`: User management
//! - `tasks`: Quota-checked task creation and per-user task access
//! - `quota`: Daily usage reporting
//!
//! Path ids arrive as raw strings and are parsed here so malformed ids get the
//! same JSON error body as every other client error.

pub mod health;
pub mod quota;
pub mod tasks;
pub mod users;

use crate::error::{ApiError, ApiResult};
use axum::extract::rejection::FormRejection;
use axum::Form;

/// Parses a path segment as a positive id
pub(crate) fn parse_id(raw: &str, kind: &str) -> ApiResult<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::BadRequest(format!("{} id cannot be empty", kind)));
    }

    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::BadRequest(format!(
            "Invalid {} id",
            kind.to_lowercase()
        ))),
    }
}

/// Unwraps a form body, reporting decode failures as bad requests
pub(crate) fn form_body<T>(form: Result<Form<T>, FormRejection>) -> ApiResult<T> {
    form.map(|Form(inner)| inner)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}
