//! User management endpoints
//!
//! # Endpoints
//!
//! - `POST /users` - Create user (form fields `id`, `name`, `max_tasks_per_day`)
//! - `GET /users` - List users
//! - `GET /users/:user_id` - Get user
//! - `PUT /users/:user_id` - Update name and/or limit
//! - `DELETE /users/:user_id` - Delete user and all their tasks
//!
//! Changing `max_tasks_per_day` applies to the next admission. Tasks already
//! created today stay, even when the new limit is below today's count.

use super::{form_body, parse_id};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::FormRejection, Path, State},
    Form, Json,
};
use dailytodo_shared::models::user::{CreateUser, UpdateUser, User};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// Create user form
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserForm {
    /// Caller-chosen user id
    #[validate(range(min = 1, message = "User id must be a positive integer"))]
    pub id: i64,

    /// Display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Daily task limit
    #[validate(range(min = 0, message = "max_tasks_per_day cannot be negative"))]
    pub max_tasks_per_day: i32,
}

/// Update user form; absent fields stay unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserForm {
    /// New display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    /// New daily task limit
    #[validate(range(min = 0, message = "max_tasks_per_day cannot be negative"))]
    pub max_tasks_per_day: Option<i32>,
}

/// Response for user deletion
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    /// Confirmation message
    pub message: String,

    /// Number of the user's tasks removed with them
    pub deleted_tasks: u64,
}

/// Create user handler
///
/// # Errors
///
/// - `400 bad_request`: Undecodable form
/// - `409 conflict`: Id already taken
/// - `422 validation_error`: Non-positive id, blank name, negative limit
pub async fn create_user(
    State(state): State<AppState>,
    form: Result<Form<CreateUserForm>, FormRejection>,
) -> ApiResult<Json<User>> {
    let mut form = form_body(form)?;
    form.name = form.name.trim().to_string();
    form.validate()?;

    let user = state
        .storage
        .users
        .create(
            CreateUser {
                id: form.id,
                name: form.name,
                max_tasks_per_day: form.max_tasks_per_day,
            },
            state.now(),
        )
        .await?;

    info!(
        user_id = user.id,
        max_tasks_per_day = user.max_tasks_per_day,
        "User created"
    );

    Ok(Json(user))
}

/// List users handler
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.storage.users.list().await?))
}

/// Get user handler
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<User>> {
    let user_id = parse_id(&user_id, "User")?;

    let user = state
        .storage
        .users
        .lookup(user_id)
        .await?
        .ok_or_else(user_not_found)?;

    Ok(Json(user))
}

/// Update user handler
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    form: Result<Form<UpdateUserForm>, FormRejection>,
) -> ApiResult<Json<User>> {
    let user_id = parse_id(&user_id, "User")?;
    let mut form = form_body(form)?;
    form.name = form.name.map(|name| name.trim().to_string());
    form.validate()?;

    let user = state
        .storage
        .users
        .update(
            user_id,
            UpdateUser {
                name: form.name,
                max_tasks_per_day: form.max_tasks_per_day,
            },
            state.now(),
        )
        .await?
        .ok_or_else(user_not_found)?;

    info!(
        user_id,
        max_tasks_per_day = user.max_tasks_per_day,
        "User updated"
    );

    Ok(Json(user))
}

/// Delete user handler
///
/// Removes the user and their tasks in one store operation, while holding the
/// user's admission lock so no task can be admitted in between. A storage
/// failure leaves both untouched.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<DeleteUserResponse>> {
    let user_id = parse_id(&user_id, "User")?;
    let _guard = state.enforcer.locks().acquire(user_id).await;

    let deleted_tasks = state
        .storage
        .users
        .delete_cascade(user_id)
        .await?
        .ok_or_else(user_not_found)?;

    info!(user_id, deleted_tasks, "User deleted");

    Ok(Json(DeleteUserResponse {
        message: "User deleted successfully".to_string(),
        deleted_tasks,
    }))
}

fn user_not_found() -> ApiError {
    ApiError::UserNotFound("User ID not found".to_string())
}
