//! Task endpoints
//!
//! Creation goes through the quota admission controller. Every other operation
//! is a pass-through to the task store, guarded by an ownership check: a task
//! is only reachable under the path of the user that owns it.
//!
//! # Endpoints
//!
//! - `POST /users/:user_id/tasks` - Create task (form field `task`)
//! - `GET /users/:user_id/tasks` - List tasks
//! - `DELETE /users/:user_id/tasks` - Delete all of the user's tasks
//! - `GET /users/:user_id/tasks/:task_id` - Get task
//! - `PUT /users/:user_id/tasks/:task_id` - Replace task text (form field `task`)
//! - `DELETE /users/:user_id/tasks/:task_id` - Delete task

use super::{form_body, parse_id};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::FormRejection, Path, State},
    Form, Json,
};
use dailytodo_shared::models::task::Task;
use dailytodo_shared::quota::QuotaCheckResult;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Task text form
#[derive(Debug, Default, Deserialize)]
pub struct TaskForm {
    /// Task text; missing is treated as empty
    #[serde(default)]
    pub task: Option<String>,
}

impl TaskForm {
    fn text(&self) -> &str {
        self.task.as_deref().unwrap_or_default()
    }
}

/// Response for an admitted task
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskCreatedResponse {
    /// Confirmation message
    pub message: String,

    /// The stored task
    pub task: Task,

    /// Today's usage including this task
    pub usage: QuotaCheckResult,
}

/// Response carrying a single task
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskMessageResponse {
    /// Confirmation message
    pub message: String,

    /// The task after the operation
    pub task: Task,
}

/// Response for deletions
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Confirmation message
    pub message: String,

    /// Number of tasks removed
    pub deleted: u64,
}

/// Create task handler
///
/// # Errors
///
/// - `400 bad_request`: Malformed user id or empty task
/// - `400 user_not_found`: No such user
/// - `400 daily_limit_reached`: Today's quota is used up
/// - `500 internal_error`: Storage failure
pub async fn create_task(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    form: Result<Form<TaskForm>, FormRejection>,
) -> ApiResult<Json<TaskCreatedResponse>> {
    let user_id = parse_id(&user_id, "User")?;
    let form = form_body(form)?;

    let admitted = state.enforcer.admit(user_id, form.text()).await?;

    Ok(Json(TaskCreatedResponse {
        message: "Task added successfully".to_string(),
        task: admitted.task,
        usage: admitted.usage,
    }))
}

/// List tasks handler
///
/// Returns the user's tasks in creation order; an unknown user has none.
pub async fn list_tasks(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    let user_id = parse_id(&user_id, "User")?;
    let tasks = state.storage.tasks.list_for_user(user_id).await?;

    Ok(Json(tasks))
}

/// Get task handler
pub async fn get_task(
    State(state): State<AppState>,
    Path((user_id, task_id)): Path<(String, String)>,
) -> ApiResult<Json<Task>> {
    let (user_id, task_id) = parse_ids(&user_id, &task_id)?;
    let task = owned_task(&state, user_id, task_id).await?;

    Ok(Json(task))
}

/// Update task handler
///
/// Replaces the text and refreshes `updated_at`. Edits do not consume quota.
pub async fn update_task(
    State(state): State<AppState>,
    Path((user_id, task_id)): Path<(String, String)>,
    form: Result<Form<TaskForm>, FormRejection>,
) -> ApiResult<Json<TaskMessageResponse>> {
    let (user_id, task_id) = parse_ids(&user_id, &task_id)?;
    let form = form_body(form)?;

    let text = form.text().trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Task cannot be empty".to_string()));
    }

    owned_task(&state, user_id, task_id).await?;

    let task = state
        .storage
        .tasks
        .update(task_id, text, state.now())
        .await?
        .ok_or_else(task_not_found)?;

    info!(user_id, task_id, "Task updated");

    Ok(Json(TaskMessageResponse {
        message: "Task updated successfully".to_string(),
        task,
    }))
}

/// Delete task handler
pub async fn delete_task(
    State(state): State<AppState>,
    Path((user_id, task_id)): Path<(String, String)>,
) -> ApiResult<Json<DeleteResponse>> {
    let (user_id, task_id) = parse_ids(&user_id, &task_id)?;
    owned_task(&state, user_id, task_id).await?;

    if !state.storage.tasks.delete(task_id).await? {
        return Err(task_not_found());
    }

    info!(user_id, task_id, "Task deleted");

    Ok(Json(DeleteResponse {
        message: "Task deleted successfully".to_string(),
        deleted: 1,
    }))
}

/// Delete all tasks handler
///
/// Deleting frees today's quota.
pub async fn delete_all_tasks(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let user_id = parse_id(&user_id, "User")?;
    let deleted = state.storage.tasks.delete_all_for_user(user_id).await?;

    info!(user_id, deleted, "Deleted all tasks for user");

    Ok(Json(DeleteResponse {
        message: "Tasks deleted successfully".to_string(),
        deleted,
    }))
}

fn parse_ids(user_id: &str, task_id: &str) -> ApiResult<(i64, i64)> {
    Ok((parse_id(user_id, "User")?, parse_id(task_id, "Task")?))
}

fn task_not_found() -> ApiError {
    ApiError::TaskNotFound("Task not found".to_string())
}

/// Loads a task and checks it belongs to `user_id`
async fn owned_task(state: &AppState, user_id: i64, task_id: i64) -> ApiResult<Task> {
    let task = state
        .storage
        .tasks
        .get_by_id(task_id)
        .await?
        .ok_or_else(task_not_found)?;

    if !task.is_owned_by(user_id) {
        warn!(
            user_id,
            task_id,
            owner_id = task.user_id,
            "Task accessed through another user's path"
        );
        return Err(ApiError::Forbidden(
            "Task does not belong to this user".to_string(),
        ));
    }

    Ok(task)
}
