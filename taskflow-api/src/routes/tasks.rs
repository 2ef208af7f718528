/// Task endpoints
///
/// All handlers run behind the JWT gate and act only on the caller's own
/// tasks. Every lookup and mutation is scoped by the caller's user ID, so a
/// task owned by someone else answers exactly like a missing one.
///
/// # Endpoints
///
/// - `GET /api/v1/tasks` - List the caller's tasks, newest first
/// - `POST /api/v1/tasks` - Create a task
/// - `PATCH /api/v1/tasks/:id` - Partial update
/// - `PUT /api/v1/tasks/:id/toggle` - Flip the completion flag
/// - `DELETE /api/v1/tasks/:id` - Delete a task

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{auth::MessageResponse, TaskId, ValidatedJson},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskflow_shared::{
    auth::middleware::AuthContext,
    models::{CreateTask, Task, UpdateTask},
};
use validator::Validate;

const TASK_NOT_FOUND: &str = "Task not found";

/// Create task request
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
}

/// Partial update request, absent fields are left alone
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub completed: Option<bool>,
}

/// Task as returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            completed: task.completed,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// List response
#[derive(Debug, Serialize)]
pub struct TasksResponse {
    pub tasks: Vec<TaskResponse>,
}

/// Toggle response
#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub id: i64,
    pub completed: bool,
    pub message: String,
}

fn not_found() -> ApiError {
    ApiError::NotFound(TASK_NOT_FOUND.to_string())
}

/// List the caller's tasks
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<TasksResponse>> {
    let tasks = Task::list_by_owner(&state.db, auth.user_id).await?;

    Ok(Json(TasksResponse {
        tasks: tasks.into_iter().map(TaskResponse::from).collect(),
    }))
}

/// Create a task
///
/// # Errors
///
/// - `400 Bad Request`: Title missing or too long, description too long
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let task = Task::create(
        &state.db,
        CreateTask {
            user_id: auth.user_id,
            title: req.title,
            description: req.description.unwrap_or_default(),
        },
    )
    .await?;

    tracing::info!(user_id = auth.user_id, task_id = task.id, "Task created");

    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

/// Apply a partial update
///
/// # Errors
///
/// - `400 Bad Request`: Bad ID or invalid fields
/// - `404 Not Found`: No such task for this user
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    TaskId(task_id): TaskId,
    ValidatedJson(req): ValidatedJson<UpdateTaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let patch = UpdateTask {
        title: req.title,
        description: req.description,
        completed: req.completed,
    };

    let task = Task::update_owned(&state.db, auth.user_id, task_id, patch)
        .await?
        .ok_or_else(not_found)?;

    tracing::info!(user_id = auth.user_id, task_id, "Task updated");

    Ok(Json(TaskResponse::from(task)))
}

/// Flip the completion flag
///
/// # Errors
///
/// - `400 Bad Request`: Bad ID
/// - `404 Not Found`: No such task for this user
pub async fn toggle_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    TaskId(task_id): TaskId,
) -> ApiResult<Json<ToggleResponse>> {
    let task = Task::toggle_owned(&state.db, auth.user_id, task_id)
        .await?
        .ok_or_else(not_found)?;

    let status = if task.completed { "completed" } else { "pending" };
    tracing::info!(user_id = auth.user_id, task_id, status, "Task toggled");

    Ok(Json(ToggleResponse {
        id: task.id,
        completed: task.completed,
        message: format!("Task marked as {}", status),
    }))
}

/// Delete a task
///
/// # Errors
///
/// - `400 Bad Request`: Bad ID
/// - `404 Not Found`: No such task for this user
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    TaskId(task_id): TaskId,
) -> ApiResult<Json<MessageResponse>> {
    if !Task::delete_owned(&state.db, auth.user_id, task_id).await? {
        return Err(not_found());
    }

    tracing::info!(user_id = auth.user_id, task_id, "Task deleted");

    Ok(Json(MessageResponse::new("Task deleted successfully")))
}
