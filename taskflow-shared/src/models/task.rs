/// Task model and owner-scoped database operations
///
/// Every query that reads or writes an existing task filters on both the task
/// ID and the owner ID, and mutations are a single conditional statement. A
/// task that exists but belongs to someone else is indistinguishable from one
/// that does not exist: both come back as `None` / `false`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id          INTEGER PRIMARY KEY AUTOINCREMENT,
///     user_id     INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
///     title       TEXT    NOT NULL,
///     description TEXT    NOT NULL DEFAULT '',
///     completed   BOOLEAN NOT NULL DEFAULT 0,
///     created_at  TEXT    NOT NULL,
///     updated_at  TEXT    NOT NULL
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use taskflow_shared::models::task::{CreateTask, Task, UpdateTask};
/// # use sqlx::SqlitePool;
///
/// # async fn example(pool: SqlitePool, owner_id: i64) -> Result<(), sqlx::Error> {
/// let task = Task::create(&pool, CreateTask {
///     user_id: owner_id,
///     title: "Buy milk".to_string(),
///     description: String::new(),
/// }).await?;
///
/// let patch = UpdateTask { completed: Some(true), ..Default::default() };
/// let updated = Task::update_owned(&pool, owner_id, task.id, patch).await?;
/// assert!(updated.map(|t| t.completed).unwrap_or(false));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    pub title: String,

    /// Free text, empty when not given
    pub description: String,

    pub completed: bool,

    pub created_at: DateTime<Utc>,

    /// Refreshed by every update and toggle
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub user_id: i64,
    pub title: String,
    pub description: String,
}

/// Partial update; `None` fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl Task {
    /// Creates a new, not yet completed task
    pub async fn create(pool: &SqlitePool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let now = Utc::now();

        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (user_id, title, description, completed, created_at, updated_at)
            VALUES (?, ?, ?, 0, ?, ?)
            RETURNING id, user_id, title, description, completed, created_at, updated_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.title)
        .bind(data.description)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Lists a user's tasks, newest first
    pub async fn list_by_owner(pool: &SqlitePool, owner_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, completed, created_at, updated_at
            FROM tasks
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Finds a task only if `owner_id` owns it
    pub async fn find_owned(
        pool: &SqlitePool,
        owner_id: i64,
        task_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, completed, created_at, updated_at
            FROM tasks
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Applies a partial update to an owned task
    ///
    /// `updated_at` always advances, even for an empty patch.
    pub async fn update_owned(
        pool: &SqlitePool,
        owner_id: i64,
        task_id: i64,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = COALESCE(?, title),
                description = COALESCE(?, description),
                completed = COALESCE(?, completed),
                updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING id, user_id, title, description, completed, created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.completed)
        .bind(Utc::now())
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Flips the completion flag of an owned task
    pub async fn toggle_owned(
        pool: &SqlitePool,
        owner_id: i64,
        task_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET completed = NOT completed, updated_at = ?
            WHERE id = ? AND user_id = ?
            RETURNING id, user_id, title, description, completed, created_at, updated_at
            "#,
        )
        .bind(Utc::now())
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Deletes an owned task
    ///
    /// Returns true if a row was deleted.
    pub async fn delete_owned(pool: &SqlitePool, owner_id: i64, task_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
            .bind(task_id)
            .bind(owner_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Counts a user's tasks
    pub async fn count_by_owner(pool: &SqlitePool, owner_id: i64) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE user_id = ?")
            .bind(owner_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
