//! Task model and database operations
//!
//! A task is a short piece of text owned by exactly one user. Its `created_at`
//! timestamp decides which calendar day it counts against for quota purposes
//! and never changes after insert.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE todo_tasks (
//!     id BIGSERIAL PRIMARY KEY,
//!     user_id BIGINT NOT NULL,
//!     task TEXT NOT NULL CHECK (length(btrim(task)) > 0),
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! ```
//!
//! Quota enforcement does not go through these functions directly; see
//! [`crate::quota::QuotaEnforcer`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::ops::Range;

/// A single todo item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Store-assigned identifier
    pub id: i64,

    /// Owning user
    pub user_id: i64,

    /// Task text, never blank
    pub task: String,

    /// When the task was admitted; fixes the quota day
    pub created_at: DateTime<Utc>,

    /// When the text was last changed
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Inserts a task stamped with `now`
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO todo_tasks (user_id, task, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING id, user_id, task, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(text)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, task, created_at, updated_at
            FROM todo_tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Lists a user's tasks in insertion order
    pub async fn list_by_user(pool: &PgPool, user_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, task, created_at, updated_at
            FROM todo_tasks
            WHERE user_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Counts a user's tasks created within `range` (half-open)
    pub async fn count_created_between(
        pool: &PgPool,
        user_id: i64,
        range: Range<DateTime<Utc>>,
    ) -> Result<i64, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM todo_tasks
            WHERE user_id = $1 AND created_at >= $2 AND created_at < $3
            "#,
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Replaces a task's text
    ///
    /// # Returns
    ///
    /// The updated task, None if it doesn't exist
    pub async fn update_text(
        pool: &PgPool,
        id: i64,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE todo_tasks
            SET task = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, user_id, task, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(text)
        .bind(now)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Deletes a task by ID
    ///
    /// # Returns
    ///
    /// True if a row was removed
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todo_tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every task owned by `user_id`
    ///
    /// # Returns
    ///
    /// Number of rows removed
    pub async fn delete_by_user(pool: &PgPool, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todo_tasks WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Whether the task belongs to `user_id`
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}
