//! User model and database operations
//!
//! A user owns a list of tasks and carries the per-day creation quota that the
//! admission controller enforces. User ids are supplied by the caller at
//! creation time and never change afterwards.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id BIGINT PRIMARY KEY,
//!     name VARCHAR(255) NOT NULL,
//!     max_tasks_per_day INTEGER NOT NULL CHECK (max_tasks_per_day >= 0),
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL
//! );
//! ```
//!
//! # Example
//!
//! ```no_run
//! use dailytodo_shared::models::user::{User, CreateUser};
//! use dailytodo_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::default()).await?;
//!
//! let new_user = CreateUser {
//!     id: 42,
//!     name: "Ada".to_string(),
//!     max_tasks_per_day: 5,
//! };
//!
//! let user = User::create(&pool, new_user, chrono::Utc::now()).await?;
//! println!("Created user: {}", user.id);
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A task owner and their daily quota
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Caller-assigned identifier, unique and immutable
    pub id: i64,

    /// Display name
    pub name: String,

    /// How many tasks may be created per calendar day (0 blocks creation)
    pub max_tasks_per_day: i32,

    /// When the user was created
    pub created_at: DateTime<Utc>,

    /// When the user was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Identifier to assign
    pub id: i64,

    /// Display name
    pub name: String,

    /// Daily task quota, must not be negative
    pub max_tasks_per_day: i32,
}

/// Input for updating an existing user
///
/// Only `Some` fields are changed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    /// New display name
    pub name: Option<String>,

    /// New daily quota; only affects admissions made after the update
    pub max_tasks_per_day: Option<i32>,
}

impl User {
    /// Builds a user record stamped with `now`
    pub fn new(data: CreateUser, now: DateTime<Utc>) -> Self {
        User {
            id: data.id,
            name: data.name,
            max_tasks_per_day: data.max_tasks_per_day,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies `data` in place and refreshes `updated_at`
    pub fn apply(&mut self, data: UpdateUser, now: DateTime<Utc>) {
        if let Some(name) = data.name {
            self.name = name;
        }
        if let Some(max_tasks_per_day) = data.max_tasks_per_day {
            self.max_tasks_per_day = max_tasks_per_day;
        }
        self.updated_at = now;
    }

    /// Inserts a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the id is already taken (unique violation) or the
    /// database cannot be reached.
    pub async fn create(
        pool: &PgPool,
        data: CreateUser,
        now: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, max_tasks_per_day, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, name, max_tasks_per_day, created_at, updated_at
            "#,
        )
        .bind(data.id)
        .bind(data.name)
        .bind(data.max_tasks_per_day)
        .bind(now)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    ///
    /// # Errors
    ///
    /// Returns an error if database connection fails
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, max_tasks_per_day, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Updates an existing user
    ///
    /// Absent fields keep their stored value.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if user doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateUser,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                max_tasks_per_day = COALESCE($3, max_tasks_per_day),
                updated_at = $4
            WHERE id = $1
            RETURNING id, name, max_tasks_per_day, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.max_tasks_per_day)
        .bind(now)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Deletes a user by ID
    ///
    /// Tasks are not touched here; callers that cascade must delete them
    /// separately.
    ///
    /// # Returns
    ///
    /// True if user was deleted, false if user didn't exist
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes a user and all of their tasks in one transaction
    ///
    /// # Returns
    ///
    /// The number of tasks removed, or None if the user didn't exist (in which
    /// case the transaction is rolled back and nothing changes)
    pub async fn delete_with_tasks(pool: &PgPool, id: i64) -> Result<Option<u64>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let deleted_user = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if deleted_user.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let deleted_tasks = sqlx::query("DELETE FROM todo_tasks WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(deleted_tasks.rows_affected()))
    }

    /// Lists all users ordered by id
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, max_tasks_per_day, created_at, updated_at
            FROM users
            ORDER BY id ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(users)
    }
}
