//! PostgreSQL storage backend
//!
//! Thin adapter from the storage traits onto the model functions in
//! [`crate::models`]. Errors from sqlx are reported as
//! [`StoreError::Unavailable`], except unique violations on user ids.

use super::{StoreError, StoreResult, TaskStore, UserDirectory};
use crate::db::pool::health_check;
use crate::models::task::Task;
use crate::models::user::{CreateUser, UpdateUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::ops::Range;

/// PostgreSQL-backed user directory and task store
#[derive(Debug, Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    /// Wraps an existing pool; the schema must already be migrated
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn lookup(&self, user_id: i64) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.db, user_id).await?)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        Ok(User::list(&self.db).await?)
    }

    async fn create(&self, data: CreateUser, now: DateTime<Utc>) -> StoreResult<User> {
        let id = data.id;
        match User::create(&self.db, data, now).await {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::UserExists(id))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn update(
        &self,
        user_id: i64,
        data: UpdateUser,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        Ok(User::update(&self.db, user_id, data, now).await?)
    }

    async fn delete(&self, user_id: i64) -> StoreResult<bool> {
        Ok(User::delete(&self.db, user_id).await?)
    }

    async fn delete_cascade(&self, user_id: i64) -> StoreResult<Option<u64>> {
        Ok(User::delete_with_tasks(&self.db, user_id).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn count_for_user_on_day(
        &self,
        user_id: i64,
        day: Range<DateTime<Utc>>,
    ) -> StoreResult<i64> {
        Ok(Task::count_created_between(&self.db, user_id, day).await?)
    }

    async fn insert(&self, user_id: i64, text: &str, now: DateTime<Utc>) -> StoreResult<Task> {
        Ok(Task::create(&self.db, user_id, text, now).await?)
    }

    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_user(&self.db, user_id).await?)
    }

    async fn get_by_id(&self, task_id: i64) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.db, task_id).await?)
    }

    async fn update(
        &self,
        task_id: i64,
        text: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        Ok(Task::update_text(&self.db, task_id, text, now).await?)
    }

    async fn delete(&self, task_id: i64) -> StoreResult<bool> {
        Ok(Task::delete(&self.db, task_id).await?)
    }

    async fn delete_all_for_user(&self, user_id: i64) -> StoreResult<u64> {
        Ok(Task::delete_by_user(&self.db, user_id).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.db).await?)
    }
}
