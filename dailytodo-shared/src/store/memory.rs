//! In-memory storage backend
//!
//! Keeps users and tasks in ordered maps behind a single `tokio::sync::RwLock`.
//! Task ids come from a monotonically increasing counter, so iterating the
//! task map yields insertion order.

use super::{StoreError, StoreResult, TaskStore, UserDirectory};
use crate::models::task::Task;
use crate::models::user::{CreateUser, UpdateUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::ops::Range;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    next_task_id: i64,
}

/// Process-local user directory and task store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn lookup(&self, user_id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn create(&self, data: CreateUser, now: DateTime<Utc>) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(&data.id) {
            return Err(StoreError::UserExists(data.id));
        }

        let user = User::new(data, now);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(
        &self,
        user_id: i64,
        data: UpdateUser,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&user_id).map(|user| {
            user.apply(data, now);
            user.clone()
        }))
    }

    async fn delete(&self, user_id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.users.remove(&user_id).is_some())
    }

    async fn delete_cascade(&self, user_id: i64) -> StoreResult<Option<u64>> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&user_id).is_none() {
            return Ok(None);
        }

        let before = tables.tasks.len();
        tables.tasks.retain(|_, task| task.user_id != user_id);
        Ok(Some((before - tables.tasks.len()) as u64))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn count_for_user_on_day(
        &self,
        user_id: i64,
        day: Range<DateTime<Utc>>,
    ) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .tasks
            .values()
            .filter(|task| task.user_id == user_id && day.contains(&task.created_at))
            .count();

        Ok(count as i64)
    }

    async fn insert(&self, user_id: i64, text: &str, now: DateTime<Utc>) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        tables.next_task_id += 1;

        let task = Task {
            id: tables.next_task_id,
            user_id,
            task: text.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .values()
            .filter(|task| task.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, task_id: i64) -> StoreResult<Option<Task>> {
        Ok(self.tables.read().await.tasks.get(&task_id).cloned())
    }

    async fn update(
        &self,
        task_id: i64,
        text: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.write().await;
        Ok(tables.tasks.get_mut(&task_id).map(|task| {
            task.task = text.to_string();
            task.updated_at = now;
            task.clone()
        }))
    }

    async fn delete(&self, task_id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.tasks.remove(&task_id).is_some())
    }

    async fn delete_all_for_user(&self, user_id: i64) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.tasks.len();
        tables.tasks.retain(|_, task| task.user_id != user_id);
        Ok((before - tables.tasks.len()) as u64)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
