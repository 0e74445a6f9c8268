//! Storage seams for users and tasks
//!
//! The admission controller and the HTTP layer only see the [`UserDirectory`]
//! and [`TaskStore`] traits. Two backends implement both:
//!
//! - [`postgres::PgStore`]: durable, backed by a sqlx connection pool
//! - [`memory::MemoryStore`]: process-local, used for tests and for running
//!   without a database
//!
//! The backend is picked by an explicit [`StorageConfig`] handed to
//! [`Storage::connect`]; there is no global registry.
//!
//! # Example
//!
//! ```
//! use dailytodo_shared::store::{Storage, StorageConfig};
//!
//! # async fn example() -> Result<(), dailytodo_shared::store::StoreError> {
//! let storage = Storage::connect(&StorageConfig::Memory).await?;
//! assert!(storage.users.lookup(1).await?.is_none());
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod postgres;

use crate::db::migrations::run_migrations;
use crate::db::pool::{close_pool, create_pool, DatabaseConfig};
use crate::models::task::Task;
use crate::models::user::{CreateUser, UpdateUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::ops::Range;
use std::sync::Arc;
use tracing::info;

/// Storage failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A user with this id already exists
    #[error("User {0} already exists")]
    UserExists(i64),

    /// The backing store could not be reached or rejected the query
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Schema migration failed at startup
    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Storage result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Lookup and management of users
///
/// From the admission controller's point of view this is read-only; the
/// mutating methods serve the user CRUD surface.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Finds a user, `Ok(None)` when no row matches
    async fn lookup(&self, user_id: i64) -> StoreResult<Option<User>>;

    /// All users ordered by id
    async fn list(&self) -> StoreResult<Vec<User>>;

    /// Creates a user, failing with [`StoreError::UserExists`] on a taken id
    async fn create(&self, data: CreateUser, now: DateTime<Utc>) -> StoreResult<User>;

    /// Updates a user, `Ok(None)` if it doesn't exist
    async fn update(
        &self,
        user_id: i64,
        data: UpdateUser,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>>;

    /// Deletes a user, returning whether a row was removed
    async fn delete(&self, user_id: i64) -> StoreResult<bool>;

    /// Deletes a user together with all of their tasks, atomically
    ///
    /// Returns the number of tasks removed, or `Ok(None)` if the user doesn't
    /// exist. On error nothing is removed.
    async fn delete_cascade(&self, user_id: i64) -> StoreResult<Option<u64>>;
}

/// Ordered per-user task collection
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Number of `user_id`'s tasks with `created_at` in `day` (half-open)
    async fn count_for_user_on_day(
        &self,
        user_id: i64,
        day: Range<DateTime<Utc>>,
    ) -> StoreResult<i64>;

    /// Inserts a task with `created_at = updated_at = now`
    async fn insert(&self, user_id: i64, text: &str, now: DateTime<Utc>) -> StoreResult<Task>;

    /// A user's tasks in insertion order
    async fn list_for_user(&self, user_id: i64) -> StoreResult<Vec<Task>>;

    /// Finds a task, `Ok(None)` when absent
    async fn get_by_id(&self, task_id: i64) -> StoreResult<Option<Task>>;

    /// Replaces a task's text, `Ok(None)` when absent
    async fn update(
        &self,
        task_id: i64,
        text: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Task>>;

    /// Deletes a task, returning whether it existed
    async fn delete(&self, task_id: i64) -> StoreResult<bool>;

    /// Deletes all of a user's tasks, returning how many were removed
    async fn delete_all_for_user(&self, user_id: i64) -> StoreResult<u64>;

    /// Connectivity check
    async fn ping(&self) -> StoreResult<()>;
}

/// Which backend to build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    /// Process-local storage; data is lost on exit
    Memory,

    /// PostgreSQL; migrations are applied on connect
    Postgres(DatabaseConfig),
}

impl StorageConfig {
    /// Short backend name for logs and health output
    pub fn backend_name(&self) -> &'static str {
        match self {
            StorageConfig::Memory => "memory",
            StorageConfig::Postgres(_) => "postgres",
        }
    }
}

/// Connected storage handles
#[derive(Clone)]
pub struct Storage {
    /// User directory
    pub users: Arc<dyn UserDirectory>,

    /// Task store
    pub tasks: Arc<dyn TaskStore>,

    pool: Option<PgPool>,
}

impl Storage {
    /// Builds the backend described by `config`
    ///
    /// # Errors
    ///
    /// For PostgreSQL, fails if the pool cannot be created or migrations fail.
    pub async fn connect(config: &StorageConfig) -> StoreResult<Self> {
        info!(backend = config.backend_name(), "Connecting storage");

        match config {
            StorageConfig::Memory => Ok(Self::from_memory(memory::MemoryStore::new())),
            StorageConfig::Postgres(db) => {
                let pool = create_pool(db.clone()).await?;
                run_migrations(&pool).await?;

                let store = Arc::new(postgres::PgStore::new(pool.clone()));
                Ok(Self {
                    users: store.clone(),
                    tasks: store,
                    pool: Some(pool),
                })
            }
        }
    }

    /// Wraps an existing in-memory store
    pub fn from_memory(store: memory::MemoryStore) -> Self {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            tasks: store,
            pool: None,
        }
    }

    /// Releases backend resources
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            close_pool(pool).await;
        }
    }
}
