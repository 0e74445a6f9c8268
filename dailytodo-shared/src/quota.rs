//! Daily quota enforcement for task creation
//!
//! Every user carries a `max_tasks_per_day` limit. [`QuotaEnforcer::admit`] is
//! the only way new tasks enter the store; it resolves the user, counts the
//! tasks already created on the current calendar day, and inserts only when
//! the count is below the limit.
//!
//! # Admission
//!
//! ```text
//! Start ──validate──> UserResolved ──count──> CountObtained ──┬─> Admitted
//!   │                     │                        │            └─> Rejected(limit)
//!   └─> Rejected(invalid) └─> Rejected(not found)  └─> Failed(store)
//! ```
//!
//! Resolving, counting and inserting happen while holding the user's entry in
//! [`UserLocks`], so two concurrent admissions for the same user can never both
//! see room under the limit, and a user deleted under the same lock cannot gain
//! a task afterwards. Admissions for different users never wait on each
//! other.
//!
//! # Example
//!
//! ```
//! use dailytodo_shared::clock::{Calendar, SystemClock};
//! use dailytodo_shared::models::user::CreateUser;
//! use dailytodo_shared::quota::{QuotaEnforcer, QuotaError};
//! use dailytodo_shared::store::{Storage, StorageConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Storage::connect(&StorageConfig::Memory).await?;
//! storage
//!     .users
//!     .create(CreateUser { id: 1, name: "Ada".into(), max_tasks_per_day: 1 }, chrono::Utc::now())
//!     .await?;
//!
//! let enforcer = QuotaEnforcer::new(&storage, Arc::new(SystemClock), Calendar::utc());
//!
//! let admitted = enforcer.admit(1, "write report").await?;
//! assert_eq!(admitted.usage.remaining, 0);
//!
//! let second = enforcer.admit(1, "and another").await;
//! assert!(matches!(second, Err(QuotaError::LimitExceeded { .. })));
//! # Ok(())
//! # }
//! ```

use crate::clock::{Calendar, Clock};
use crate::locks::UserLocks;
use crate::models::task::Task;
use crate::models::user::User;
use crate::store::{Storage, StoreError, TaskStore, UserDirectory};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Why an admission did not produce a task
#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    /// User id is not a positive integer
    #[error("Invalid user id: {0}")]
    InvalidUserId(i64),

    /// Task text is empty or whitespace
    #[error("Task cannot be empty")]
    EmptyTask,

    /// No user with this id
    #[error("User {0} not found")]
    UserNotFound(i64),

    /// The user already created `limit` tasks today
    #[error("Daily task limit reached ({current}/{limit})")]
    LimitExceeded {
        /// Tasks already created today
        current: i64,
        /// The user's `max_tasks_per_day`
        limit: i64,
    },

    /// Storage failed; the caller may retry the whole request
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Snapshot of a user's quota for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaCheckResult {
    /// Whether one more task would be admitted
    pub allowed: bool,

    /// The calendar day the counts refer to
    pub day: NaiveDate,

    /// Tasks created on `day`
    pub current: i64,

    /// Maximum allowed per day
    pub limit: i64,

    /// Tasks still allowed on `day`
    pub remaining: i64,
}

impl QuotaCheckResult {
    /// Builds a snapshot from a count and a limit
    pub fn new(day: NaiveDate, current: i64, limit: i64) -> Self {
        QuotaCheckResult {
            allowed: current < limit,
            day,
            current,
            limit,
            remaining: (limit - current).max(0),
        }
    }
}

/// A task that passed admission, with the quota state right after insert
#[derive(Debug, Clone, Serialize)]
pub struct Admitted {
    /// The stored task
    pub task: Task,

    /// Usage including the new task
    pub usage: QuotaCheckResult,
}

/// Quota admission controller
///
/// Cloning shares the same lock registry, so every clone serializes against
/// every other.
#[derive(Clone)]
pub struct QuotaEnforcer {
    users: Arc<dyn UserDirectory>,
    tasks: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    calendar: Calendar,
    locks: UserLocks,
}

impl QuotaEnforcer {
    /// Creates an enforcer over `storage`
    pub fn new(storage: &Storage, clock: Arc<dyn Clock>, calendar: Calendar) -> Self {
        QuotaEnforcer {
            users: storage.users.clone(),
            tasks: storage.tasks.clone(),
            clock,
            calendar,
            locks: UserLocks::new(),
        }
    }

    /// The lock registry guarding admissions
    ///
    /// Other operations that must not interleave with an admission for the
    /// same user (such as deleting the user) take their guard from here.
    pub fn locks(&self) -> &UserLocks {
        &self.locks
    }

    /// The clock used to stamp and bucket tasks
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// The calendar defining day boundaries
    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Admits a new task for `user_id` if today's quota allows it
    ///
    /// The stored text is trimmed.
    ///
    /// # Errors
    ///
    /// - [`QuotaError::InvalidUserId`] / [`QuotaError::EmptyTask`] before any
    ///   store access
    /// - [`QuotaError::UserNotFound`] if the user doesn't exist
    /// - [`QuotaError::LimitExceeded`] if today's count already reached the limit
    /// - [`QuotaError::Store`] if storage fails
    ///
    /// No task is inserted on any error.
    pub async fn admit(&self, user_id: i64, text: &str) -> Result<Admitted, QuotaError> {
        let text = validate(user_id, text)?;

        let _guard = self.locks.acquire(user_id).await;
        let user = self.resolve(user_id).await?;

        let now = self.clock.now();
        let day = self.calendar.date_of(now);
        let current = self
            .tasks
            .count_for_user_on_day(user.id, self.calendar.day_range(day))
            .await?;
        let limit = i64::from(user.max_tasks_per_day);

        if current >= limit {
            info!(user_id, current, limit, %day, "Daily task limit reached");
            return Err(QuotaError::LimitExceeded { current, limit });
        }

        let task = self.tasks.insert(user.id, text, now).await?;
        let usage = QuotaCheckResult::new(day, current + 1, limit);

        info!(
            user_id,
            task_id = task.id,
            current = usage.current,
            limit,
            "Task admitted"
        );

        Ok(Admitted { task, usage })
    }

    /// Today's usage for `user_id`
    ///
    /// Read-only and unlocked; the answer can be stale by the time the caller
    /// acts on it. Only [`admit`](Self::admit) is authoritative.
    pub async fn usage(&self, user_id: i64) -> Result<QuotaCheckResult, QuotaError> {
        if user_id <= 0 {
            return Err(QuotaError::InvalidUserId(user_id));
        }

        let user = self.resolve(user_id).await?;
        let day = self.calendar.today(self.clock.as_ref());
        let current = self
            .tasks
            .count_for_user_on_day(user.id, self.calendar.day_range(day))
            .await?;

        Ok(QuotaCheckResult::new(
            day,
            current,
            i64::from(user.max_tasks_per_day),
        ))
    }

    async fn resolve(&self, user_id: i64) -> Result<User, QuotaError> {
        match self.users.lookup(user_id).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                debug!(user_id, "Admission for unknown user");
                Err(QuotaError::UserNotFound(user_id))
            }
            Err(err) => {
                warn!(user_id, error = %err, "User lookup failed");
                Err(err.into())
            }
        }
    }
}

/// Checks request shape; returns the trimmed text
fn validate(user_id: i64, text: &str) -> Result<&str, QuotaError> {
    if user_id <= 0 {
        return Err(QuotaError::InvalidUserId(user_id));
    }

    let text = text.trim();
    if text.is_empty() {
        return Err(QuotaError::EmptyTask);
    }

    Ok(text)
}
