//! Per-user admission locks
//!
//! Each user id maps to its own async mutex. Holding a user's guard serializes
//! everything that reads or changes that user's daily count, while admissions
//! for different users proceed in parallel.
//!
//! The registry map itself sits behind a short-lived `std::sync::Mutex` that
//! is never held across an `.await`. Entries are weak, so a user's mutex is
//! freed once the last guard for it drops; dead entries are swept lazily.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

/// Sweep dead entries once the map grows past this many slots
const SWEEP_THRESHOLD: usize = 1024;

/// Exclusive hold on one user's admission path; released on drop
#[derive(Debug)]
pub struct UserGuard {
    user_id: i64,
    _guard: OwnedMutexGuard<()>,
}

impl UserGuard {
    /// The user this guard serializes
    pub fn user_id(&self) -> i64 {
        self.user_id
    }
}

#[derive(Debug, Default)]
struct Registry {
    slots: HashMap<i64, Weak<AsyncMutex<()>>>,
    sweep_at: usize,
}

/// Registry of per-user mutexes
///
/// Cloning is cheap and clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct UserLocks {
    registry: Arc<Mutex<Registry>>,
}

impl UserLocks {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `user_id`
    pub async fn acquire(&self, user_id: i64) -> UserGuard {
        let mutex = self.slot(user_id);
        let guard = mutex.lock_owned().await;
        trace!(user_id, "Acquired user lock");

        UserGuard {
            user_id,
            _guard: guard,
        }
    }

    /// Number of users with a live mutex (held or awaited)
    pub fn active(&self) -> usize {
        let registry = self.registry.lock().unwrap_or_else(|p| p.into_inner());
        registry
            .slots
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }

    fn slot(&self, user_id: i64) -> Arc<AsyncMutex<()>> {
        let mut registry = self.registry.lock().unwrap_or_else(|p| p.into_inner());

        if let Some(existing) = registry.slots.get(&user_id).and_then(Weak::upgrade) {
            return existing;
        }

        let fresh = Arc::new(AsyncMutex::new(()));
        registry.slots.insert(user_id, Arc::downgrade(&fresh));

        if registry.slots.len() > registry.sweep_at.max(SWEEP_THRESHOLD) {
            registry.slots.retain(|_, slot| slot.strong_count() > 0);
            registry.sweep_at = registry.slots.len() * 2;
            trace!(live = registry.slots.len(), "Swept user lock registry");
        }

        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_user_is_exclusive() {
        let locks = UserLocks::new();
        let guard = locks.acquire(1).await;
        assert_eq!(guard.user_id(), 1);

        let contender = tokio::time::timeout(Duration::from_millis(50), locks.acquire(1)).await;
        assert!(contender.is_err(), "second acquire must wait");

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(500), locks.acquire(1)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_different_users_do_not_block() {
        let locks = UserLocks::new();
        let _first = locks.acquire(1).await;

        let other = tokio::time::timeout(Duration::from_millis(500), locks.acquire(2)).await;
        assert!(other.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_released_slots_are_freed() {
        let locks = UserLocks::new();
        {
            let _guard = locks.acquire(9).await;
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_registry_sweeps_dead_entries() {
        let locks = UserLocks::new();
        for user_id in 0..(SWEEP_THRESHOLD as i64 + 10) {
            drop(locks.acquire(user_id).await);
        }

        let slots = locks.registry.lock().unwrap().slots.len();
        assert!(slots <= SWEEP_THRESHOLD, "registry kept {} slots", slots);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_critical_section_never_overlaps() {
        let locks = UserLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let locks = locks.clone();
            let inside = inside.clone();
            let overlaps = overlaps.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(42).await;
                if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                tokio::task::yield_now().await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }
}
