//! Per-player exclusive scopes
//!
//! Two syncs of the same player run one after the other; different players
//! never wait on each other. Entries are held weakly and pruned on acquire.

use genji_common::models::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct PlayerLocks {
    inner: Mutex<HashMap<UserId, Weak<Mutex<()>>>>,
}

impl PlayerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`
    pub async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            locks.retain(|_, entry| entry.strong_count() > 0);

            match locks.get(&user_id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(Mutex::new(()));
                    locks.insert(user_id, Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Players with a held or awaited lock
    pub async fn tracked(&self) -> usize {
        let locks = self.inner.lock().await;
        locks.values().filter(|entry| entry.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_same_player_waits() {
        let locks = PlayerLocks::new();
        let guard = locks.acquire(1).await;

        assert!(timeout(Duration::from_millis(20), locks.acquire(1))
            .await
            .is_err());

        drop(guard);
        assert!(timeout(Duration::from_millis(200), locks.acquire(1))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_other_players_proceed() {
        let locks = PlayerLocks::new();
        let _held = locks.acquire(1).await;

        assert!(timeout(Duration::from_millis(200), locks.acquire(2))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_released_entries_pruned() {
        let locks = PlayerLocks::new();
        {
            let _a = locks.acquire(1).await;
            let _b = locks.acquire(2).await;
            assert_eq!(locks.tracked().await, 2);
        }
        assert_eq!(locks.tracked().await, 0);
    }
}
