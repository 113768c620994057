use crate::workspace::ServerId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-server mutual exclusion for mutating operations.
///
/// Operations on different servers never contend. The map entry for an id is
/// dropped once nobody holds or waits on its lock.
#[derive(Debug, Clone, Default)]
pub struct ServerLocks {
    inner: Arc<Mutex<HashMap<ServerId, Arc<AsyncMutex<()>>>>>,
}

impl ServerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`. Released when the guard drops.
    pub async fn acquire(&self, id: &ServerId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock();
            map.retain(|_, lock| Arc::strong_count(lock) > 1);
            map.entry(id.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of ids with a live lock entry.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn id(s: &str) -> ServerId {
        ServerId::new(s).unwrap()
    }

    #[tokio::test]
    async fn same_id_is_serialized() {
        let locks = ServerLocks::new();
        let guard = locks.acquire(&id("alpha")).await;

        let locks2 = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = locks2.acquire(&id("alpha")).await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_ids_do_not_contend() {
        let locks = ServerLocks::new();
        let _a = locks.acquire(&id("alpha")).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(&id("beta"))).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = ServerLocks::new();
        drop(locks.acquire(&id("alpha")).await);
        drop(locks.acquire(&id("beta")).await);
        let _c = locks.acquire(&id("gamma")).await;
        assert_eq!(locks.len(), 1);
    }
}
