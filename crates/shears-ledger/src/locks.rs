//! # Per-Product Locks
//!
//! Serializes read-check-write sequences on a product row.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  cart A: [pomade, wax]          cart B: [wax, comb]                     │
//! │                                                                         │
//! │  lock_many(sorted, deduped)     lock_many(sorted, deduped)              │
//! │    comb?  no                      comb   ✓                              │
//! │    pomade ✓                       pomade? no                            │
//! │    wax    ✓ ─────────────────►    wax    waits for A                    │
//! │                                                                         │
//! │  every caller takes ids in the same order → no cycles                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Locks are taken before a connection is acquired and released when the
//! returned guard set drops, after the transaction has committed or rolled
//! back.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

type Registry = Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Registry of one async mutex per product id.
///
/// An entry lives only while some caller holds or waits on it, so ids that
/// never match a product do not accumulate.
#[derive(Debug, Clone, Default)]
pub struct ProductLocks {
    registry: Registry,
}

/// Held locks. Dropping releases them and prunes idle registry entries.
#[derive(Debug)]
pub struct ProductLockSet {
    ids: Vec<String>,
    guards: Vec<OwnedMutexGuard<()>>,
    registry: Registry,
}

impl ProductLockSet {
    /// Locked ids in acquisition order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

impl Drop for ProductLockSet {
    fn drop(&mut self) {
        self.guards.clear();

        let mut map = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        for id in &self.ids {
            // Only the registry's own handle left: nobody holds or awaits it.
            if map.get(id).is_some_and(|handle| Arc::strong_count(handle) == 1) {
                map.remove(id);
            }
        }
    }
}

impl ProductLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, id: &str) -> Arc<Mutex<()>> {
        let mut map = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Ids currently present in the registry.
    pub fn tracked(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub async fn lock(&self, id: &str) -> ProductLockSet {
        self.lock_many([id]).await
    }

    /// Locks every id in sorted order, each at most once.
    ///
    /// The set is built before the first await, so a cancelled acquisition
    /// still releases and prunes whatever it had taken.
    pub async fn lock_many<I, S>(&self, ids: I) -> ProductLockSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ordered: BTreeSet<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();

        let mut set = ProductLockSet {
            guards: Vec::with_capacity(ordered.len()),
            ids: ordered.into_iter().collect(),
            registry: Arc::clone(&self.registry),
        };

        for i in 0..set.ids.len() {
            let handle = self.handle(&set.ids[i]);
            let guard = handle.lock_owned().await;
            set.guards.push(guard);
        }

        trace!(count = set.ids.len(), "Product locks acquired");
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sorted_and_deduplicated() {
        let locks = ProductLocks::new();
        let set = locks.lock_many(["wax", "comb", "wax", "pomade"]).await;
        assert_eq!(set.ids(), ["comb", "pomade", "wax"]);
    }

    #[tokio::test]
    async fn test_second_holder_waits() {
        let locks = ProductLocks::new();
        let held = locks.lock("p-1").await;

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _set = contender.lock("p-1").await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_registry_pruned_after_release() {
        let locks = ProductLocks::new();
        let set = locks.lock_many(["ghost-1", "ghost-2"]).await;
        assert_eq!(locks.tracked(), 2);
        drop(set);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_entry_kept_while_someone_waits() {
        let locks = ProductLocks::new();
        let held = locks.lock("p-1").await;

        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _set = contender.lock("p-1").await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        drop(held);
        assert_eq!(locks.tracked(), 1);

        waiter.await.unwrap();
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_acquisition_leaves_nothing_behind() {
        let locks = ProductLocks::new();
        let held = locks.lock("b").await;

        let pending = tokio::time::timeout(Duration::from_millis(30), locks.lock_many(["a", "b"])).await;
        assert!(pending.is_err());

        drop(held);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_disjoint_ids_do_not_block() {
        let locks = ProductLocks::new();
        let _a = locks.lock("p-1").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("p-2")).await;
        assert!(b.is_ok());
    }
}
