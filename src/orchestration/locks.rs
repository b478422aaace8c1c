use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per router name.
///
/// Mutating operations on the same router run one at a time; different
/// routers never contend.
#[derive(Default)]
pub struct RouterLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RouterLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `router`.
    pub async fn lock(&self, router: &str) -> OwnedMutexGuard<()> {
        // clone out of the map before awaiting so no shard lock is held
        let mutex = self
            .locks
            .entry(router.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        mutex.lock_owned().await
    }

    /// Forget the mutex of a deleted router unless someone still waits on it.
    pub fn release(&self, router: &str) {
        self.locks
            .remove_if(router, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
