use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// One async mutex per key (pool id, ship id). Holding the guard serializes
/// read-check-write sequences for that key while other keys proceed.
/// An entry lives only while some caller holds or waits on it.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<LockMap>,
}

/// Held lock for one key. Dropping it releases the key and forgets the
/// entry when no other caller is queued on it.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.owner.map();
        // the map's own Arc is the only one left
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, LockMap> {
        // poisoned only if a holder panicked while inserting; the map itself stays usable
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let lock = self
            .map()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        KeyGuard {
            owner: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Drop entries nobody is waiting on.
    pub fn prune(&self) {
        self.map().retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
