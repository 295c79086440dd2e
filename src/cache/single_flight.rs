use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::CacheKey;

type Slots = Arc<Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>>;

/// Per-key async lock that lets one task at a time fill a cache key.
///
/// Callers check the cache, [`acquire`](Self::acquire) on a miss, then
/// check the cache again before going upstream: whoever waited behind the
/// first caller finds the value it stored.
#[derive(Clone, Default)]
pub struct SingleFlight {
    slots: Slots,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds `key`, then holds it until the
    /// returned guard drops.
    pub async fn acquire(&self, key: &CacheKey) -> FlightGuard {
        let lock = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        let guard = lock.lock_owned().await;
        FlightGuard {
            key: key.clone(),
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn in_flight(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Holds a [`SingleFlight`] key. Dropping it releases the key and removes
/// its slot once nobody else is waiting.
pub struct FlightGuard {
    key: CacheKey,
    slots: Slots,
    guard: Option<OwnedMutexGuard<()>>,
}

impl FlightGuard {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        // Release first so the count below only sees the map and any waiters.
        drop(self.guard.take());
        let idle = slots
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            slots.remove(&self.key);
        }
    }
}
