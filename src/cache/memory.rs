use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::{CacheKey, PageCache};

struct Entry {
    value: Value,
    stored_at: Instant,
}

/// In-process [`PageCache`].
///
/// With a TTL, entries older than the TTL read as misses and are dropped
/// on the next write or [`purge_expired`](Self::purge_expired). Without
/// one, entries live until overwritten.
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, Entry>>,
    ttl: Option<Duration>,
}

impl MemoryCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(Some(ttl))
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    fn is_live(&self, entry: &Entry, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.duration_since(entry.stored_at) < ttl,
            None => true,
        }
    }

    /// Drops expired entries, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| self.is_live(entry, now));
        before - entries.len()
    }

    /// Number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl PageCache for MemoryCache {
    async fn get(&self, scope: &str, name: &str) -> Option<Value> {
        let key = CacheKey::new(scope, name);
        let entries = self.entries.read().await;
        let entry = entries.get(&key)?;
        if self.is_live(entry, Instant::now()) {
            Some(entry.value.clone())
        } else {
            debug!(key = %key, "cache entry expired");
            None
        }
    }

    async fn set(&self, scope: &str, name: &str, value: Value) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| self.is_live(entry, now));
        entries.insert(
            CacheKey::new(scope, name),
            Entry {
                value,
                stored_at: now,
            },
        );
    }
}
