//! Page-data cache: an injected `(scope, name) -> JSON` store.
//!
//! [`PageCache`] is the seam loaders depend on. [`MemoryCache`] is the
//! in-process implementation with an optional TTL, and [`SingleFlight`]
//! keeps concurrent misses on the same key down to one upstream call.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

mod memory;
mod single_flight;

pub use memory::MemoryCache;
pub use single_flight::{FlightGuard, SingleFlight};

/// Identifies one cached value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub scope: String,
    pub name: String,
}

impl CacheKey {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.name)
    }
}

/// Key-value store for post-processed page data.
#[async_trait]
pub trait PageCache: Send + Sync {
    /// Returns the live value under `(scope, name)`, if any.
    async fn get(&self, scope: &str, name: &str) -> Option<Value>;

    /// Stores `value` under `(scope, name)`, replacing any previous value.
    async fn set(&self, scope: &str, name: &str, value: Value);
}
