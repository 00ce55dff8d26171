use std::{any::Any, fmt, sync::Arc};

use tokio::time::Instant;

pub mod storage;

pub mod expirable;

/// A stored result set, erased so one table can hold results of any type.
pub type StoredValue = Arc<dyn Any + Send + Sync>;

/// One computed result and the instant it stops being served.
///
/// Entries are replaced wholesale, never updated in place.
#[derive(Clone)]
pub struct CacheEntry {
    value: StoredValue,
    expires_at: Instant,
}

impl CacheEntry {
    pub fn new(value: StoredValue, expires_at: Instant) -> Self {
        Self { value, expires_at }
    }

    pub fn value(&self) -> &StoredValue {
        &self.value
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Outcome of a table lookup.
#[derive(Debug)]
pub enum Lookup {
    Fresh(StoredValue),
    Stale,
    Missing,
}
