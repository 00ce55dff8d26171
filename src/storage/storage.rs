use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::time::Instant;

use super::{expirable::ExpirationController, CacheEntry, Lookup};
use crate::key::CacheKey;

#[derive(Debug, Default)]
struct Table {
    entries: HashMap<CacheKey, CacheEntry>,
    expirations: ExpirationController,
}

impl Table {
    /// Removes every entry whose recorded expiry has passed. Records left
    /// behind by refreshed or already removed entries are discarded.
    fn drain_expired(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        while let Some((key, expires_at)) = self.expirations.pop_expired(now) {
            if self.remove_if_expiring_at(&key, expires_at) {
                removed += 1;
            }
        }
        removed
    }

    fn evict_earliest(&mut self) -> Option<CacheKey> {
        while let Some((key, expires_at)) = self.expirations.pop() {
            if self.remove_if_expiring_at(&key, expires_at) {
                return Some(key);
            }
        }
        None
    }

    fn remove_if_expiring_at(&mut self, key: &CacheKey, expires_at: Instant) -> bool {
        match self.entries.get(key) {
            Some(entry) if entry.expires_at() == expires_at => {
                self.entries.remove(key);
                true
            }
            _ => false,
        }
    }
}

/// The cache table: a key-to-entry map shared by every caller of one cache.
///
/// A single reader-writer lock covers the map and its expiration queue.
/// Lookups share the lock; every mutation takes it exclusively.
#[derive(Debug)]
pub struct Storage {
    table: RwLock<Table>,
    capacity: Option<usize>,
}

impl Storage {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            table: RwLock::new(Table::default()),
            capacity,
        }
    }

    pub fn read(&self, key: &CacheKey, now: Instant) -> Lookup {
        match self.table.read().entries.get(key) {
            Some(entry) if entry.is_fresh(now) => Lookup::Fresh(entry.value().clone()),
            Some(_) => Lookup::Stale,
            None => Lookup::Missing,
        }
    }

    /// Removes the entry for `key` if it is still stale at `now`. Another
    /// caller may have refreshed it since it was read.
    pub fn evict_stale(&self, key: &CacheKey, now: Instant) -> bool {
        let mut table = self.table.write();
        match table.entries.get(key) {
            Some(entry) if !entry.is_fresh(now) => {
                table.entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Stores `entry` under `key`, replacing any previous entry. Returns how
    /// many other entries were dropped to make room or because they expired.
    pub fn write(&self, key: CacheKey, entry: CacheEntry, now: Instant) -> usize {
        let mut table = self.table.write();
        let mut removed = table.drain_expired(now);

        if let Some(capacity) = self.capacity {
            if !table.entries.contains_key(&key) {
                while table.entries.len() >= capacity {
                    match table.evict_earliest() {
                        Some(_) => removed += 1,
                        None => break,
                    }
                }
            }
        }

        table.expirations.add_expiration(key.clone(), entry.expires_at());
        table.entries.insert(key, entry);

        removed
    }

    pub fn purge_expired(&self, now: Instant) -> usize {
        self.table.write().drain_expired(now)
    }

    pub fn len(&self) -> usize {
        self.table.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut table = self.table.write();
        table.entries.clear();
        table.expirations.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::key::FnId;

    fn key(n: u32) -> CacheKey {
        CacheKey::new(FnId::named("f"), &(n,)).unwrap()
    }

    fn entry(v: u32, expires_at: Instant) -> CacheEntry {
        CacheEntry::new(Arc::new(v), expires_at)
    }

    fn value_of(lookup: Lookup) -> Option<u32> {
        match lookup {
            Lookup::Fresh(v) => v.downcast_ref::<u32>().copied(),
            _ => None,
        }
    }

    #[test]
    fn read_classifies_entries() {
        let now = Instant::now();
        let storage = Storage::new(None);
        storage.write(key(1), entry(10, now + Duration::from_secs(5)), now);

        assert_eq!(value_of(storage.read(&key(1), now)), Some(10));
        assert!(matches!(storage.read(&key(2), now), Lookup::Missing));
        assert!(matches!(
            storage.read(&key(1), now + Duration::from_secs(5)),
            Lookup::Stale
        ));
    }

    #[test]
    fn evict_stale_leaves_refreshed_entries() {
        let now = Instant::now();
        let later = now + Duration::from_secs(6);
        let storage = Storage::new(None);
        storage.write(key(1), entry(1, now + Duration::from_secs(5)), now);
        storage.write(key(1), entry(2, later + Duration::from_secs(5)), later);

        assert!(!storage.evict_stale(&key(1), later));
        assert_eq!(value_of(storage.read(&key(1), later)), Some(2));
    }

    #[test]
    fn writes_drain_expired_entries() {
        let now = Instant::now();
        let storage = Storage::new(None);
        storage.write(key(1), entry(1, now + Duration::from_secs(1)), now);
        storage.write(key(2), entry(2, now + Duration::from_secs(10)), now);

        let later = now + Duration::from_secs(2);
        let removed = storage.write(key(3), entry(3, later + Duration::from_secs(1)), later);
        assert_eq!(removed, 1);
        assert_eq!(storage.len(), 2);
        assert!(matches!(storage.read(&key(1), later), Lookup::Missing));
    }

    #[test]
    fn refreshed_entry_survives_old_expiry_record() {
        let now = Instant::now();
        let storage = Storage::new(None);
        storage.write(key(1), entry(1, now + Duration::from_secs(1)), now);

        let t1 = now + Duration::from_secs(2);
        storage.evict_stale(&key(1), t1);
        storage.write(key(1), entry(2, t1 + Duration::from_secs(5)), t1);

        assert_eq!(storage.purge_expired(t1 + Duration::from_secs(1)), 0);
        assert_eq!(value_of(storage.read(&key(1), t1)), Some(2));
    }

    #[test]
    fn capacity_evicts_earliest_expiry() {
        let now = Instant::now();
        let storage = Storage::new(Some(2));
        storage.write(key(1), entry(1, now + Duration::from_secs(3)), now);
        storage.write(key(2), entry(2, now + Duration::from_secs(1)), now);

        let removed = storage.write(key(3), entry(3, now + Duration::from_secs(5)), now);
        assert_eq!(removed, 1);
        assert_eq!(storage.len(), 2);
        assert!(matches!(storage.read(&key(2), now), Lookup::Missing));
        assert_eq!(value_of(storage.read(&key(1), now)), Some(1));

        // overwriting an existing key never evicts
        let removed = storage.write(key(1), entry(9, now + Duration::from_secs(5)), now);
        assert_eq!(removed, 0);
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn clear_drops_everything() {
        let now = Instant::now();
        let storage = Storage::new(None);
        storage.write(key(1), entry(1, now + Duration::from_secs(3)), now);
        storage.clear();
        assert!(storage.is_empty());
        assert_eq!(storage.purge_expired(now + Duration::from_secs(10)), 0);
    }
}
