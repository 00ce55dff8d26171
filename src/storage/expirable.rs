use std::{cmp::Ordering, collections::BinaryHeap};

use tokio::time::Instant;

use crate::key::CacheKey;

/// A key and the expiry it was written with. Ordered so the heap yields the
/// earliest expiry first.
#[derive(Debug)]
struct Expirable {
    key: CacheKey,
    expires_at: Instant,
}

impl PartialEq for Expirable {
    fn eq(&self, other: &Self) -> bool {
        self.expires_at == other.expires_at
    }
}

impl Eq for Expirable {}

impl Ord for Expirable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.expires_at.cmp(&other.expires_at).reverse()
    }
}

impl PartialOrd for Expirable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

type PriorityQueue = BinaryHeap<Expirable>;

/// Expiry records in deadline order.
///
/// Records are never updated: rewriting a key pushes a second record, and
/// callers compare a popped record against the live entry before acting on it.
#[derive(Debug, Default)]
pub struct ExpirationController {
    queue: PriorityQueue,
}

impl ExpirationController {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
        }
    }

    pub fn add_expiration(&mut self, key: CacheKey, expires_at: Instant) {
        self.queue.push(Expirable { key, expires_at });
    }

    /// Pops the earliest record if it has expired by `now`.
    pub fn pop_expired(&mut self, now: Instant) -> Option<(CacheKey, Instant)> {
        match self.queue.peek() {
            Some(next) if next.expires_at <= now => self.pop(),
            _ => None,
        }
    }

    /// Pops the earliest record regardless of its deadline.
    pub fn pop(&mut self) -> Option<(CacheKey, Instant)> {
        self.queue.pop().map(|e| (e.key, e.expires_at))
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::key::FnId;

    fn key(n: u32) -> CacheKey {
        CacheKey::new(FnId::named("f"), &(n,)).unwrap()
    }

    #[test]
    fn pops_in_deadline_order() {
        let now = Instant::now();
        let mut ctl = ExpirationController::new();
        ctl.add_expiration(key(3), now + Duration::from_secs(3));
        ctl.add_expiration(key(1), now + Duration::from_secs(1));
        ctl.add_expiration(key(2), now + Duration::from_secs(2));

        let order: Vec<CacheKey> = std::iter::from_fn(|| ctl.pop().map(|(k, _)| k)).collect();
        assert_eq!(order, vec![key(1), key(2), key(3)]);
    }

    #[test]
    fn pop_expired_respects_deadline() {
        let now = Instant::now();
        let mut ctl = ExpirationController::new();
        ctl.add_expiration(key(1), now + Duration::from_secs(1));
        ctl.add_expiration(key(5), now + Duration::from_secs(5));

        assert!(ctl.pop_expired(now).is_none());

        let later = now + Duration::from_secs(2);
        assert_eq!(ctl.pop_expired(later).map(|(k, _)| k), Some(key(1)));
        assert!(ctl.pop_expired(later).is_none());
        assert_eq!(ctl.pop().map(|(k, _)| k), Some(key(5)));
        assert!(ctl.pop().is_none());
    }
}
