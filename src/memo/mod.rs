//! Time-bounded memoization of function calls.
//!
//! A [`Memoizer`] maps a function identity plus its argument values to the
//! result of calling it. A result is served for a fixed TTL after it was
//! computed; after that the next caller recomputes it. Failed calls are never
//! stored.
//!
//! The table lock is only held while looking up or writing entries, never
//! while the function runs. Two callers that miss on the same key at the same
//! time both run the function, and whichever result is written last stays.

use std::{
    any::type_name,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use once_cell::sync::Lazy;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::{
    config::CacheConfig,
    error::{Error, Result},
    key::{CacheKey, FnId},
    storage::{storage::Storage, CacheEntry, Lookup},
};

pub mod sweeper;

pub const DEFAULT_TTL: Duration = Duration::from_secs(6);

/// A callable taking its arguments as one tuple.
///
/// Implemented for every `Fn` of up to eight parameters, so `f(a, b)` is
/// memoized as `cache.call(&f, (a, b))`.
pub trait Memoizable<Args> {
    type Output;

    fn invoke(&self, args: Args) -> Self::Output;
}

macro_rules! impl_memoizable {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg),*> Memoizable<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Out,
        {
            type Output = Out;

            #[allow(non_snake_case)]
            fn invoke(&self, ($($arg,)*): ($($arg,)*)) -> Out {
                (self)($($arg),*)
            }
        }
    };
}

impl_memoizable!();
impl_memoizable!(A);
impl_memoizable!(A, B);
impl_memoizable!(A, B, C);
impl_memoizable!(A, B, C, D);
impl_memoizable!(A, B, C, D, E);
impl_memoizable!(A, B, C, D, E, F);
impl_memoizable!(A, B, C, D, E, F, G);
impl_memoizable!(A, B, C, D, E, F, G, H);

#[derive(Debug, Default)]
struct Stats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Counters since the cache was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// A memoization cache with one TTL for every entry it holds.
#[derive(Debug)]
pub struct Memoizer {
    storage: Storage,
    ttl: Duration,
    stats: Stats,
}

impl Default for Memoizer {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl Memoizer {
    pub fn new(ttl: Duration) -> Self {
        Self::with_capacity(ttl, None)
    }

    /// A cache holding at most `capacity` entries when one is given. A full
    /// cache makes room by dropping the entry closest to expiry.
    pub fn with_capacity(ttl: Duration, capacity: Option<usize>) -> Self {
        Self {
            storage: Storage::new(capacity),
            ttl,
            stats: Stats::default(),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_capacity(config.ttl(), config.max_entries))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Calls `f` with `args`, or returns the result of an identical call made
    /// less than one TTL ago.
    ///
    /// The function is identified by its type, which only works for `fn`
    /// items and closures capturing nothing; see [`FnId::of`]. Anything else
    /// goes through [`Memoizer::call_named`]. Use [`Memoizer::try_call`] for
    /// functions returning `Result`, otherwise their errors are stored like
    /// any other value.
    pub fn call<F, Args>(&self, f: &F, args: Args) -> Result<F::Output>
    where
        F: Memoizable<Args> + 'static,
        F::Output: Clone + Send + Sync + 'static,
        Args: Serialize,
    {
        self.call_named(FnId::of::<F>()?, f, args)
    }

    pub fn call_named<F, Args>(&self, id: impl Into<FnId>, f: &F, args: Args) -> Result<F::Output>
    where
        F: Memoizable<Args>,
        F::Output: Clone + Send + Sync + 'static,
        Args: Serialize,
    {
        let key = CacheKey::new(id.into(), &args)?;
        if let Some(value) = self.lookup(&key)? {
            return Ok(value);
        }

        let value = f.invoke(args);
        self.store(key, value.clone());
        Ok(value)
    }

    /// Like [`Memoizer::call`] for fallible functions. Only `Ok` values are
    /// stored; an `Err` is handed back untouched and the next call runs `f`
    /// again.
    ///
    /// The outer `Result` only reports misuse of the cache.
    pub fn try_call<F, Args, T, E>(&self, f: &F, args: Args) -> Result<std::result::Result<T, E>>
    where
        F: Memoizable<Args, Output = std::result::Result<T, E>> + 'static,
        T: Clone + Send + Sync + 'static,
        Args: Serialize,
    {
        self.try_call_named(FnId::of::<F>()?, f, args)
    }

    pub fn try_call_named<F, Args, T, E>(
        &self,
        id: impl Into<FnId>,
        f: &F,
        args: Args,
    ) -> Result<std::result::Result<T, E>>
    where
        F: Memoizable<Args, Output = std::result::Result<T, E>>,
        T: Clone + Send + Sync + 'static,
        Args: Serialize,
    {
        let key = CacheKey::new(id.into(), &args)?;
        if let Some(value) = self.lookup(&key)? {
            return Ok(Ok(value));
        }

        Ok(self.store_ok(key, f.invoke(args)))
    }

    /// Memoizes a function returning a future. The future is awaited without
    /// holding the table lock.
    pub async fn call_async<F, Args, Fut>(&self, f: &F, args: Args) -> Result<Fut::Output>
    where
        F: Memoizable<Args, Output = Fut> + 'static,
        Fut: Future,
        Fut::Output: Clone + Send + Sync + 'static,
        Args: Serialize,
    {
        self.call_async_named(FnId::of::<F>()?, f, args).await
    }

    pub async fn call_async_named<F, Args, Fut>(
        &self,
        id: impl Into<FnId>,
        f: &F,
        args: Args,
    ) -> Result<Fut::Output>
    where
        F: Memoizable<Args, Output = Fut>,
        Fut: Future,
        Fut::Output: Clone + Send + Sync + 'static,
        Args: Serialize,
    {
        let key = CacheKey::new(id.into(), &args)?;
        if let Some(value) = self.lookup(&key)? {
            return Ok(value);
        }

        let value = f.invoke(args).await;
        self.store(key, value.clone());
        Ok(value)
    }

    pub async fn try_call_async<F, Args, Fut, T, E>(
        &self,
        f: &F,
        args: Args,
    ) -> Result<std::result::Result<T, E>>
    where
        F: Memoizable<Args, Output = Fut> + 'static,
        Fut: Future<Output = std::result::Result<T, E>>,
        T: Clone + Send + Sync + 'static,
        Args: Serialize,
    {
        self.try_call_async_named(FnId::of::<F>()?, f, args).await
    }

    pub async fn try_call_async_named<F, Args, Fut, T, E>(
        &self,
        id: impl Into<FnId>,
        f: &F,
        args: Args,
    ) -> Result<std::result::Result<T, E>>
    where
        F: Memoizable<Args, Output = Fut>,
        Fut: Future<Output = std::result::Result<T, E>>,
        T: Clone + Send + Sync + 'static,
        Args: Serialize,
    {
        let key = CacheKey::new(id.into(), &args)?;
        if let Some(value) = self.lookup(&key)? {
            return Ok(Ok(value));
        }

        Ok(self.store_ok(key, f.invoke(args).await))
    }

    /// Binds `func` to this cache under its type identity.
    pub fn memoize<F: 'static>(self: &Arc<Self>, func: F) -> Result<Memoized<F>> {
        Ok(self.memoize_named(FnId::of::<F>()?, func))
    }

    pub fn memoize_named<F>(self: &Arc<Self>, id: impl Into<FnId>, func: F) -> Memoized<F> {
        Memoized {
            cache: Arc::clone(self),
            id: id.into(),
            func,
        }
    }

    /// Drops every entry whose TTL has run out and returns how many went.
    pub fn purge_expired(&self) -> usize {
        let removed = self.storage.purge_expired(Instant::now());
        self.stats
            .evictions
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Number of stored entries, expired ones not yet removed included.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            entries: self.storage.len(),
        }
    }

    fn lookup<R: Clone + 'static>(&self, key: &CacheKey) -> Result<Option<R>> {
        let now = Instant::now();
        match self.storage.read(key, now) {
            Lookup::Fresh(value) => match value.downcast_ref::<R>() {
                Some(value) => {
                    self.stats.hits.fetch_add(1, Ordering::Relaxed);
                    trace!(function = %key.function(), "cache hit");
                    Ok(Some(value.clone()))
                }
                None => {
                    warn!(
                        function = %key.function(),
                        expected = type_name::<R>(),
                        "cached value has a different type"
                    );
                    Err(Error::TypeMismatch {
                        function: key.function().name().to_owned(),
                        expected: type_name::<R>(),
                    })
                }
            },
            Lookup::Stale => {
                if self.storage.evict_stale(key, now) {
                    self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(function = %key.function(), "evicted stale entry");
                }
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Lookup::Missing => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                trace!(function = %key.function(), "cache miss");
                Ok(None)
            }
        }
    }

    fn store<R: Send + Sync + 'static>(&self, key: CacheKey, value: R) {
        let now = Instant::now();
        let entry = CacheEntry::new(Arc::new(value), now + self.ttl);
        let removed = self.storage.write(key, entry, now);
        if removed > 0 {
            self.stats
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, "dropped entries while storing");
        }
    }

    fn store_ok<T, E>(&self, key: CacheKey, result: std::result::Result<T, E>) -> std::result::Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
    {
        match result {
            Ok(value) => {
                self.store(key, value.clone());
                Ok(value)
            }
            Err(e) => {
                debug!(function = %key.function(), "call failed, nothing stored");
                Err(e)
            }
        }
    }
}

/// A function bound to a cache, callable like a memoized version of itself.
#[derive(Debug)]
pub struct Memoized<F> {
    cache: Arc<Memoizer>,
    id: FnId,
    func: F,
}

impl<F> Memoized<F> {
    pub fn id(&self) -> &FnId {
        &self.id
    }

    pub fn cache(&self) -> &Arc<Memoizer> {
        &self.cache
    }

    pub fn call<Args>(&self, args: Args) -> Result<F::Output>
    where
        F: Memoizable<Args>,
        F::Output: Clone + Send + Sync + 'static,
        Args: Serialize,
    {
        self.cache.call_named(self.id.clone(), &self.func, args)
    }

    pub fn try_call<Args, T, E>(&self, args: Args) -> Result<std::result::Result<T, E>>
    where
        F: Memoizable<Args, Output = std::result::Result<T, E>>,
        T: Clone + Send + Sync + 'static,
        Args: Serialize,
    {
        self.cache.try_call_named(self.id.clone(), &self.func, args)
    }

    pub async fn call_async<Args, Fut>(&self, args: Args) -> Result<Fut::Output>
    where
        F: Memoizable<Args, Output = Fut>,
        Fut: Future,
        Fut::Output: Clone + Send + Sync + 'static,
        Args: Serialize,
    {
        self.cache
            .call_async_named(self.id.clone(), &self.func, args)
            .await
    }

    pub async fn try_call_async<Args, Fut, T, E>(&self, args: Args) -> Result<std::result::Result<T, E>>
    where
        F: Memoizable<Args, Output = Fut>,
        Fut: Future<Output = std::result::Result<T, E>>,
        T: Clone + Send + Sync + 'static,
        Args: Serialize,
    {
        self.cache
            .try_call_async_named(self.id.clone(), &self.func, args)
            .await
    }
}

static GLOBAL: Lazy<Arc<Memoizer>> = Lazy::new(|| Arc::new(Memoizer::new(DEFAULT_TTL)));

/// The process-wide cache, created on first use with [`DEFAULT_TTL`].
pub fn global() -> &'static Arc<Memoizer> {
    &GLOBAL
}

/// [`Memoizer::call`] on the process-wide cache.
pub fn call_memoized<F, Args>(f: &F, args: Args) -> Result<F::Output>
where
    F: Memoizable<Args> + 'static,
    F::Output: Clone + Send + Sync + 'static,
    Args: Serialize,
{
    global().call(f, args)
}

/// [`Memoizer::try_call`] on the process-wide cache.
pub fn try_call_memoized<F, Args, T, E>(f: &F, args: Args) -> Result<std::result::Result<T, E>>
where
    F: Memoizable<Args, Output = std::result::Result<T, E>> + 'static,
    T: Clone + Send + Sync + 'static,
    Args: Serialize,
{
    global().try_call(f, args)
}

pub fn memoize<F: 'static>(func: F) -> Result<Memoized<F>> {
    global().memoize(func)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: i64) -> i64 {
        x * x
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let cache = Memoizer::new(Duration::from_secs(60));
        assert_eq!(cache.call(&square, (3i64,)).unwrap(), 9);
        assert_eq!(cache.call(&square, (3i64,)).unwrap(), 9);
        assert_eq!(cache.call(&square, (4i64,)).unwrap(), 16);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.entries, 2);
    }

    #[test]
    fn arity_zero_and_eight() {
        let cache = Memoizer::new(Duration::from_secs(60));
        let zero = || 42u8;
        assert_eq!(cache.call(&zero, ()).unwrap(), 42);

        let sum = |a: u8, b: u8, c: u8, d: u8, e: u8, f: u8, g: u8, h: u8| {
            [a, b, c, d, e, f, g, h].iter().map(|&x| x as u32).sum::<u32>()
        };
        assert_eq!(cache.call(&sum, (1u8, 2u8, 3u8, 4u8, 5u8, 6u8, 7u8, 8u8)).unwrap(), 36);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn several_return_values_are_one_entry() {
        let cache = Memoizer::new(Duration::from_secs(60));
        let split = |s: String| {
            let (a, b) = s.split_at(2);
            (a.to_owned(), b.to_owned(), s.len())
        };
        let got = cache.call(&split, ("abcd".to_owned(),)).unwrap();
        assert_eq!(got, ("ab".to_owned(), "cd".to_owned(), 4));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn named_identity_with_other_type_is_a_usage_fault() {
        let cache = Memoizer::new(Duration::from_secs(60));
        let as_int = |x: u32| x;
        let as_text = |x: u32| x.to_string();

        assert_eq!(cache.call_named("shared", &as_int, (1u32,)).unwrap(), 1);
        let err = cache.call_named("shared", &as_text, (1u32,)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert!(err.is_usage());

        // the stored entry is untouched
        assert_eq!(cache.call_named("shared", &as_int, (1u32,)).unwrap(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn from_config_rejects_zero_ttl() {
        let config = CacheConfig {
            ttl_secs: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(
            Memoizer::from_config(&config),
            Err(Error::InvalidConfig(_))
        ));
    }
}
