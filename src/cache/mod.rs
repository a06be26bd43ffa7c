//! Bounded in-memory response cache with lazy TTL expiry.
//!
//! [`ResponseCache`] memoizes the result of a computation under a
//! [`CacheKey`]. An entry is served while it is younger than the TTL passed
//! to the lookup; once it is older the next lookup recomputes and overwrites
//! it. Nothing sweeps expired entries in the background.
//!
//! The map holds at most [`capacity`](ResponseCache::capacity) entries. When
//! an insert pushes it past that bound, the single entry with the oldest
//! insertion time is dropped. Reads do not refresh an entry's position, so
//! this is FIFO by insertion rather than LRU.
//!
//! Failed computations are never stored.
//!
//! [`cached`] wraps a route handler so that its responses go through a shared
//! cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

mod handler;
mod key;

pub use handler::cached;
pub use key::CacheKey;

/// Maximum number of entries a cache holds unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 50;

/// TTL applied to handlers that do not ask for a specific one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    // Breaks ties between entries stored at the same instant.
    seq: u64,
}

struct Entries<V> {
    map: HashMap<CacheKey, CacheEntry<V>>,
    next_seq: u64,
}

/// A bounded, thread-safe memoization cache.
///
/// Lookups and the insert-then-evict step each run under one mutex. The lock
/// is released while the value is being computed, so a computation may
/// itself inspect the cache. Two concurrent misses on the same key both
/// compute, and the later store wins.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use vitrina::cache::{CacheKey, ResponseCache};
///
/// let cache: ResponseCache<String> = ResponseCache::new();
/// let key = CacheKey::from("greeting");
/// let ttl = Duration::from_secs(10);
///
/// let first = cache.get_or_compute(&key, ttl, || Ok::<_, ()>("hello".to_owned()));
/// let second = cache.get_or_compute(&key, ttl, || Ok::<_, ()>("ignored".to_owned()));
///
/// assert_eq!(first, Ok("hello".to_owned()));
/// assert_eq!(second, Ok("hello".to_owned()));
/// assert_eq!(cache.len(), 1);
/// ```
pub struct ResponseCache<V> {
    entries: Mutex<Entries<V>>,
    capacity: usize,
}

impl<V> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl<V> ResponseCache<V> {
    /// Creates an empty cache holding at most [`DEFAULT_CAPACITY`] entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache holding at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                next_seq: 0,
            }),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().map.is_empty()
    }

    /// Returns `true` if an entry exists for `key`, whether or not it has expired.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().map.contains_key(key)
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.lock().map.clear();
    }

    // A panic while the lock was held cannot leave the map half-updated:
    // every mutation is a single insert or remove.
    fn lock(&self) -> MutexGuard<'_, Entries<V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone> ResponseCache<V> {
    /// Returns the cached value for `key` if it is younger than `ttl`,
    /// otherwise runs `compute`, stores its result and returns it.
    ///
    /// The stored timestamp is taken before `compute` runs.
    ///
    /// # Errors
    ///
    /// Returns whatever `compute` returns on failure; nothing is stored.
    pub fn get_or_compute<F, E>(&self, key: &CacheKey, ttl: Duration, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let now = Instant::now();
        if let Some(value) = self.lookup(key, ttl, now) {
            return Ok(value);
        }

        let value = compute()?;
        self.store(key, value.clone(), now);
        Ok(value)
    }

    /// Async form of [`get_or_compute`](Self::get_or_compute) with the same
    /// hit, miss, eviction and error rules.
    ///
    /// # Errors
    ///
    /// Returns whatever the computed future resolves to on failure; nothing is stored.
    pub async fn get_or_compute_async<F, Fut, E>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let now = Instant::now();
        if let Some(value) = self.lookup(key, ttl, now) {
            return Ok(value);
        }

        let value = compute().await?;
        self.store(key, value.clone(), now);
        Ok(value)
    }

    fn lookup(&self, key: &CacheKey, ttl: Duration, now: Instant) -> Option<V> {
        let entries = self.lock();
        let entry = entries.map.get(key)?;
        if now.saturating_duration_since(entry.inserted_at) < ttl {
            debug!(key = %key, "cache hit");
            Some(entry.value.clone())
        } else {
            debug!(key = %key, "cache entry expired");
            None
        }
    }

    fn store(&self, key: &CacheKey, value: V, inserted_at: Instant) {
        let mut entries = self.lock();
        let seq = entries.next_seq;
        entries.next_seq += 1;
        entries.map.insert(
            key.clone(),
            CacheEntry {
                value,
                inserted_at,
                seq,
            },
        );

        if entries.map.len() > self.capacity {
            let oldest = entries
                .map
                .iter()
                .min_by_key(|(_, entry)| (entry.inserted_at, entry.seq))
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.map.remove(&oldest);
                info!(evicted = %oldest, capacity = self.capacity, "cache cleanup evicted oldest entry");
            }
        }
    }
}
