/// Generic in-memory cache with TTL and LRU eviction
///
/// Thread-safe, generic over key/value types. Each worker owns its
/// cache instances privately; no other component reads or invalidates
/// entries directly. Entries expire on read after their TTL elapses
/// (monotonic clock), and inserts evict the least recently used entry
/// once capacity is reached.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Cache entry with insertion-time tracking
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            inserted_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}

/// Hit/miss counters for monitoring
#[derive(Debug, Clone, Default)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub inserts: u64,
}

impl CacheMetrics {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Time-boxed cache: create-on-miss, serve-until-expiry, then
/// evict-and-refetch. The fetch itself is the caller's job.
pub struct TtlCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    ttl: Duration,
    capacity: usize,
    inner: RwLock<CacheInner<K, V>>,
}

struct CacheInner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    access_order: VecDeque<K>,
    metrics: CacheMetrics,
}

enum EntryState<V> {
    Live(V),
    Expired,
    Missing,
}

impl<K, V> TtlCache<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            inner: RwLock::new(CacheInner {
                entries: HashMap::new(),
                access_order: VecDeque::new(),
                metrics: CacheMetrics::default(),
            }),
        }
    }

    /// Get a value; expired entries are removed and count as misses
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = match self.inner.write() {
            Ok(guard) => guard,
            Err(_) => return None,
        };

        let state = match inner.entries.get(key) {
            Some(entry) if entry.is_expired(self.ttl) => EntryState::Expired,
            Some(entry) => EntryState::Live(entry.value.clone()),
            None => EntryState::Missing,
        };

        match state {
            EntryState::Expired => {
                inner.entries.remove(key);
                inner.access_order.retain(|k| k != key);
                inner.metrics.misses += 1;
                inner.metrics.expirations += 1;
                None
            }
            EntryState::Live(value) => {
                inner.metrics.hits += 1;
                inner.access_order.retain(|k| k != key);
                inner.access_order.push_back(key.clone());
                Some(value)
            }
            EntryState::Missing => {
                inner.metrics.misses += 1;
                None
            }
        }
    }

    /// Insert a value, evicting the least recently used entry at capacity
    pub fn insert(&self, key: K, value: V) {
        let mut inner = match self.inner.write() {
            Ok(guard) => guard,
            Err(_) => return,
        };

        if inner.entries.len() >= self.capacity && !inner.entries.contains_key(&key) {
            if let Some(lru) = inner.access_order.pop_front() {
                inner.entries.remove(&lru);
                inner.metrics.evictions += 1;
            }
        }

        inner.entries.insert(key.clone(), CacheEntry::new(value));
        inner.access_order.retain(|k| *k != key);
        inner.access_order.push_back(key);
        inner.metrics.inserts += 1;
    }

    pub fn remove(&self, key: &K) {
        if let Ok(mut inner) = self.inner.write() {
            inner.entries.remove(key);
            inner.access_order.retain(|k| k != key);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.write() {
            inner.entries.clear();
            inner.access_order.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.inner
            .read()
            .map(|inner| inner.metrics.clone())
            .unwrap_or_default()
    }
}
