// Time-based cache used to avoid repeating slow lookups (tags, settings,
// platform user profiles) inside a freshness window.
//
// Entries expire lazily: nothing sweeps in the background, a stale entry is
// dropped the next time someone reads it. Because of that every read takes
// `&mut self`. The cache has no internal locking; services that share one
// across tasks wrap it in a `tokio::sync::Mutex`.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

/// One cached value plus the moment it was stored.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_stale(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= ttl
    }
}

/// Cache with exact key comparison and per-entry expiry.
///
/// There is no capacity bound and no LRU ordering; an entry lives until it is
/// read after its TTL has run out.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    #[allow(dead_code)]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a value, replacing (and refreshing) any previous entry.
    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Look up a live value. A stale entry counts as a miss and is evicted.
    pub fn get<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let now = Instant::now();
        let stale = self.entries.get(key)?.is_stale(self.ttl, now);
        if stale {
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Membership test with the same eviction side effect as [`get`](Self::get).
    pub fn contains_key<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let now = Instant::now();
        match self.entries.get(key) {
            Some(entry) if entry.is_stale(self.ttl, now) => {
                self.entries.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Edit a live value in place. The entry keeps its original age.
    pub fn modify<Q>(&mut self, key: &Q, edit: impl FnOnce(&mut V)) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        if !self.contains_key(key) {
            return false;
        }
        match self.entries.get_mut(key) {
            Some(entry) => {
                edit(&mut entry.value);
                true
            }
            None => false,
        }
    }

    /// Iterate over live entries. Stale entries are evicted first.
    pub fn iter(&mut self) -> impl Iterator<Item = (&K, &V)> {
        self.purge_stale();
        self.entries.iter().map(|(key, entry)| (key, &entry.value))
    }

    /// Number of stored entries, stale ones included until they are touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn purge_stale(&mut self) {
        let now = Instant::now();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| !entry.is_stale(ttl, now));
    }
}

/// String-keyed cache where `"Rules"` and `"rules"` are the same key.
#[derive(Debug)]
pub struct CaseInsensitiveCache<V> {
    inner: TtlCache<String, V>,
}

impl<V: Clone> CaseInsensitiveCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: TtlCache::new(ttl),
        }
    }

    fn fold(key: &str) -> String {
        key.to_lowercase()
    }

    pub fn insert(&mut self, key: &str, value: V) {
        self.inner.insert(Self::fold(key), value);
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        self.inner.get(Self::fold(key).as_str())
    }

    pub fn contains_key(&mut self, key: &str) -> bool {
        self.inner.contains_key(Self::fold(key).as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.inner.remove(Self::fold(key).as_str())
    }

    pub fn modify(&mut self, key: &str, edit: impl FnOnce(&mut V)) -> bool {
        self.inner.modify(Self::fold(key).as_str(), edit)
    }

    #[allow(dead_code)]
    pub fn iter(&mut self) -> impl Iterator<Item = (&String, &V)> {
        self.inner.iter()
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}
