//! Memoization for metadata requests.
//!
//! Each [`Memoized`] maps a request key to the value its fetch produced.
//! Absent results are never stored, so a server that failed once is asked
//! again on the next call. Calls for the same key are serialized: while one
//! caller fetches, later callers for that key wait and then read its result.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, TryLockError};

use crate::error::Result;
use crate::model::{Capabilities, Catalog, DatasetInfo};

type Slot<V> = Arc<Mutex<Option<V>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Memoized<K, V> {
    name: &'static str,
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> Memoized<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug,
    V: Clone,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches a
    /// present result.
    ///
    /// `fetch` must not call back into this cache with the same key.
    pub fn get_or_fetch<F>(&self, key: K, fetch: F) -> Result<Option<V>>
    where
        F: FnOnce(&K) -> Result<Option<V>>,
    {
        let slot = {
            let mut slots = lock(&self.slots);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut cached = lock(&slot);
        if let Some(value) = cached.as_ref() {
            tracing::trace!(cache = self.name, ?key, "hit");
            return Ok(Some(value.clone()));
        }

        tracing::debug!(cache = self.name, ?key, "miss");
        let result = fetch(&key);
        match &result {
            Ok(Some(value)) => *cached = Some(value.clone()),
            _ => {
                drop(cached);
                self.release(&key, &slot);
            }
        }
        result
    }

    // Drops the empty slot left by an absent or failed fetch, unless a waiter
    // already holds it or a newer slot replaced it.
    fn release(&self, key: &K, slot: &Slot<V>) {
        let mut slots = lock(&self.slots);
        let Some(current) = slots.get(key) else {
            return;
        };
        if !Arc::ptr_eq(current, slot) {
            return;
        }
        let empty = match slot.try_lock() {
            Ok(cached) => cached.is_none(),
            Err(TryLockError::Poisoned(p)) => p.into_inner().is_none(),
            Err(TryLockError::WouldBlock) => false,
        };
        if empty {
            slots.remove(key);
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let slot = lock(&self.slots).get(key).cloned()?;
        let cached = lock(&slot);
        cached.clone()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        let slots: Vec<Slot<V>> = lock(&self.slots).values().cloned().collect();
        slots.iter().filter(|s| lock(s).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        lock(&self.slots).clear();
        tracing::debug!(cache = self.name, "cleared");
    }
}

impl<K, V> fmt::Debug for Memoized<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("name", &self.name)
            .field("keys", &lock(&self.slots).len())
            .finish()
    }
}

/// `(base url, dataset id)`.
pub type InfoKey = (String, String);

/// One independent cache per metadata request kind.
#[derive(Debug)]
pub struct RequestCaches {
    capabilities: Memoized<String, Arc<Capabilities>>,
    catalog: Memoized<String, Arc<Catalog>>,
    info: Arc<Memoized<InfoKey, Arc<DatasetInfo>>>,
}

impl Default for RequestCaches {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestCaches {
    pub fn new() -> Self {
        Self {
            capabilities: Memoized::new("capabilities"),
            catalog: Memoized::new("catalog"),
            info: Arc::new(Memoized::new("info")),
        }
    }

    /// A process-wide instance, for servers that should share their caches.
    pub fn shared() -> Arc<RequestCaches> {
        static SHARED: OnceLock<Arc<RequestCaches>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(RequestCaches::new())))
    }

    pub fn capabilities(&self) -> &Memoized<String, Arc<Capabilities>> {
        &self.capabilities
    }

    pub fn catalog(&self) -> &Memoized<String, Arc<Catalog>> {
        &self.catalog
    }

    pub fn info(&self) -> &Arc<Memoized<InfoKey, Arc<DatasetInfo>>> {
        &self.info
    }

    pub fn clear_all(&self) {
        self.capabilities.clear();
        self.catalog.clear();
        self.info.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn second_call_does_not_refetch() {
        let cache: Memoized<String, u32> = Memoized::new("test");
        let calls = AtomicUsize::new(0);
        let fetch = |_: &String| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(42))
        };

        assert_eq!(cache.get_or_fetch("a".into(), fetch).unwrap(), Some(42));
        assert_eq!(cache.get_or_fetch("a".into(), fetch).unwrap(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.clear();
        assert_eq!(cache.get_or_fetch("a".into(), fetch).unwrap(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn keys_are_independent() {
        let cache: Memoized<(String, String), String> = Memoized::new("test");
        let v = cache
            .get_or_fetch(("u".into(), "x".into()), |k| Ok(Some(k.1.clone())))
            .unwrap();
        let w = cache
            .get_or_fetch(("u".into(), "y".into()), |k| Ok(Some(k.1.clone())))
            .unwrap();
        assert_eq!((v.as_deref(), w.as_deref()), (Some("x"), Some("y")));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn absent_and_errors_are_not_cached() {
        let cache: Memoized<String, u32> = Memoized::new("test");
        assert_eq!(cache.get_or_fetch("a".into(), |_| Ok(None)).unwrap(), None);
        assert!(cache.is_empty());

        let err = cache.get_or_fetch("a".into(), |_| Err(Error::InvalidTime("x".into())));
        assert!(err.is_err());
        assert!(!cache.contains(&"a".to_string()));

        for i in 0..1000 {
            cache.get_or_fetch(format!("missing-{i}"), |_| Ok(None)).unwrap();
        }
        assert_eq!(lock(&cache.slots).len(), 0);

        assert_eq!(cache.get_or_fetch("a".into(), |_| Ok(Some(1))).unwrap(), Some(1));
        assert_eq!(cache.get(&"a".to_string()), Some(1));
    }

    #[test]
    fn concurrent_callers_share_one_fetch() {
        let cache: Arc<Memoized<String, u32>> = Arc::new(Memoized::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    cache
                        .get_or_fetch("k".into(), |_| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok(Some(7))
                        })
                        .unwrap()
                })
            })
            .collect();

        for h in handles {
            assert_eq!(h.join().unwrap(), Some(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_all_resets_every_cache() {
        let caches = RequestCaches::new();
        caches
            .catalog()
            .get_or_fetch("http://h".into(), |_| Ok(Some(Arc::new(Vec::new()))))
            .unwrap();
        assert_eq!(caches.catalog().len(), 1);
        assert!(caches.capabilities().is_empty());

        caches.clear_all();
        assert!(caches.catalog().is_empty());
    }
}
