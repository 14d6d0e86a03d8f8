//! Flat `(metric name, correlation key)` map behind a single lock

use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

type StoreKey = (String, String);

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<StoreKey, V>,
    /// Every correlation key passed to `with_entry`, across all metric names
    live: HashSet<String>,
}

/// Per-metric, per-key state shared between the delivery path and the
/// cleanup sweep
///
/// There is no expiry: entries live until [`KeyedStore::remove_key`] is called
/// for their correlation key.
#[derive(Debug)]
pub struct KeyedStore<V> {
    inner: Mutex<Inner<V>>,
}

impl<V> Default for KeyedStore<V> {
    fn default() -> Self {
        Self { inner: Mutex::new(Inner { entries: HashMap::new(), live: HashSet::new() }) }
    }
}

impl<V> KeyedStore<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on the entry for `(metric, key)` while holding the lock
    ///
    /// Records `key` as live whether or not `f` inserts anything.
    pub fn with_entry<R>(
        &self,
        metric: &str,
        key: &str,
        f: impl FnOnce(Entry<'_, StoreKey, V>) -> R,
    ) -> R {
        let mut inner = self.inner.lock();
        if !inner.live.contains(key) {
            inner.live.insert(key.to_owned());
        }
        f(inner.entries.entry((metric.to_owned(), key.to_owned())))
    }

    /// Remove `key` from every metric partition and from the live set
    pub fn remove_key(&self, key: &str) {
        let mut inner = self.inner.lock();
        inner.entries.retain(|(_, k), _| k != key);
        inner.live.remove(key);
    }

    /// Snapshot of every live correlation key
    #[must_use]
    pub fn keys(&self) -> HashSet<String> {
        self.inner.lock().live.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Copy> KeyedStore<V> {
    #[must_use]
    pub fn get(&self, metric: &str, key: &str) -> Option<V> {
        self.inner.lock().entries.get(&(metric.to_owned(), key.to_owned())).copied()
    }
}
