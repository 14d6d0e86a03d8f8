//! Last raw value per `(metric, correlation key)`, for delta computation
//!
//! Library API for exporters that report per-interval deltas of cumulative
//! counters. The line exporters in [`crate::export`] print raw values and do
//! not hold one. An owner must sweep it the same way
//! [`crate::export::MetricExporter::cleanup`] sweeps the time checker: for
//! every key from [`MetricDataMemory::keys`] that the correlator no longer
//! reports live, call [`MetricDataMemory::delete_value`].

use std::collections::hash_map::Entry;
use std::collections::HashSet;

use super::KeyedStore;

#[derive(Debug, Default)]
pub struct MetricDataMemory {
    store: KeyedStore<u64>,
}

impl MetricDataMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` and return the previous one (0 on first sighting)
    pub fn store_and_get_value(&self, metric: &str, key: &str, value: u64) -> u64 {
        self.store.with_entry(metric, key, |entry| match entry {
            Entry::Vacant(slot) => {
                slot.insert(value);
                0
            }
            Entry::Occupied(mut slot) => slot.insert(value),
        })
    }

    #[must_use]
    pub fn keys(&self) -> HashSet<String> {
        self.store.keys()
    }

    pub fn delete_value(&self, key: &str) {
        self.store.remove_key(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_get_value() {
        let memory = MetricDataMemory::new();
        assert_eq!(memory.store_and_get_value("m", "k", 5), 0);
        assert_eq!(memory.store_and_get_value("m", "k", 9), 5);
        assert_eq!(memory.store_and_get_value("other", "k", 1), 0);
    }

    #[test]
    fn test_sweep_against_correlator() {
        use crate::domain::ConnId;
        use crate::export::{ConnectionTable, Correlator};

        let table = ConnectionTable::new();
        table.insert(ConnId(1), "live");
        let memory = MetricDataMemory::new();
        memory.store_and_get_value("tcp_snd_bytes", "live", 10);
        memory.store_and_get_value("tcp_snd_bytes", "dead", 20);

        for key in memory.keys() {
            if !table.is_live(&key) {
                memory.delete_value(&key);
            }
        }

        assert_eq!(memory.keys().into_iter().collect::<Vec<_>>(), vec!["live".to_owned()]);
        assert_eq!(memory.store_and_get_value("tcp_snd_bytes", "live", 15), 10);
    }

    #[test]
    fn test_delete_resets_to_first_sighting() {
        let memory = MetricDataMemory::new();
        memory.store_and_get_value("m", "k", 5);
        memory.store_and_get_value("n", "k", 6);
        memory.delete_value("k");
        assert!(memory.keys().is_empty());
        assert_eq!(memory.store_and_get_value("m", "k", 7), 0);
        assert_eq!(memory.store_and_get_value("n", "k", 8), 0);
    }
}
