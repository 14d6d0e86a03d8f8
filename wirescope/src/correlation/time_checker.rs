//! Emission decisions for timestamped metric readings
//!
//! Kernel metric maps are polled periodically, so the same reading is often
//! delivered more than once. [`MetricTimeChecker`] decides per
//! `(metric, correlation key)` whether a reading should be exported:
//!
//! | State / incoming timestamp `t`  | Emits                   | New `last`   |
//! |---------------------------------|-------------------------|--------------|
//! | unseen                          | synthetic start time    | `t`          |
//! | `t <= last`, ≥1s since `last`   | `last` (continuity)     | now (mono)   |
//! | `t <= last`, <1s since `last`   | nothing                 | unchanged    |
//! | `t > last + 1s`                 | `last` (one-step delay) | `t`          |
//! | `last < t <= last + 1s`         | nothing                 | unchanged    |
//!
//! The synthetic start is the wall-clock time one second before the first
//! reading, so a cumulative series always begins with a fully elapsed
//! interval. Every other emitted value is a kernel-monotonic timestamp.

use std::collections::hash_map::Entry;
use std::collections::HashSet;

use super::KeyedStore;
use crate::clock::{ClockSource, SystemClock, NANOS_PER_SEC};
use crate::domain::{StoreError, Timestamp};

/// Outcome of [`MetricTimeChecker::check_metric_time`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricCheck {
    /// Export the reading, stamped with this value (nanoseconds)
    Emit(u64),
    /// Duplicate or too soon; drop silently
    Suppressed,
}

#[derive(Debug, Clone, Copy)]
struct TimeEntry {
    last: u64,
    start: u64,
}

pub struct MetricTimeChecker<C: ClockSource = SystemClock> {
    store: KeyedStore<TimeEntry>,
    clock: C,
}

impl Default for MetricTimeChecker<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricTimeChecker<SystemClock> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: ClockSource> MetricTimeChecker<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { store: KeyedStore::new(), clock }
    }

    /// Decide whether a reading taken at `timestamp` should be emitted
    ///
    /// # Errors
    /// Returns [`StoreError::CollectionNotStarted`] when `timestamp` is 0 (the
    /// kernel has not written a sample yet). No state is touched in that case.
    pub fn check_metric_time(
        &self,
        metric: &str,
        key: &str,
        timestamp: Timestamp,
    ) -> Result<MetricCheck, StoreError> {
        if timestamp.0 == 0 {
            return Err(StoreError::CollectionNotStarted(metric.to_owned()));
        }

        let check = self.store.with_entry(metric, key, |entry| match entry {
            Entry::Vacant(slot) => {
                let start = self
                    .clock
                    .to_wall_clock_ns(Timestamp(timestamp.0.saturating_sub(NANOS_PER_SEC)));
                slot.insert(TimeEntry { last: timestamp.0, start });
                MetricCheck::Emit(start)
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                let previous = entry.last;
                if timestamp.0 <= previous {
                    let now = self.clock.monotonic_ns();
                    if now.saturating_sub(previous) >= NANOS_PER_SEC {
                        entry.last = now;
                        MetricCheck::Emit(previous)
                    } else {
                        MetricCheck::Suppressed
                    }
                } else if timestamp.0 - previous > NANOS_PER_SEC {
                    entry.last = timestamp.0;
                    MetricCheck::Emit(previous)
                } else {
                    MetricCheck::Suppressed
                }
            }
        });
        Ok(check)
    }

    /// Synthetic start time recorded on first sighting
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if `key` was never checked under `metric`.
    pub fn get_metric_start_time(&self, metric: &str, key: &str) -> Result<u64, StoreError> {
        self.lookup(metric, key).map(|entry| entry.start)
    }

    /// Most recently recorded timestamp
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if `key` was never checked under `metric`.
    pub fn get_metric_time(&self, metric: &str, key: &str) -> Result<u64, StoreError> {
        self.lookup(metric, key).map(|entry| entry.last)
    }

    /// Every correlation key seen by `check_metric_time` and not yet deleted
    #[must_use]
    pub fn keys(&self) -> HashSet<String> {
        self.store.keys()
    }

    /// Forget `key` under every metric name
    pub fn delete_value(&self, key: &str) {
        self.store.remove_key(key);
    }

    fn lookup(&self, metric: &str, key: &str) -> Result<TimeEntry, StoreError> {
        self.store.get(metric, key).ok_or_else(|| StoreError::NotFound {
            metric: metric.to_owned(),
            key: key.to_owned(),
        })
    }
}
