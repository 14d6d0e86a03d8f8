//! # Correlation Stores
//!
//! Per-connection state keyed by `(metric name, correlation uuid)`:
//!
//! - **`time_checker`**: decides which timestamped readings to emit
//!   (deduplication plus a one-reading delay for continuous series)
//! - **`data_memory`**: remembers the last raw value so callers can compute deltas
//!
//! Both are safe to share between the delivery workers and the cleanup sweep.
//! Entries are only evicted through `delete_value`, driven by the sweep once the
//! correlator stops recognizing a uuid.

pub mod data_memory;
pub mod store;
pub mod time_checker;

pub use data_memory::MetricDataMemory;
pub use store::KeyedStore;
pub use time_checker::{MetricCheck, MetricTimeChecker};
