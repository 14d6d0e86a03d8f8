//! # Exporters
//!
//! Turns kernel deliveries into lines on a sink.
//!
//! ```text
//!  raw metric (key, value)            raw event record
//!          │                                 │
//!   conn id → Correlator → uuid       conn id → Correlator → uuid
//!          │                                 │
//!   MetricTimeChecker (emit?)          Event::decode
//!          │                                 │
//!   format_metric                      render_log
//!          └──────────────┬──────────────────┘
//!                     LineSink (stdout / rotating files)
//! ```
//!
//! Per-delivery drops are not errors: an unknown connection, a suppressed
//! reading, or a non-loggable event each return a distinct [`Outcome`].
//! Decode failures and unknown names are returned to the caller.

pub mod correlator;
pub mod format;
pub mod logger;
pub mod metric;
pub mod sink;

pub use correlator::{ConnectionTable, Correlator};
pub use format::{format_log, format_metric, render_log};
pub use logger::{EventLineLogger, FileEventLogger, StdoutEventLogger};
pub use metric::{FileMetricExporter, MetricLineExporter, StdoutMetricExporter};
pub use sink::{LineSink, MemorySink, RotatingFileSink, StdoutSink};

use crate::decode::MetricDesc;
use crate::domain::ExportError;

/// What happened to a single delivery that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A line was written
    Exported,
    /// Rate-limited or duplicate metric reading
    Suppressed,
    /// The correlator has no uuid for the connection
    Uncorrelated,
    /// Event type that never produces a log line
    NotLoggable,
}

/// Sink for kernel metric readings
pub trait MetricExporter: Send + Sync {
    /// Register a metric name and its descriptor
    ///
    /// # Errors
    /// [`ExportError::AlreadyRegistered`] if `name` is already known.
    fn register_metric(&mut self, name: &str, desc: MetricDesc) -> Result<(), ExportError>;

    /// Export one reading: `key` is the connection id, `value` a
    /// `MetricFormat { data, timestamp_ns }`
    ///
    /// # Errors
    /// [`ExportError::NotRegistered`] for an unknown name, decode failures,
    /// and sink write failures.
    fn handle_data(&self, name: &str, key: &[u8], value: &[u8]) -> Result<Outcome, ExportError>;

    /// Evict correlation state for uuids the correlator no longer knows;
    /// returns how many were evicted
    fn cleanup(&self) -> usize;
}

/// Sink for kernel event records
pub trait LogExporter: Send + Sync {
    /// # Errors
    /// [`ExportError::AlreadyRegistered`] if `name` is already known.
    fn register_log(&mut self, name: &str) -> Result<(), ExportError>;

    /// # Errors
    /// [`ExportError::NotRegistered`] for an unknown name, decode failures,
    /// and sink write failures.
    fn handle_data(&self, name: &str, data: &[u8]) -> Result<Outcome, ExportError>;
}
