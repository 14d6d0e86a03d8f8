use log::warn;
use std::fmt;
use std::sync::Arc;

use super::Delivery;
use crate::export::{LogExporter, MetricExporter, Outcome};

/// Per-feed delivery counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    pub delivered: usize,
    pub exported: usize,
    /// Duplicate or rate-limited metric readings
    pub suppressed: usize,
    /// No uuid for the connection id
    pub uncorrelated: usize,
    /// Events that never produce a log line
    pub not_loggable: usize,
    pub failed: usize,
}

impl fmt::Display for FeedStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} delivered, {} exported, {} suppressed, {} uncorrelated, {} not loggable, {} failed",
            self.delivered,
            self.exported,
            self.suppressed,
            self.uncorrelated,
            self.not_loggable,
            self.failed
        )
    }
}

/// Routes deliveries from one feed to the exporters and keeps count
pub struct DeliveryProcessor {
    feed: String,
    logs: Arc<dyn LogExporter>,
    metrics: Arc<dyn MetricExporter>,
    pub stats: FeedStats,
}

impl DeliveryProcessor {
    #[must_use]
    pub fn new(feed: &str, logs: Arc<dyn LogExporter>, metrics: Arc<dyn MetricExporter>) -> Self {
        Self { feed: feed.to_owned(), logs, metrics, stats: FeedStats::default() }
    }

    /// Process a single delivery; failures are logged and counted, never returned
    pub fn process(&mut self, delivery: &Delivery) {
        self.stats.delivered += 1;

        let result = match delivery {
            Delivery::Event { name, data } => self.logs.handle_data(name, data),
            Delivery::Metric { name, key, value } => self.metrics.handle_data(name, key, value),
        };

        match result {
            Ok(Outcome::Exported) => self.stats.exported += 1,
            Ok(Outcome::Suppressed) => self.stats.suppressed += 1,
            Ok(Outcome::Uncorrelated) => self.stats.uncorrelated += 1,
            Ok(Outcome::NotLoggable) => self.stats.not_loggable += 1,
            Err(e) => {
                self.stats.failed += 1;
                warn!("[{}] {}: {e}", self.feed, delivery.name());
            }
        }
    }
}
