//! # Delivery Pipeline
//!
//! One worker thread per source feed drains a bounded queue sequentially;
//! a separate thread sweeps stale correlation state on a fixed tick.
//!
//! ```text
//!  feed "tcp"  ──► bounded chan ──► worker ──┐
//!  feed "h2"   ──► bounded chan ──► worker ──┼──► LogExporter / MetricExporter
//!                                            │
//!  tick(interval) ──► cleanup thread ────────┘    MetricExporter::cleanup
//! ```
//!
//! A worker exits once every [`Sender`] for its feed is dropped. A failed
//! delivery is logged and counted; the worker moves on to the next one.

mod processor;

pub use processor::{DeliveryProcessor, FeedStats};

use crossbeam_channel::{bounded, select, tick, Sender};
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::export::{LogExporter, MetricExporter};

/// One raw item handed over by a kernel source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Event { name: String, data: Vec<u8> },
    Metric { name: String, key: Vec<u8>, value: Vec<u8> },
}

impl Delivery {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Delivery::Event { name, .. } | Delivery::Metric { name, .. } => name,
        }
    }
}

/// Statistics returned by [`Pipeline::join`]
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub feeds: Vec<(String, FeedStats)>,
    /// Correlation keys evicted by the cleanup thread
    pub evicted: usize,
}

struct Cleanup {
    stop: Sender<()>,
    handle: JoinHandle<usize>,
}

pub struct Pipeline {
    logs: Arc<dyn LogExporter>,
    metrics: Arc<dyn MetricExporter>,
    capacity: usize,
    workers: Vec<(String, JoinHandle<FeedStats>)>,
    cleanup: Cleanup,
}

impl Pipeline {
    /// Start the cleanup thread; feeds are added with [`Pipeline::add_feed`]
    #[must_use]
    pub fn start(
        logs: Arc<dyn LogExporter>,
        metrics: Arc<dyn MetricExporter>,
        capacity: usize,
        cleanup_interval: Duration,
    ) -> Self {
        let (stop, stop_rx) = bounded::<()>(0);
        let sweeper = Arc::clone(&metrics);
        let handle = std::thread::spawn(move || {
            let ticker = tick(cleanup_interval);
            let mut evicted = 0;
            loop {
                select! {
                    recv(ticker) -> _ => evicted += sweeper.cleanup(),
                    recv(stop_rx) -> _ => break,
                }
            }
            evicted
        });

        Self {
            logs,
            metrics,
            capacity: capacity.max(1),
            workers: Vec::new(),
            cleanup: Cleanup { stop, handle },
        }
    }

    /// Spawn a worker for `feed` and return the sending side of its queue
    pub fn add_feed(&mut self, feed: &str) -> Sender<Delivery> {
        let (tx, rx) = bounded::<Delivery>(self.capacity);
        let mut processor =
            DeliveryProcessor::new(feed, Arc::clone(&self.logs), Arc::clone(&self.metrics));
        let name = feed.to_owned();
        let handle = std::thread::spawn(move || {
            for delivery in rx {
                processor.process(&delivery);
            }
            processor.stats
        });
        debug!("Started worker for feed {name}");
        self.workers.push((name, handle));
        tx
    }

    /// Wait for every feed to drain, then stop the cleanup thread
    ///
    /// All senders returned by [`Pipeline::add_feed`] must have been dropped,
    /// otherwise this blocks.
    #[must_use]
    pub fn join(self) -> PipelineReport {
        let mut report = PipelineReport::default();
        for (name, handle) in self.workers {
            match handle.join() {
                Ok(stats) => {
                    info!("Feed {name}: {stats}");
                    report.feeds.push((name, stats));
                }
                Err(_) => warn!("Worker for feed {name} panicked"),
            }
        }

        drop(self.cleanup.stop);
        match self.cleanup.handle.join() {
            Ok(evicted) => report.evicted = evicted,
            Err(_) => warn!("Cleanup thread panicked"),
        }
        report
    }
}
