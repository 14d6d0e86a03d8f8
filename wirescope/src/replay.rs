//! Offline replay of recorded kernel deliveries
//!
//! A capture is JSON lines, one record per line, tagged by `kind`:
//!
//! ```text
//! {"kind":"connection","conn_id":7,"uuid":"9f1c..."}
//! {"kind":"register_log","name":"h2_events"}
//! {"kind":"register_metric","name":"tcp_rtt","desc":{"key_type":"u64","value_type":"u64","kind":"gauge"}}
//! {"kind":"event","feed":"h2","name":"h2_events","data":[2,0,0,0,...]}
//! {"kind":"metric","feed":"tcp","name":"tcp_rtt","key":[7,0,...],"value":[...]}
//! {"kind":"close","conn_id":7}
//! ```
//!
//! Registrations and connections are applied before any delivery, so every
//! connection in the capture is known for the whole replay wherever its line
//! sits. Closes take effect once every feed has drained, followed by a final
//! cleanup sweep.

use anyhow::{bail, Context, Result};
use log::info;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use crate::config::ExportConfig;
use crate::decode::MetricDesc;
use crate::domain::ConnId;
use crate::export::{
    ConnectionTable, EventLineLogger, LogExporter, MetricExporter, MetricLineExporter,
    RotatingFileSink, StdoutSink,
};
use crate::pipeline::{Delivery, Pipeline, PipelineReport};

const DEFAULT_FEED: &str = "default";

fn default_feed() -> String {
    DEFAULT_FEED.to_owned()
}

/// One line of a capture file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureRecord {
    Connection {
        conn_id: u64,
        uuid: String,
    },
    Close {
        conn_id: u64,
    },
    RegisterLog {
        name: String,
    },
    RegisterMetric {
        name: String,
        desc: MetricDesc,
    },
    Event {
        #[serde(default = "default_feed")]
        feed: String,
        name: String,
        data: Vec<u8>,
    },
    Metric {
        #[serde(default = "default_feed")]
        feed: String,
        name: String,
        key: Vec<u8>,
        value: Vec<u8>,
    },
}

/// A parsed capture file
#[derive(Debug, Default)]
pub struct Capture {
    pub records: Vec<CaptureRecord>,
}

impl Capture {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("Failed to open capture {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse JSON lines; blank lines are ignored
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.context("Failed to read capture")?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line)
                .with_context(|| format!("Invalid capture record on line {}", index + 1))?;
            records.push(record);
        }
        Ok(Self { records })
    }
}

/// Replay a capture into stdout or rotating files, per `config`
pub fn run_replay(capture: &Capture, config: &ExportConfig) -> Result<PipelineReport> {
    let table = Arc::new(ConnectionTable::new());

    if let Some(dir) = &config.output_dir {
        let log_sink = RotatingFileSink::open(dir, "logs", config.max_files, config.max_file_size)
            .with_context(|| format!("Failed to open log files in {}", dir.display()))?;
        let metric_sink =
            RotatingFileSink::open(dir, "metrics", config.max_files, config.max_file_size)
                .with_context(|| format!("Failed to open metric files in {}", dir.display()))?;
        info!("Writing to {}", dir.display());
        replay_into(
            capture,
            EventLineLogger::new(log_sink, table.clone()),
            MetricLineExporter::new(metric_sink, table.clone()),
            &table,
            config,
        )
    } else {
        replay_into(
            capture,
            EventLineLogger::new(StdoutSink, table.clone()),
            MetricLineExporter::new(StdoutSink, table.clone()),
            &table,
            config,
        )
    }
}

/// Replay a capture through caller-supplied exporters
///
/// `table` must be the correlator the exporters were built with.
pub fn replay_into<L, M>(
    capture: &Capture,
    mut logs: L,
    mut metrics: M,
    table: &Arc<ConnectionTable>,
    config: &ExportConfig,
) -> Result<PipelineReport>
where
    L: LogExporter + 'static,
    M: MetricExporter + 'static,
{
    for record in &capture.records {
        match record {
            CaptureRecord::Connection { conn_id, uuid } => {
                table.insert(ConnId(*conn_id), uuid.clone());
            }
            CaptureRecord::RegisterLog { name } => {
                logs.register_log(name).with_context(|| format!("Registering log {name}"))?;
            }
            CaptureRecord::RegisterMetric { name, desc } => {
                metrics
                    .register_metric(name, *desc)
                    .with_context(|| format!("Registering metric {name}"))?;
            }
            _ => {}
        }
    }

    let metrics = Arc::new(metrics);
    let mut pipeline = Pipeline::start(
        Arc::new(logs),
        metrics.clone(),
        config.channel_capacity,
        config.cleanup_interval(),
    );

    let mut feeds = HashMap::new();
    let mut closed = Vec::new();
    for record in &capture.records {
        let (feed, delivery) = match record {
            CaptureRecord::Close { conn_id } => {
                closed.push(ConnId(*conn_id));
                continue;
            }
            CaptureRecord::Connection { .. }
            | CaptureRecord::RegisterLog { .. }
            | CaptureRecord::RegisterMetric { .. } => continue,
            CaptureRecord::Event { feed, name, data } => {
                (feed, Delivery::Event { name: name.clone(), data: data.clone() })
            }
            CaptureRecord::Metric { feed, name, key, value } => (
                feed,
                Delivery::Metric { name: name.clone(), key: key.clone(), value: value.clone() },
            ),
        };

        let tx = feeds.entry(feed.clone()).or_insert_with(|| pipeline.add_feed(feed));
        if tx.send(delivery).is_err() {
            bail!("Worker for feed {feed} exited early");
        }
    }
    drop(feeds);

    let mut report = pipeline.join();
    for conn_id in closed {
        table.remove(conn_id);
    }
    report.evicted += metrics.cleanup();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::event::tests::raw_event;
    use crate::export::{Correlator, MemorySink};
    use wirescope_common::{EC_CAT_TCP, EC_TCP_EVENT_STATE_CHANGE};

    #[test]
    fn test_parse_records() {
        let input = r#"
{"kind":"connection","conn_id":7,"uuid":"uuid-7"}
{"kind":"register_metric","name":"tcp_rtt","desc":{"key_type":"u64","value_type":"u32","kind":"distribution","unit":{"time":"microseconds"}}}

{"kind":"event","name":"tcp_events","data":[1,2,3]}
{"kind":"close","conn_id":7}
"#;
        let capture = Capture::from_reader(input.as_bytes()).unwrap();
        assert_eq!(capture.records.len(), 4);
        assert_eq!(
            capture.records[2],
            CaptureRecord::Event {
                feed: DEFAULT_FEED.to_owned(),
                name: "tcp_events".to_owned(),
                data: vec![1, 2, 3],
            }
        );
    }

    #[test]
    fn test_bad_line_reports_position() {
        let input = "{\"kind\":\"close\",\"conn_id\":1}\n{\"kind\":\"bogus\"}\n";
        let err = Capture::from_reader(input.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn test_connection_applies_to_earlier_deliveries() {
        let state = [1u32, 4].iter().flat_map(|v| v.to_ne_bytes()).collect::<Vec<_>>();
        let data = raw_event(EC_CAT_TCP, EC_TCP_EVENT_STATE_CHANGE, 3, &state);
        let capture = Capture {
            records: vec![
                CaptureRecord::RegisterLog { name: "tcp_events".to_owned() },
                CaptureRecord::Event {
                    feed: DEFAULT_FEED.to_owned(),
                    name: "tcp_events".to_owned(),
                    data,
                },
                CaptureRecord::Connection { conn_id: 3, uuid: "uuid-3".to_owned() },
            ],
        };
        let table = Arc::new(ConnectionTable::new());
        let logs = Arc::new(MemorySink::new());

        let report = replay_into(
            &capture,
            EventLineLogger::new(Arc::clone(&logs), table.clone()),
            MetricLineExporter::new(MemorySink::new(), table.clone()),
            &table,
            &ExportConfig::default(),
        )
        .unwrap();

        assert_eq!(report.feeds[0].1.exported, 1);
        assert!(logs.lines()[0].starts_with("tcp_events, uuid-3, "));
        // Never closed
        assert_eq!(table.uuid_for(ConnId(3)).as_deref(), Some("uuid-3"));
    }
}
