use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use super::format::format_metric;
use super::sink::{LineSink, RotatingFileSink, StdoutSink};
use super::{Correlator, MetricExporter, Outcome};
use crate::clock::{ClockSource, SystemClock};
use crate::correlation::{MetricCheck, MetricTimeChecker};
use crate::cursor::ByteCursor;
use crate::decode::MetricDesc;
use crate::domain::{ConnId, ExportError, Timestamp};

/// Metric exporter writing one line per emitted reading
///
/// Readings pass through a [`MetricTimeChecker`] keyed by the connection's
/// uuid, so duplicates are dropped and continuous series lag one reading.
pub struct MetricLineExporter<S: LineSink, C: ClockSource = SystemClock> {
    metrics: HashMap<String, MetricDesc>,
    checker: MetricTimeChecker<C>,
    correlator: Arc<dyn Correlator>,
    sink: S,
}

pub type StdoutMetricExporter = MetricLineExporter<StdoutSink>;
pub type FileMetricExporter = MetricLineExporter<RotatingFileSink>;

impl<S: LineSink> MetricLineExporter<S> {
    pub fn new(sink: S, correlator: Arc<dyn Correlator>) -> Self {
        Self::with_clock(sink, correlator, SystemClock)
    }
}

impl<S: LineSink, C: ClockSource> MetricLineExporter<S, C> {
    pub fn with_clock(sink: S, correlator: Arc<dyn Correlator>, clock: C) -> Self {
        Self {
            metrics: HashMap::new(),
            checker: MetricTimeChecker::with_clock(clock),
            correlator,
            sink,
        }
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    #[must_use]
    pub fn checker(&self) -> &MetricTimeChecker<C> {
        &self.checker
    }
}

/// Split a kernel metric value into `(data bytes, timestamp)`
fn split_value(value: &[u8]) -> Result<(&[u8], Timestamp), ExportError> {
    let mut cursor = ByteCursor::new(value);
    let data = cursor.read_bytes(8)?;
    let timestamp = Timestamp(cursor.read_u64()?);
    Ok((data, timestamp))
}

impl<S: LineSink, C: ClockSource> MetricExporter for MetricLineExporter<S, C> {
    fn register_metric(&mut self, name: &str, desc: MetricDesc) -> Result<(), ExportError> {
        if self.metrics.contains_key(name) {
            return Err(ExportError::AlreadyRegistered(name.to_owned()));
        }
        self.metrics.insert(name.to_owned(), desc);
        Ok(())
    }

    fn handle_data(&self, name: &str, key: &[u8], value: &[u8]) -> Result<Outcome, ExportError> {
        let desc = self.metrics.get(name).ok_or_else(|| ExportError::NotRegistered(name.to_owned()))?;
        let conn_id = ConnId(ByteCursor::new(key).read_u64()?);
        let (data, timestamp) = split_value(value)?;

        let Some(uuid) = self.correlator.uuid_for(conn_id) else {
            debug!("{name}: no uuid for conn_id {conn_id}, dropping");
            return Ok(Outcome::Uncorrelated);
        };

        match self.checker.check_metric_time(name, &uuid, timestamp) {
            Ok(MetricCheck::Emit(_)) => {}
            Ok(MetricCheck::Suppressed) => {
                debug!("{name}: suppressed sample for {uuid}");
                return Ok(Outcome::Suppressed);
            }
            Err(e) => {
                debug!("{name}: {e}");
                return Ok(Outcome::Suppressed);
            }
        }

        let line = format_metric(name, &uuid, desc, key, data)?;
        self.sink.write_line(&line)?;
        Ok(Outcome::Exported)
    }

    fn cleanup(&self) -> usize {
        let mut evicted = 0;
        for uuid in self.checker.keys() {
            if !self.correlator.is_live(&uuid) {
                self.checker.delete_value(&uuid);
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!("Evicted {evicted} stale correlation keys");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, NANOS_PER_SEC};
    use crate::decode::{DataUnit, MetricKind, MetricType, MetricUnit};
    use crate::domain::ErrorKind;
    use crate::export::{ConnectionTable, MemorySink};

    const T: u64 = 50 * NANOS_PER_SEC;

    fn exporter() -> (MetricLineExporter<MemorySink, ManualClock>, Arc<ConnectionTable>) {
        let table = Arc::new(ConnectionTable::new());
        table.insert(ConnId(7), "uuid-7");
        let clock = ManualClock::new(T + 100, 1_000 * NANOS_PER_SEC);
        let mut exporter = MetricLineExporter::with_clock(MemorySink::new(), table.clone(), clock);
        let desc = MetricDesc::new(
            MetricType::U64,
            MetricType::U64,
            MetricKind::Cumulative,
            MetricUnit::Data(DataUnit::Bytes),
        );
        exporter.register_metric("tcp_snd_bytes", desc).unwrap();
        (exporter, table)
    }

    fn value(data: u64, timestamp: u64) -> Vec<u8> {
        let mut buf = data.to_ne_bytes().to_vec();
        buf.extend_from_slice(&timestamp.to_ne_bytes());
        buf
    }

    #[test]
    fn test_duplicate_registration() {
        let (mut exporter, _) = exporter();
        let desc =
            MetricDesc::new(MetricType::U64, MetricType::U64, MetricKind::Gauge, MetricUnit::None);
        let err = exporter.register_metric("tcp_snd_bytes", desc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn test_unregistered_metric() {
        let (exporter, _) = exporter();
        let err = exporter.handle_data("nope", &7u64.to_ne_bytes(), &value(1, T)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_first_sample_exported_then_duplicate_suppressed() {
        let (exporter, _) = exporter();
        let key = 7u64.to_ne_bytes();

        let outcome = exporter.handle_data("tcp_snd_bytes", &key, &value(1500, T)).unwrap();
        assert_eq!(outcome, Outcome::Exported);
        let outcome = exporter.handle_data("tcp_snd_bytes", &key, &value(1500, T)).unwrap();
        assert_eq!(outcome, Outcome::Suppressed);

        assert_eq!(exporter.sink().lines(), vec!["uuid-7,tcp_snd_bytes,7:1500By"]);
    }

    #[test]
    fn test_uncorrelated_and_not_started_are_dropped() {
        let (exporter, _) = exporter();
        let outcome =
            exporter.handle_data("tcp_snd_bytes", &8u64.to_ne_bytes(), &value(1, T)).unwrap();
        assert_eq!(outcome, Outcome::Uncorrelated);
        let outcome =
            exporter.handle_data("tcp_snd_bytes", &7u64.to_ne_bytes(), &value(1, 0)).unwrap();
        assert_eq!(outcome, Outcome::Suppressed);
        assert!(exporter.sink().lines().is_empty());
    }

    #[test]
    fn test_short_value_is_an_error() {
        let (exporter, _) = exporter();
        let err = exporter.handle_data("tcp_snd_bytes", &7u64.to_ne_bytes(), &[0; 12]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_cleanup_evicts_dead_uuids() {
        let (exporter, table) = exporter();
        table.insert(ConnId(8), "uuid-8");
        exporter.handle_data("tcp_snd_bytes", &7u64.to_ne_bytes(), &value(1, T)).unwrap();
        exporter.handle_data("tcp_snd_bytes", &8u64.to_ne_bytes(), &value(1, T)).unwrap();

        table.remove(ConnId(8));
        assert_eq!(exporter.cleanup(), 1);
        assert!(exporter.checker().keys().contains("uuid-7"));
        assert!(!exporter.checker().keys().contains("uuid-8"));
        assert_eq!(exporter.cleanup(), 0);
    }
}
