use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

use super::format::render_log;
use super::sink::{LineSink, RotatingFileSink, StdoutSink};
use super::{Correlator, LogExporter, Outcome};
use crate::clock::{ClockSource, SystemClock};
use crate::decode::{event_conn_id, Event};
use crate::domain::ExportError;

/// Log exporter writing one line per loggable event
pub struct EventLineLogger<S: LineSink, C: ClockSource = SystemClock> {
    logs: HashSet<String>,
    correlator: Arc<dyn Correlator>,
    clock: C,
    sink: S,
}

pub type StdoutEventLogger = EventLineLogger<StdoutSink>;
pub type FileEventLogger = EventLineLogger<RotatingFileSink>;

impl<S: LineSink> EventLineLogger<S> {
    pub fn new(sink: S, correlator: Arc<dyn Correlator>) -> Self {
        Self::with_clock(sink, correlator, SystemClock)
    }
}

impl<S: LineSink, C: ClockSource> EventLineLogger<S, C> {
    pub fn with_clock(sink: S, correlator: Arc<dyn Correlator>, clock: C) -> Self {
        Self { logs: HashSet::new(), correlator, clock, sink }
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: LineSink, C: ClockSource> LogExporter for EventLineLogger<S, C> {
    fn register_log(&mut self, name: &str) -> Result<(), ExportError> {
        if !self.logs.insert(name.to_owned()) {
            return Err(ExportError::AlreadyRegistered(name.to_owned()));
        }
        Ok(())
    }

    fn handle_data(&self, name: &str, data: &[u8]) -> Result<Outcome, ExportError> {
        if !self.logs.contains(name) {
            return Err(ExportError::NotRegistered(name.to_owned()));
        }

        let conn_id = event_conn_id(data)?;
        let Some(uuid) = self.correlator.uuid_for(conn_id) else {
            debug!("{name}: no uuid for conn_id {conn_id}, dropping");
            return Ok(Outcome::Uncorrelated);
        };

        let event = Event::decode(data)?;
        let Some(line) = render_log(name, &uuid, &event, &self.clock) else {
            return Ok(Outcome::NotLoggable);
        };
        self.sink.write_line(&line)?;
        Ok(Outcome::Exported)
    }
}
