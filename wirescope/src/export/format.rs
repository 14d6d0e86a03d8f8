//! Line rendering for exported logs and metrics
//!
//! ```text
//! log:    <name>, <uuid>, timestamp <unix-ns>, conn_id <id>, pid <pid> <recv|sent> <payload>
//! metric: <uuid>,<name>,<key>:<value><unit>
//! ```

use crate::clock::ClockSource;
use crate::decode::{Event, MetricDesc};
use crate::domain::DecodeError;

/// Render a raw event record as a log line
///
/// Returns `Ok(None)` for events that must not produce a log line (TCP
/// retransmits); the caller skips those rather than reporting a failure.
///
/// # Errors
/// Propagates any [`DecodeError`] from the record.
pub fn format_log<C: ClockSource + ?Sized>(
    name: &str,
    uuid: &str,
    data: &[u8],
    clock: &C,
) -> Result<Option<String>, DecodeError> {
    let event = Event::decode(data)?;
    Ok(render_log(name, uuid, &event, clock))
}

/// Render an already decoded event
pub fn render_log<C: ClockSource + ?Sized>(
    name: &str,
    uuid: &str,
    event: &Event,
    clock: &C,
) -> Option<String> {
    let payload = event.payload.log_text()?;
    let meta = &event.meta;
    let wall_ns = clock.to_wall_clock_ns(meta.timestamp);
    Some(format!(
        "{name}, {uuid}, timestamp {wall_ns}, conn_id {}, pid {} {} {payload}",
        meta.conn_id, meta.pid, meta.direction
    ))
}

/// Render a metric reading
///
/// `key` and `value` are decoded with the descriptor's declared types.
///
/// # Errors
/// Returns [`DecodeError::Truncated`] if either buffer is narrower than its type.
pub fn format_metric(
    name: &str,
    uuid: &str,
    desc: &MetricDesc,
    key: &[u8],
    value: &[u8],
) -> Result<String, DecodeError> {
    let key_text = desc.key_type.decode(key)?;
    let value_text = desc.value_type.decode(value)?;
    Ok(format!("{uuid},{name},{key_text}:{value_text}{}", desc.unit.suffix()))
}
