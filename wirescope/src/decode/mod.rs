//! # Binary Decoding
//!
//! Turns raw kernel buffers into typed values.
//!
//! - **`value`**: fixed-width metric keys/values selected by a declared
//!   [`MetricType`], plus the static [`MetricDesc`] registered per metric
//! - **`event`**: tagged event records (metadata header + TCP or HTTP/2 payload)
//!   decoded into the [`Event`] sum type
//!
//! Every read is length-checked through [`crate::cursor::ByteCursor`]; a short
//! buffer is a [`crate::domain::DecodeError::Truncated`], never undefined behavior.

pub mod event;
pub mod value;

pub use event::{event_conn_id, Event, EventMeta, EventPayload, H2Event, StreamState, TcpEvent};
pub use value::{DataUnit, MetricDesc, MetricKind, MetricType, MetricUnit, MetricValue, TimeUnit};
