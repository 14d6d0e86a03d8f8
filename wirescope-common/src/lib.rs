//! # Shared Data Structures (Kernel ↔ Userspace)
//!
//! Defines the binary records that kernel instrumentation writes into perf
//! buffers and metric maps, and that userspace decodes. All types use
//! `#[repr(C)]` so both sides agree on field offsets and padding.
//!
//! ## Record Shapes
//!
//! - [`EventMetadata`] - Header present on every event, followed directly by a
//!   category-specific payload
//! - [`TcpStart`], [`TcpStateChange`], [`TcpCongestion`] - TCP payloads
//! - [`H2StreamState`], [`H2GoAway`] - HTTP/2 payloads
//! - [`MetricFormat`] - Value stored in per-connection metric maps
//!
//! Values are native-endian: producer and consumer always run on the same host.

#![no_std]

// ============================================================================
// Event Categories
// ============================================================================

/// HTTP/2 frame events (gRPC and plain h2 connections)
pub const EC_CAT_HTTP2: u32 = 0;

/// TCP socket events (state transitions, congestion samples, resets)
pub const EC_CAT_TCP: u32 = 1;

// ============================================================================
// TCP Event Types
// ============================================================================

/// New connection observed; payload is [`TcpStart`]
pub const EC_TCP_EVENT_START: u32 = 0;

/// Socket state transition; payload is [`TcpStateChange`]
pub const EC_TCP_EVENT_STATE_CHANGE: u32 = 1;

/// Congestion sample; payload is [`TcpCongestion`]
pub const EC_TCP_EVENT_CONGESTION: u32 = 2;

/// Retransmit. Counted as a metric, never logged.
pub const EC_TCP_EVENT_RETRANS: u32 = 3;

/// Packet dropped (no payload)
pub const EC_TCP_EVENT_PACKET_DROP: u32 = 4;

/// Reset sent or received (no payload)
pub const EC_TCP_EVENT_RESET: u32 = 5;

// ============================================================================
// HTTP/2 Event Types
// ============================================================================

pub const EC_H2_EVENT_START: u32 = 0;
pub const EC_H2_EVENT_CLOSE: u32 = 1;
/// Stream lifecycle change; payload is [`H2StreamState`]
pub const EC_H2_EVENT_STREAM_STATE: u32 = 2;
/// GOAWAY frame; payload is [`H2GoAway`]
pub const EC_H2_EVENT_GO_AWAY: u32 = 3;
pub const EC_H2_EVENT_WINDOW_UPDATE: u32 = 4;
pub const EC_H2_EVENT_SETTINGS: u32 = 5;

// ============================================================================
// HTTP/2 Stream States (H2StreamState::state)
// ============================================================================

pub const EC_H2_STREAM_BEGIN: u32 = 0;
pub const EC_H2_STREAM_END: u32 = 1;
pub const EC_H2_STREAM_WINDOW_UPDATE: u32 = 2;
pub const EC_H2_STREAM_RESET: u32 = 3;
pub const EC_H2_STREAM_UNKNOWN: u32 = 4;

// ============================================================================
// Address Families (TcpStart::family)
// ============================================================================

/// IPv4 (`AF_INET`)
pub const AF_INET: u16 = 2;

/// IPv6 (`AF_INET6`)
pub const AF_INET6: u16 = 10;

/// Direction flag value marking a received frame/packet
pub const DIRECTION_RECV: u8 = 1;

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Header written in front of every event payload
///
/// **Memory Layout**: 32 bytes, payload starts at offset 32.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct EventMetadata {
    /// One of the `EC_CAT_*` constants
    pub event_category: u32,

    /// Category-specific event type (`EC_TCP_EVENT_*`, `EC_H2_EVENT_*`)
    pub event_type: u32,

    /// Timestamp in nanoseconds (from `bpf_ktime_get_ns()`)
    ///
    /// Monotonic clock, relative to boot. Userspace translates it to
    /// wall-clock time before export.
    pub timestamp_ns: u64,

    /// Kernel-assigned connection id (socket pointer or similar)
    ///
    /// Not stable across userspace restarts; exporters map it to a
    /// correlation uuid before emitting anything.
    pub connection_id: u64,

    /// Process ID (TGID) owning the socket
    pub pid: u32,

    /// [`DIRECTION_RECV`] for received data, anything else for sent
    pub sent_recv: u8,

    #[allow(clippy::pub_underscore_fields)]
    pub _padding: [u8; 3],
}

/// Payload of [`EC_TCP_EVENT_START`]
///
/// Addresses are in network byte order. IPv4 addresses occupy the first
/// four bytes of each 16-byte field.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpStart {
    /// [`AF_INET`] or [`AF_INET6`]
    pub family: u16,
    pub sport: u16,
    pub dport: u16,
    #[allow(clippy::pub_underscore_fields)]
    pub _padding: u16,
    pub saddr: [u8; 16],
    pub daddr: [u8; 16],
}

/// Payload of [`EC_TCP_EVENT_STATE_CHANGE`] (kernel `TCP_*` state codes)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpStateChange {
    pub old_state: u32,
    pub new_state: u32,
}

/// Payload of [`EC_TCP_EVENT_CONGESTION`]
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpCongestion {
    pub bytes_received: u32,
    pub bytes_sent: u32,
    pub rcv_cwnd: u32,
    pub snd_wnd: u32,
    pub snd_cwnd: u32,
    /// Smoothed RTT in microseconds
    pub srtt: u32,
}

/// Payload of [`EC_H2_EVENT_STREAM_STATE`]
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct H2StreamState {
    /// One of the `EC_H2_STREAM_*` constants
    pub state: u32,
    pub stream_id: u32,
    /// State-specific value (window increment, reset error code, ...)
    pub value: u32,
}

/// Payload of [`EC_H2_EVENT_GO_AWAY`]
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct H2GoAway {
    pub last_stream_id: u32,
    pub error_code: u32,
}

/// Value stored in per-connection metric maps
///
/// The map key is the u64 connection id. `data` holds the counter in its
/// declared width, left-aligned; `timestamp_ns` is when the kernel last
/// updated it (0 until the first sample).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct MetricFormat {
    pub data: u64,
    pub timestamp_ns: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};

    #[test]
    fn test_event_metadata_layout() {
        assert_eq!(size_of::<EventMetadata>(), 32);
        assert_eq!(offset_of!(EventMetadata, timestamp_ns), 8);
        assert_eq!(offset_of!(EventMetadata, connection_id), 16);
        assert_eq!(offset_of!(EventMetadata, pid), 24);
        assert_eq!(offset_of!(EventMetadata, sent_recv), 28);
    }

    #[test]
    fn test_payload_sizes() {
        assert_eq!(size_of::<TcpStart>(), 40);
        assert_eq!(offset_of!(TcpStart, saddr), 8);
        assert_eq!(size_of::<TcpStateChange>(), 8);
        assert_eq!(size_of::<TcpCongestion>(), 24);
        assert_eq!(size_of::<H2StreamState>(), 12);
        assert_eq!(size_of::<H2GoAway>(), 8);
        assert_eq!(size_of::<MetricFormat>(), 16);
    }
}
