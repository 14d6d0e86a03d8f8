//! Tagged event decoding
//!
//! Raw perf-buffer records are a fixed [`EventMetadata`] header followed by a
//! payload whose layout depends on `(event_category, event_type)`. Decoding
//! reads the header, picks the layout, and produces an [`Event`] whose payload
//! variant carries already-validated fields. Rendering to text is then a plain
//! exhaustive match with no further failure modes.
//!
//! [`EventMetadata`]: wirescope_common::EventMetadata

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use wirescope_common::{
    AF_INET, AF_INET6, EC_CAT_HTTP2, EC_CAT_TCP, EC_H2_EVENT_CLOSE, EC_H2_EVENT_GO_AWAY,
    EC_H2_EVENT_SETTINGS, EC_H2_EVENT_START, EC_H2_EVENT_STREAM_STATE, EC_H2_EVENT_WINDOW_UPDATE,
    EC_H2_STREAM_BEGIN, EC_H2_STREAM_END, EC_H2_STREAM_RESET, EC_H2_STREAM_UNKNOWN,
    EC_H2_STREAM_WINDOW_UPDATE, EC_TCP_EVENT_CONGESTION, EC_TCP_EVENT_PACKET_DROP,
    EC_TCP_EVENT_RESET, EC_TCP_EVENT_RETRANS, EC_TCP_EVENT_START, EC_TCP_EVENT_STATE_CHANGE,
};

use crate::cursor::ByteCursor;
use crate::domain::{ConnId, DecodeError, Direction, Pid, Timestamp};

/// Decoded event header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMeta {
    pub category: u32,
    pub event_type: u32,
    pub timestamp: Timestamp,
    pub conn_id: ConnId,
    pub pid: Pid,
    pub direction: Direction,
}

impl EventMeta {
    /// Size of the header on the wire
    pub const SIZE: usize = std::mem::size_of::<wirescope_common::EventMetadata>();

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, DecodeError> {
        let category = cursor.read_u32()?;
        let event_type = cursor.read_u32()?;
        let timestamp = Timestamp(cursor.read_u64()?);
        let conn_id = ConnId(cursor.read_u64()?);
        let pid = Pid(cursor.read_u32()?);
        let direction = Direction::from_flag(cursor.read_u8()?);
        cursor.skip(3)?;
        Ok(Self { category, event_type, timestamp, conn_id, pid, direction })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpEvent {
    Start { src: IpAddr, sport: u16, dst: IpAddr, dport: u16 },
    StateChange { old_state: u32, new_state: u32 },
    Congestion {
        bytes_received: u32,
        bytes_sent: u32,
        rcv_cwnd: u32,
        snd_wnd: u32,
        snd_cwnd: u32,
        srtt: u32,
    },
    PacketDrop,
    Reset,
    /// Exported as a metric only
    Retransmit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Begin,
    End,
    WindowUpdate,
    Reset,
    Unknown,
    Other(u32),
}

impl StreamState {
    fn from_code(code: u32) -> Self {
        match code {
            EC_H2_STREAM_BEGIN => StreamState::Begin,
            EC_H2_STREAM_END => StreamState::End,
            EC_H2_STREAM_WINDOW_UPDATE => StreamState::WindowUpdate,
            EC_H2_STREAM_RESET => StreamState::Reset,
            EC_H2_STREAM_UNKNOWN => StreamState::Unknown,
            other => StreamState::Other(other),
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            StreamState::Begin => "Stream Begin",
            StreamState::End => "Stream End",
            StreamState::WindowUpdate => "Window Update",
            StreamState::Reset => "Stream Reset",
            StreamState::Unknown => "Unknown",
            StreamState::Other(_) => "",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum H2Event {
    Start,
    Close,
    StreamState { state: StreamState, stream_id: u32, value: u32 },
    GoAway { last_stream_id: u32, error_code: u32 },
    WindowUpdate,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPayload {
    Tcp(TcpEvent),
    Http2(H2Event),
}

/// A fully decoded event record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub meta: EventMeta,
    pub payload: EventPayload,
}

impl Event {
    /// Decode a raw event record (header + payload)
    ///
    /// # Errors
    /// - [`DecodeError::Truncated`] if the buffer is shorter than the layout
    /// - [`DecodeError::InvalidAddressFamily`] for a TCP start with an unknown family
    /// - [`DecodeError::UnknownCategory`] / [`DecodeError::UnknownEventType`]
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = ByteCursor::new(buf);
        let meta = EventMeta::decode(&mut cursor)?;
        let payload = match meta.category {
            EC_CAT_TCP => EventPayload::Tcp(decode_tcp(meta.event_type, &mut cursor)?),
            EC_CAT_HTTP2 => EventPayload::Http2(decode_h2(meta.event_type, &mut cursor)?),
            other => return Err(DecodeError::UnknownCategory(other)),
        };
        Ok(Self { meta, payload })
    }
}

/// Read only the connection id from a raw event record
///
/// # Errors
/// Returns [`DecodeError::Truncated`] if the header is incomplete.
pub fn event_conn_id(buf: &[u8]) -> Result<ConnId, DecodeError> {
    let mut cursor = ByteCursor::at(buf, 16)?;
    Ok(ConnId(cursor.read_u64()?))
}

fn decode_addr(family: u16, raw: [u8; 16]) -> Result<IpAddr, DecodeError> {
    match family {
        AF_INET => Ok(IpAddr::V4(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]))),
        AF_INET6 => Ok(IpAddr::V6(Ipv6Addr::from(raw))),
        other => Err(DecodeError::InvalidAddressFamily(other)),
    }
}

fn decode_tcp(event_type: u32, cursor: &mut ByteCursor<'_>) -> Result<TcpEvent, DecodeError> {
    Ok(match event_type {
        EC_TCP_EVENT_START => {
            let family = cursor.read_u16()?;
            let sport = cursor.read_u16()?;
            let dport = cursor.read_u16()?;
            cursor.skip(2)?;
            let saddr = cursor.read_array::<16>()?;
            let daddr = cursor.read_array::<16>()?;
            TcpEvent::Start {
                src: decode_addr(family, saddr)?,
                sport,
                dst: decode_addr(family, daddr)?,
                dport,
            }
        }
        EC_TCP_EVENT_STATE_CHANGE => TcpEvent::StateChange {
            old_state: cursor.read_u32()?,
            new_state: cursor.read_u32()?,
        },
        EC_TCP_EVENT_CONGESTION => TcpEvent::Congestion {
            bytes_received: cursor.read_u32()?,
            bytes_sent: cursor.read_u32()?,
            rcv_cwnd: cursor.read_u32()?,
            snd_wnd: cursor.read_u32()?,
            snd_cwnd: cursor.read_u32()?,
            srtt: cursor.read_u32()?,
        },
        EC_TCP_EVENT_PACKET_DROP => TcpEvent::PacketDrop,
        EC_TCP_EVENT_RESET => TcpEvent::Reset,
        EC_TCP_EVENT_RETRANS => TcpEvent::Retransmit,
        other => {
            return Err(DecodeError::UnknownEventType { category: EC_CAT_TCP, event_type: other })
        }
    })
}

fn decode_h2(event_type: u32, cursor: &mut ByteCursor<'_>) -> Result<H2Event, DecodeError> {
    Ok(match event_type {
        EC_H2_EVENT_START => H2Event::Start,
        EC_H2_EVENT_CLOSE => H2Event::Close,
        EC_H2_EVENT_STREAM_STATE => H2Event::StreamState {
            state: StreamState::from_code(cursor.read_u32()?),
            stream_id: cursor.read_u32()?,
            value: cursor.read_u32()?,
        },
        EC_H2_EVENT_GO_AWAY => H2Event::GoAway {
            last_stream_id: cursor.read_u32()?,
            error_code: cursor.read_u32()?,
        },
        EC_H2_EVENT_WINDOW_UPDATE => H2Event::WindowUpdate,
        EC_H2_EVENT_SETTINGS => H2Event::Settings,
        other => {
            return Err(DecodeError::UnknownEventType { category: EC_CAT_HTTP2, event_type: other })
        }
    })
}

impl EventPayload {
    /// Human-readable payload text
    ///
    /// `None` means the event must not produce a log line (TCP retransmit).
    /// Callers skip it; it is not an error.
    #[must_use]
    pub fn log_text(&self) -> Option<String> {
        match self {
            EventPayload::Tcp(tcp) => tcp.log_text(),
            EventPayload::Http2(h2) => Some(h2.log_text()),
        }
    }
}

impl TcpEvent {
    fn log_text(&self) -> Option<String> {
        let text = match self {
            TcpEvent::Start { src, sport, dst, dport } => format!("s:{src}:{sport} d:{dst}:{dport}"),
            TcpEvent::StateChange { old_state, new_state } => {
                format!("O: {old_state} N: {new_state}")
            }
            TcpEvent::Congestion { bytes_received, bytes_sent, rcv_cwnd, snd_wnd, snd_cwnd, srtt } => {
                format!(
                    "received bytes {bytes_received} sent bytes {bytes_sent} rcv_cwnd {rcv_cwnd} \
                     snd_wnd {snd_wnd} snd_cwnd {snd_cwnd} srtt {srtt}"
                )
            }
            TcpEvent::PacketDrop | TcpEvent::Reset => String::new(),
            TcpEvent::Retransmit => return None,
        };
        Some(text)
    }
}

impl H2Event {
    fn log_text(&self) -> String {
        match self {
            H2Event::Start => "New connection found".to_string(),
            H2Event::Close => "Connection Closed".to_string(),
            H2Event::StreamState { state, stream_id, value } => {
                format!("{} Id: {stream_id}  Val: {value}", state.label())
            }
            H2Event::GoAway { last_stream_id, error_code } => {
                format!("Go Away Last stream: {last_stream_id}  Error: {error_code}")
            }
            H2Event::WindowUpdate => "Window update".to_string(),
            H2Event::Settings => "settings".to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use wirescope_common::DIRECTION_RECV;

    /// Build a raw record the way the kernel side lays it out
    pub(crate) fn raw_event(category: u32, event_type: u32, conn_id: u64, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&category.to_ne_bytes());
        buf.extend_from_slice(&event_type.to_ne_bytes());
        buf.extend_from_slice(&5_000_000_000u64.to_ne_bytes());
        buf.extend_from_slice(&conn_id.to_ne_bytes());
        buf.extend_from_slice(&4321u32.to_ne_bytes());
        buf.push(DIRECTION_RECV);
        buf.extend_from_slice(&[0; 3]);
        buf.extend_from_slice(payload);
        buf
    }

    fn words(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    fn tcp_start(family: u16, saddr: [u8; 16], daddr: [u8; 16]) -> Vec<u8> {
        let mut payload = Vec::new();
        payload.extend_from_slice(&family.to_ne_bytes());
        payload.extend_from_slice(&443u16.to_ne_bytes());
        payload.extend_from_slice(&51000u16.to_ne_bytes());
        payload.extend_from_slice(&[0; 2]);
        payload.extend_from_slice(&saddr);
        payload.extend_from_slice(&daddr);
        payload
    }

    fn text(buf: &[u8]) -> Option<String> {
        Event::decode(buf).unwrap().payload.log_text()
    }

    #[test]
    fn test_metadata() {
        let buf = raw_event(EC_CAT_TCP, EC_TCP_EVENT_RESET, 99, &[]);
        assert_eq!(buf.len(), EventMeta::SIZE);
        let event = Event::decode(&buf).unwrap();
        assert_eq!(event.meta.conn_id, ConnId(99));
        assert_eq!(event.meta.pid, Pid(4321));
        assert_eq!(event.meta.direction, Direction::Recv);
        assert_eq!(event.meta.timestamp, Timestamp(5_000_000_000));
        assert_eq!(event_conn_id(&buf).unwrap(), ConnId(99));
    }

    #[test]
    fn test_tcp_start_ipv4() {
        let mut saddr = [0u8; 16];
        saddr[..4].copy_from_slice(&[10, 0, 0, 1]);
        let mut daddr = [0u8; 16];
        daddr[..4].copy_from_slice(&[192, 168, 1, 20]);
        let buf = raw_event(EC_CAT_TCP, EC_TCP_EVENT_START, 1, &tcp_start(AF_INET, saddr, daddr));
        assert_eq!(text(&buf).unwrap(), "s:10.0.0.1:443 d:192.168.1.20:51000");
    }

    #[test]
    fn test_tcp_start_ipv6() {
        let saddr: [u8; 16] = "2001:db8::1".parse::<Ipv6Addr>().unwrap().octets();
        let daddr: [u8; 16] = Ipv6Addr::LOCALHOST.octets();
        let buf = raw_event(EC_CAT_TCP, EC_TCP_EVENT_START, 1, &tcp_start(AF_INET6, saddr, daddr));
        assert_eq!(text(&buf).unwrap(), "s:2001:db8::1:443 d:::1:51000");
    }

    #[test]
    fn test_tcp_start_invalid_family() {
        let buf = raw_event(EC_CAT_TCP, EC_TCP_EVENT_START, 1, &tcp_start(99, [0; 16], [0; 16]));
        let err = Event::decode(&buf).unwrap_err();
        assert_eq!(err, DecodeError::InvalidAddressFamily(99));
        assert_eq!(err.kind(), crate::domain::ErrorKind::Internal);
    }

    #[test]
    fn test_tcp_state_and_congestion() {
        let buf = raw_event(EC_CAT_TCP, EC_TCP_EVENT_STATE_CHANGE, 1, &words(&[1, 4]));
        assert_eq!(text(&buf).unwrap(), "O: 1 N: 4");

        let buf = raw_event(EC_CAT_TCP, EC_TCP_EVENT_CONGESTION, 1, &words(&[10, 20, 3, 4, 5, 60]));
        assert_eq!(
            text(&buf).unwrap(),
            "received bytes 10 sent bytes 20 rcv_cwnd 3 snd_wnd 4 snd_cwnd 5 srtt 60"
        );
    }

    #[test]
    fn test_tcp_payloadless_and_retransmit() {
        let drop = raw_event(EC_CAT_TCP, EC_TCP_EVENT_PACKET_DROP, 1, &[]);
        assert_eq!(text(&drop).unwrap(), "");
        let retrans = raw_event(EC_CAT_TCP, EC_TCP_EVENT_RETRANS, 1, &[]);
        assert_eq!(text(&retrans), None);
    }

    #[test]
    fn test_h2_texts() {
        let buf = raw_event(EC_CAT_HTTP2, EC_H2_EVENT_STREAM_STATE, 1, &words(&[EC_H2_STREAM_RESET, 7, 42]));
        assert_eq!(text(&buf).unwrap(), "Stream Reset Id: 7  Val: 42");

        let buf = raw_event(EC_CAT_HTTP2, EC_H2_EVENT_STREAM_STATE, 1, &words(&[77, 1, 2]));
        assert_eq!(text(&buf).unwrap(), " Id: 1  Val: 2");

        let buf = raw_event(EC_CAT_HTTP2, EC_H2_EVENT_GO_AWAY, 1, &words(&[9, 2]));
        assert_eq!(text(&buf).unwrap(), "Go Away Last stream: 9  Error: 2");

        let buf = raw_event(EC_CAT_HTTP2, EC_H2_EVENT_START, 1, &[]);
        assert_eq!(text(&buf).unwrap(), "New connection found");
        let buf = raw_event(EC_CAT_HTTP2, EC_H2_EVENT_SETTINGS, 1, &[]);
        assert_eq!(text(&buf).unwrap(), "settings");
    }

    #[test]
    fn test_unknown_types() {
        let buf = raw_event(EC_CAT_TCP, 200, 1, &[]);
        assert_eq!(
            Event::decode(&buf).unwrap_err(),
            DecodeError::UnknownEventType { category: EC_CAT_TCP, event_type: 200 }
        );
        let buf = raw_event(EC_CAT_HTTP2, 200, 1, &[]);
        assert!(matches!(Event::decode(&buf), Err(DecodeError::UnknownEventType { .. })));
        let buf = raw_event(9, 0, 1, &[]);
        assert_eq!(Event::decode(&buf).unwrap_err(), DecodeError::UnknownCategory(9));
    }

    #[test]
    fn test_truncated_payload() {
        let buf = raw_event(EC_CAT_HTTP2, EC_H2_EVENT_GO_AWAY, 1, &[0; 4]);
        assert!(matches!(Event::decode(&buf), Err(DecodeError::Truncated { .. })));
        assert!(matches!(Event::decode(&buf[..10]), Err(DecodeError::Truncated { .. })));
    }
}
