//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep kernel connection ids, process ids, and
//! kernel-domain timestamps from being mixed up in exporter signatures.

use std::fmt;

/// Kernel-assigned connection id
///
/// Raw identity the instrumentation attaches to every event and metric key.
/// It is NOT the correlation uuid; the external correlator maps one to the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process ID (TGID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp in nanoseconds on the kernel monotonic clock
///
/// Produced by `bpf_ktime_get_ns()`; see [`crate::clock`] for conversion to
/// wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

/// Direction of the frame or packet that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Recv,
    Sent,
}

impl Direction {
    /// Decode the kernel's `sent_recv` flag (1 = received)
    #[must_use]
    pub fn from_flag(flag: u8) -> Self {
        if flag == wirescope_common::DIRECTION_RECV {
            Direction::Recv
        } else {
            Direction::Sent
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Recv => write!(f, "recv"),
            Direction::Sent => write!(f, "sent"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_flag() {
        assert_eq!(Direction::from_flag(1), Direction::Recv);
        assert_eq!(Direction::from_flag(0), Direction::Sent);
        assert_eq!(Direction::from_flag(7), Direction::Sent);
        assert_eq!(Direction::Recv.to_string(), "recv");
    }
}
