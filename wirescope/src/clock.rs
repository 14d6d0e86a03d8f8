//! Kernel monotonic → wall-clock translation
//!
//! Kernel instrumentation stamps events with `bpf_ktime_get_ns()` (monotonic
//! since boot). To export them we sample both the monotonic and the realtime
//! clock, take their offset, and add it to the kernel timestamp.
//!
//! The offset is recomputed on every call, never cached. Two translations of
//! the same timestamp in quick succession can therefore differ by the
//! scheduling jitter between the two clock reads (typically well under a
//! microsecond).

#![allow(unsafe_code)] // clock_gettime requires unsafe

use crate::domain::Timestamp;

/// Nanoseconds per second
pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Source of monotonic and realtime clock readings
///
/// Abstracted so the correlation store's time-based suppression can be driven
/// deterministically in tests.
pub trait ClockSource: Send + Sync {
    /// Nanoseconds on the monotonic clock (same domain as kernel timestamps)
    fn monotonic_ns(&self) -> u64;

    /// Nanoseconds since the Unix epoch
    fn realtime_ns(&self) -> u64;

    /// Translate a kernel-monotonic timestamp into Unix-epoch nanoseconds
    fn to_wall_clock_ns(&self, timestamp: Timestamp) -> u64 {
        let mono = self.monotonic_ns();
        let real = self.realtime_ns();
        real.wrapping_sub(mono).wrapping_add(timestamp.0)
    }
}

/// The host's `CLOCK_MONOTONIC` / `CLOCK_REALTIME`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

fn read_clock(clock: libc::clockid_t) -> u64 {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: `ts` is a valid, writable timespec for the duration of the call
    let rc = unsafe { libc::clock_gettime(clock, &mut ts) };
    if rc != 0 {
        return 0;
    }
    #[allow(clippy::cast_sign_loss)]
    let (secs, nanos) = (ts.tv_sec as u64, ts.tv_nsec as u64);
    secs.wrapping_mul(NANOS_PER_SEC).wrapping_add(nanos)
}

impl ClockSource for SystemClock {
    fn monotonic_ns(&self) -> u64 {
        read_clock(libc::CLOCK_MONOTONIC)
    }

    fn realtime_ns(&self) -> u64 {
        read_clock(libc::CLOCK_REALTIME)
    }
}

/// Manually advanced clock for tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualClock {
    mono: std::sync::atomic::AtomicU64,
    real: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(mono: u64, real: u64) -> Self {
        Self { mono: mono.into(), real: real.into() }
    }

    pub fn advance(&self, nanos: u64) {
        use std::sync::atomic::Ordering;
        self.mono.fetch_add(nanos, Ordering::SeqCst);
        self.real.fetch_add(nanos, Ordering::SeqCst);
    }
}

#[cfg(test)]
impl ClockSource for ManualClock {
    fn monotonic_ns(&self) -> u64 {
        self.mono.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn realtime_ns(&self) -> u64 {
        self.real.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_translation() {
        let clock = ManualClock::new(100 * NANOS_PER_SEC, 1_700_000_000 * NANOS_PER_SEC);
        let wall = clock.to_wall_clock_ns(Timestamp(99 * NANOS_PER_SEC));
        assert_eq!(wall, 1_699_999_999 * NANOS_PER_SEC);
    }

    #[test]
    fn test_system_translation_is_close_to_now() {
        let clock = SystemClock;
        let now_mono = clock.monotonic_ns();
        let wall = clock.to_wall_clock_ns(Timestamp(now_mono));
        let real = clock.realtime_ns();
        // Two clock reads apart; a generous bound keeps this stable on loaded CI
        assert!(real.abs_diff(wall) < NANOS_PER_SEC);
    }
}
