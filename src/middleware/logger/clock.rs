//! Time sources for request timing.

use std::time::{Duration, Instant};

use chrono::NaiveTime;

/// Where the logger reads time from.
///
/// `monotonic` measures latency; `local_time` is only for display.
pub trait Clock: Send + Sync + 'static {
    fn monotonic(&self) -> Instant;
    fn local_time(&self) -> NaiveTime;
}

/// The real clocks: [`Instant::now`] and the local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn monotonic(&self) -> Instant {
        Instant::now()
    }

    fn local_time(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}

/// Whole milliseconds from `start` to `end`, rounding half up.
///
/// An `end` before `start` counts as zero.
pub fn elapsed_millis(start: Instant, end: Instant) -> u64 {
    round_millis(end.saturating_duration_since(start))
}

pub(crate) fn round_millis(d: Duration) -> u64 {
    let nanos = d.as_nanos() + 500_000;
    u64::try_from(nanos / 1_000_000).unwrap_or(u64::MAX)
}

/// `HH:MM:SS`, 24-hour, zero padded.
pub fn format_timestamp(t: NaiveTime) -> String {
    t.format("%H:%M:%S").to_string()
}
