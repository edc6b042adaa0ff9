//! Control-rate arithmetic.

use std::time::Duration;

pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Tick period in whole microseconds. A rate of 0 Hz is treated as 1 Hz and
/// the result never drops below 1 us.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// `period_us` as a `Duration`.
#[inline]
pub fn period(hz: u32) -> Duration {
    Duration::from_micros(period_us(hz))
}
