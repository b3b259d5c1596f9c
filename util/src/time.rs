//! General time utility functions

use chrono;
use std::time::Instant;

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a chrono duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Signed number of seconds from `from` to `to`.
///
/// Positive if `to` is later than `from`.
pub fn signed_secs_between(from: Instant, to: Instant) -> f64 {
    if to >= from {
        (to - from).as_secs_f64()
    }
    else {
        -(from - to).as_secs_f64()
    }
}
