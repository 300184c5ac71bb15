//! Simple time helpers used by multiple services.

use std::time::Instant;

use chrono::{DateTime, Utc};

/// Current wall-clock time in UTC.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Milliseconds elapsed since `start`, for duration fields in log events.
pub fn elapsed_ms(start: Instant) -> u128 {
    start.elapsed().as_millis()
}
