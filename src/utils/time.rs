// src/utils/time.rs

use chrono::{DateTime, Utc};

/// Gets the current UTC date and time.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Whole hours elapsed between two instants, as a fraction. Negative spans clamp to zero.
pub fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    let millis = (later - earlier).num_milliseconds().max(0);
    millis as f64 / 3_600_000.0
}
