//! Apple reference-date timestamp conversion.
//!
//! Raw `message.date` values count from 2001-01-01 but the unit drifted
//! across OS versions (seconds, then nanoseconds, with milli and micro
//! variants seen in migrated databases). The magnitude of the raw value
//! decides the unit.

use chrono::{DateTime, TimeZone, Utc};

use mx_core::constants::APPLE_EPOCH_OFFSET;

/// Convert a raw database timestamp to UTC.
///
/// Magnitude thresholds: above 9e15 the value is nanoseconds, above
/// 9e12 microseconds, above 9e9 milliseconds, otherwise seconds since
/// the Apple reference date.
pub fn apple_timestamp_to_utc(raw: i64) -> DateTime<Utc> {
    let magnitude = raw.abs();
    let seconds = if magnitude > 9_000_000_000_000_000 {
        raw / 1_000_000_000
    } else if magnitude > 9_000_000_000_000 {
        raw / 1_000_000
    } else if magnitude > 9_000_000_000 {
        raw / 1_000
    } else {
        raw
    };

    let unix = seconds + APPLE_EPOCH_OFFSET;
    Utc.timestamp_opt(unix, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap())
}

/// Render a raw timestamp as an ISO-8601 string.
pub fn format_iso8601(raw: i64) -> String {
    apple_timestamp_to_utc(raw).to_rfc3339()
}
