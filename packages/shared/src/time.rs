//! Time-related utilities.

use chrono::{DateTime, TimeZone, Utc};

/// Current time in UTC.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Current Unix timestamp in milliseconds.
pub fn get_unix_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert a Unix timestamp (milliseconds) to RFC 3339 in UTC.
///
/// Out-of-range values fall back to the Unix epoch.
pub fn millis_to_rfc3339(timestamp_millis: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_millis)
        .single()
        .unwrap_or_default()
        .to_rfc3339()
}
