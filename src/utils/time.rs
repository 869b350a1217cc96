use chrono::{DateTime, Utc};

/// Current Unix time in seconds.
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// Parse an RFC 3339 timestamp (e.g. `2024-05-01T12:00:00.123Z`) into Unix seconds.
pub fn parse_rfc3339_unix(timestamp_str: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(timestamp_str.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc).timestamp())
}
