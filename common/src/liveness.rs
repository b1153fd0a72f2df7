//! Heartbeat liveness policy and the string codecs used for stored values.
//!
//! The device is considered online while its last heartbeat is younger than the
//! configured timeout. Nothing here is stored; callers recompute on every read.

use chrono::{DateTime, NaiveDateTime};

pub fn encode_bool(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Accepts the `true`/`false` strings written by this service and the `1`/`0`
/// integers older writers used.
pub fn decode_bool(raw: &str) -> Option<bool> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("true") || value == "1" {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") || value == "0" {
        Some(false)
    } else {
        None
    }
}

pub fn encode_heartbeat(now_unix: i64) -> String {
    now_unix.to_string()
}

/// Integer Unix seconds, RFC 3339, or a naive ISO-8601 timestamp taken as UTC.
pub fn parse_heartbeat(raw: &str) -> Option<i64> {
    let value = raw.trim();
    if let Ok(seconds) = value.parse::<i64>() {
        return Some(seconds);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.timestamp());
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().timestamp())
}

pub fn is_online(now_unix: i64, last_heartbeat: Option<&str>, timeout_secs: u64) -> bool {
    let Some(last) = last_heartbeat.and_then(parse_heartbeat) else {
        return false;
    };
    let timeout = i64::try_from(timeout_secs).unwrap_or(i64::MAX);
    now_unix.saturating_sub(last) < timeout
}
