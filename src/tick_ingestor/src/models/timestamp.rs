//! Vendor timestamp decoding.
//!
//! The tick endpoints stamp events as integer nanoseconds since the Unix epoch.
//! Some proxies and older endpoints return RFC-3339 strings instead, so both
//! forms are accepted at the ingestion boundary:
//!
//! - `1704205800000000000` -> `2024-01-02T14:30:00Z`
//! - `"2024-01-02T09:30:00-05:00"` -> `2024-01-02T14:30:00Z`
//!
//! [`deserialize_required`] rejects anything it cannot read (the record is then
//! dropped by the decoder). [`deserialize_lenient`] maps unreadable values to
//! `None` so the record survives and only the event-time consumers skip it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;

/// Nanoseconds since the Unix epoch -> UTC instant.
pub fn from_unix_nanos(nanos: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(nanos)
}

/// Parse a textual timestamp: RFC-3339 with offset, or a bare integer of epoch nanoseconds.
pub fn parse_ts_to_utc(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(nanos) = s.parse::<i64>() {
        return Some(from_unix_nanos(nanos));
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn from_json(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .map(from_unix_nanos),
        Value::String(s) => parse_ts_to_utc(s),
        _ => None,
    }
}

/// Serde adapter for a timestamp that must be present and readable.
pub fn deserialize_required<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    from_json(&value).ok_or_else(|| D::Error::custom(format!("unreadable timestamp: {value}")))
}

/// Serde adapter for an optional timestamp; unreadable values become `None`.
pub fn deserialize_lenient<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(from_json))
}
