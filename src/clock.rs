//! Timestamp encoding for persisted documents.
//! Fixed microsecond precision keeps lexical order equal to chronological order.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::Value;

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn encode(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Read a timestamp field from a stored value; anything unparsable is `None`.
pub fn from_value(v: Option<&Value>) -> Option<DateTime<Utc>> {
    v.and_then(Value::as_str).and_then(decode)
}

pub fn to_value(ts: DateTime<Utc>) -> Value {
    Value::String(encode(ts))
}

/// Current time, but strictly after `previous` at stored precision.
pub fn stamp_after(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = truncate(now());
    match previous {
        Some(prev) if now <= truncate(prev) => truncate(prev) + Duration::microseconds(1),
        _ => now,
    }
}

fn truncate(ts: DateTime<Utc>) -> DateTime<Utc> {
    decode(&encode(ts)).unwrap_or(ts)
}
