//! Decoding of `createdAt` values

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use super::StoreError;

/// Decode a document timestamp.
///
/// Accepts RFC 3339 strings, epoch milliseconds, and extended JSON dates
/// (`{"$date": "..."}`, `{"$date": 1700000000000}`,
/// `{"$date": {"$numberLong": "1700000000000"}}`).
pub fn parse_created_at(value: &Value) -> Result<DateTime<Utc>, StoreError> {
    match value {
        Value::String(s) => parse_rfc3339(s),
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .ok_or_else(|| StoreError::MalformedData(format!("{} is not epoch millis", n)))?;
            from_millis(millis)
        }
        Value::Object(map) => {
            if let Some(date) = map.get("$date") {
                return parse_created_at(date);
            }
            if let Some(Value::String(long)) = map.get("$numberLong") {
                let millis = long.parse::<i64>().map_err(|e| {
                    StoreError::MalformedData(format!("bad $numberLong {:?}: {}", long, e))
                })?;
                return from_millis(millis);
            }
            Err(StoreError::MalformedData(format!(
                "unrecognized timestamp object {}",
                value
            )))
        }
        Value::Null => Err(StoreError::MalformedData("createdAt is null".to_string())),
        other => Err(StoreError::MalformedData(format!(
            "unsupported createdAt value {}",
            other
        ))),
    }
}

fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::MalformedData(format!("bad timestamp {:?}: {}", s, e)))
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, StoreError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StoreError::MalformedData(format!("{} is out of range", millis)))
}
