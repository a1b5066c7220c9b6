//! Tolerant readers for fields of stored documents.
//!
//! Documents in the record store are written by more than one client and
//! are not schema-checked, so money, text and date fields are coerced into
//! safe defaults instead of failing the whole record.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Reads a money field; numbers and numeric strings are accepted, anything
/// else reads as zero.
pub(crate) fn decimal_or_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_decimal).unwrap_or(Decimal::ZERO))
}

/// Reads a text field; numbers are stringified, anything else is empty.
pub(crate) fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_text).unwrap_or_default())
}

/// Reads an optional text field; non-text values become `None`.
pub(crate) fn text_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_text))
}

pub(crate) fn coerce_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Folds an older key spelling into its canonical key.
///
/// The legacy key is always removed; its value is kept only when the
/// canonical key is missing or null.
pub(crate) fn adopt_legacy_key(doc: &mut Map<String, Value>, legacy: &str, canonical: &str) {
    let Some(value) = doc.remove(legacy) else {
        return;
    };
    if doc.get(canonical).map_or(true, Value::is_null) {
        doc.insert(canonical.to_string(), value);
    }
}

/// Parses a stored timestamp.
///
/// Accepts RFC 3339 (`2024-03-01T10:00:00.000Z`), a naive ISO date-time
/// (read as UTC) and a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Formats an instant the way stored documents carry it.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
