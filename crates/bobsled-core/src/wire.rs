//! Lenient field decoders for the bobsled JSON API.
//!
//! The backend serializes its records with defaults rather than omissions
//! (`""` for unset timestamps, `null` for unset exit codes), and live patches
//! may carry partial or malformed fields. Every decoder here maps "unusable"
//! to absent instead of failing the whole payload.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::Status;

/// Decode any field, treating `null` and values of the wrong shape as absent.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// Decode a collection or flag, falling back to its default when unusable.
pub(crate) fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Decode a string field where `""` means absent.
pub(crate) fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text: Option<String> = lenient(deserializer)?;
    Ok(text.filter(|s| !s.is_empty()))
}

/// Decode a text buffer, treating `null` as empty.
pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    or_default(deserializer)
}

/// Decode the `enabled` flag; anything but a boolean counts as enabled.
pub(crate) fn enabled<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient(deserializer)?.unwrap_or(true))
}

/// Decode a timestamp; accepts RFC 3339 and naive ISO-8601 (taken as UTC).
pub(crate) fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(non_empty(deserializer)?.and_then(|s| parse_timestamp(&s)))
}

/// Decode a timeout in minutes; `0` means no timeout.
pub(crate) fn minutes<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let minutes: Option<u32> = lenient(deserializer)?;
    Ok(minutes.filter(|m| *m > 0))
}

/// Decode an entrypoint given either as a list or as one shell-ish string.
pub(crate) fn entrypoint<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let parts = match Value::deserialize(deserializer)? {
        Value::String(s) => s.split_whitespace().map(str::to_owned).collect(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(parts)
}

/// Decode a status; a name outside the taxonomy falls back to the default.
pub(crate) fn status<'de, D>(deserializer: D) -> Result<Status, D::Error>
where
    D: Deserializer<'de>,
{
    or_default(deserializer)
}

/// Decode a list element by element, skipping entries that do not decode.
pub(crate) fn items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items: Option<Vec<Value>> = lenient(deserializer)?;
    Ok(items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Decode a status history, skipping names outside the taxonomy.
pub(crate) fn statuses<'de, D>(deserializer: D) -> Result<Vec<Status>, D::Error>
where
    D: Deserializer<'de>,
{
    items(deserializer)
}

pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}
