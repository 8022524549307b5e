//! Record normalizer.
//!
//! Inventory payloads name the same field differently across controller
//! releases. Each canonical field resolves from an ordered alias list; the
//! first present value wins. Nothing here fails: values that do not parse
//! degrade to the permissive default for their field.

use crate::types::{ImageRecord, RawRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

pub const ID_KEYS: &[&str] = &["imageUuid", "id", "imageId"];
pub const NAME_KEYS: &[&str] = &["name", "imageName"];
pub const VERSION_KEYS: &[&str] = &["version", "softwareVersion"];
pub const FAMILY_KEYS: &[&str] = &["family", "familyName"];
pub const TYPE_KEYS: &[&str] = &["imageType", "type"];
pub const GOLDEN_KEYS: &[&str] = &["isTaggedGolden", "isGolden", "golden"];
pub const CREATED_KEYS: &[&str] = &["createdTime", "importedDate", "lastUpdateTime"];
pub const USED_COUNT_KEYS: &[&str] = &["usedDevicesCount", "usingDeviceCount", "deviceCount"];

/// Epoch values above this are milliseconds, below are seconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e10;

/// Normalize one raw inventory entry.
pub fn normalize(raw: &RawRecord) -> ImageRecord {
    ImageRecord {
        id: first_present(raw, ID_KEYS).and_then(string_value),
        name: text_field(raw, NAME_KEYS),
        version: text_field(raw, VERSION_KEYS),
        family: text_field(raw, FAMILY_KEYS),
        image_type: text_field(raw, TYPE_KEYS),
        is_golden: first_present(raw, GOLDEN_KEYS).is_some_and(truthy),
        used_device_count: first_present(raw, USED_COUNT_KEYS)
            .map(parse_count)
            .unwrap_or(0),
        created_at: first_present(raw, CREATED_KEYS).and_then(parse_timestamp),
    }
}

/// Normalize a whole inventory, preserving order.
pub fn normalize_all(raw: &[RawRecord]) -> Vec<ImageRecord> {
    raw.iter().map(normalize).collect()
}

/// First alias whose value is neither missing, null, nor an empty string.
fn first_present<'a>(raw: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| raw.get(*k)).find(|v| match v {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

fn text_field(raw: &RawRecord, keys: &[&str]) -> String {
    first_present(raw, keys)
        .and_then(string_value)
        .unwrap_or_default()
}

fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Loose boolean reading of a JSON value.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "t" | "yes" | "y" | "1"
        ),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Device usage count. Anything that is not a non-negative integer reads as 0.
pub fn parse_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<u64>().unwrap_or(0),
        Value::Bool(true) => 1,
        _ => 0,
    }
}

/// Creation timestamp from epoch seconds, epoch milliseconds, or ISO-8601.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let raw = n.as_f64().filter(|f| f.is_finite())?;
            let whole = raw.trunc() as i64;
            if raw > EPOCH_MILLIS_THRESHOLD {
                DateTime::from_timestamp_millis(whole)
            } else {
                DateTime::from_timestamp(whole, 0)
            }
        }
        Value::String(s) => parse_iso8601(s),
        _ => None,
    }
}

fn parse_iso8601(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();
    let text = match trimmed.strip_suffix('Z') {
        Some(rest) => format!("{rest}+00:00"),
        None => trimmed.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(&text, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    // No offset: read as UTC.
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&text, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
