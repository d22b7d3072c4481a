// 🧾 Loose Records - the shape every source file decodes into
// Typed entities are built from these before any pipeline logic runs

use serde_json::{Map, Value};

/// One decoded source row: a JSON object or a CSV row keyed by header
pub type Record = Map<String, Value>;

/// Canonical printer reference key
pub const GROUP_ID: &str = "group_id";

/// Legacy casing found in some exports of the printer table
pub const GROUP_ID_LEGACY: &str = "group_ID";

/// Render an identifier value as a lookup key.
///
/// Strings are trimmed, numbers use their decimal form. Empty strings,
/// nulls and structured values are not identifiers.
pub fn key_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Coerce a year field (number or numeric string) to an integer
pub fn year_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Remove the first usable identifier found under any of `keys`.
///
/// Every listed key is removed from the record, so a record carrying both
/// casings does not keep a stale duplicate around after normalization.
pub fn take_key(record: &mut Record, keys: &[&str]) -> Option<String> {
    let mut found = None;
    for key in keys {
        if let Some(value) = record.remove(*key) {
            if found.is_none() {
                found = key_string(&value);
            }
        }
    }
    found
}

/// Remove a year field, keeping only values that parse
pub fn take_year(record: &mut Record, key: &str) -> Option<i64> {
    record.remove(key).as_ref().and_then(year_value)
}

/// Remove a text field; non-string scalars are rendered to text
pub fn take_text(record: &mut Record, key: &str) -> Option<String> {
    match record.remove(key)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Copy a legacy-cased group id onto the canonical key when the canonical one is absent
pub fn normalize_group_id(record: &mut Record) {
    let canonical_missing = record.get(GROUP_ID).and_then(key_string).is_none();
    if canonical_missing {
        if let Some(legacy) = record.get(GROUP_ID_LEGACY).cloned() {
            record.insert(GROUP_ID.to_string(), legacy);
        }
    }
}
