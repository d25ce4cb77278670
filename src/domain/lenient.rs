//! Tolerant deserializers for loosely-typed procurement documents.
//!
//! Published OCDS data is frequently incomplete or inconsistent. A missing or
//! malformed nested field must never fail the surrounding record, so these
//! helpers degrade to `None` or an empty list instead of returning an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;

/// Parses a timestamp in any of the shapes seen in procurement feeds.
///
/// Accepts RFC 3339 (with offset), naive date-times (assumed UTC) and bare
/// dates (midnight UTC). Returns `None` for anything else.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// A list whose malformed entries are skipped.
///
/// `null`, a missing field, or a non-array value all yield an empty list.
pub mod seq {
    use super::{Deserialize, DeserializeOwned, Deserializer, Value};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(entries(value))
    }

    /// Decodes each array entry independently, dropping the ones that fail.
    pub fn entries<T: DeserializeOwned>(value: Value) -> Vec<T> {
        match value {
            Value::Array(entries) => entries
                .into_iter()
                .filter_map(|entry| match serde_json::from_value(entry) {
                    Ok(decoded) => Some(decoded),
                    Err(error) => {
                        tracing::warn!(%error, "skipping malformed entry");
                        None
                    }
                })
                .collect(),
            Value::Null => Vec::new(),
            other => {
                tracing::warn!(kind = kind_of(&other), "expected a list");
                Vec::new()
            }
        }
    }

    const fn kind_of(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

/// An optional value that becomes `None` when it cannot be decoded.
pub mod opt {
    use super::{Deserialize, DeserializeOwned, Deserializer, Value};

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(None);
        }

        Ok(serde_json::from_value(value)
            .map_err(|error| tracing::debug!(%error, "discarding malformed field"))
            .ok())
    }
}

/// Free text that may also be published as a number or boolean.
///
/// Objects and arrays become `None`.
pub mod text {
    use super::{Deserialize, Deserializer, Value};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(text) => Some(text),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            Value::Null => None,
            other => {
                tracing::debug!(%other, "discarding non-text field");
                None
            }
        })
    }
}

/// A number that may also be published as a numeric string.
pub mod number {
    use super::{Deserialize, Deserializer, Value};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|number| number.is_finite()))
    }
}

/// A timestamp parsed with [`parse_timestamp`](super::parse_timestamp).
pub mod timestamp {
    use super::{DateTime, Deserialize, Deserializer, Utc, Value};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().and_then(super::parse_timestamp))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "seq::deserialize")]
        entries: Vec<u32>,
        #[serde(default, deserialize_with = "number::deserialize")]
        amount: Option<f64>,
        #[serde(default, deserialize_with = "timestamp::deserialize")]
        when: Option<DateTime<Utc>>,
        #[serde(default, deserialize_with = "opt::deserialize")]
        nested: Option<Nested>,
        #[serde(default, deserialize_with = "text::deserialize")]
        label: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct Nested {
        name: String,
    }

    #[test]
    fn missing_fields_use_defaults() {
        let sample: Sample = serde_json::from_value(json!({})).unwrap();
        assert!(sample.entries.is_empty());
        assert!(sample.amount.is_none());
        assert!(sample.when.is_none());
        assert!(sample.nested.is_none());
    }

    #[test]
    fn malformed_fields_degrade() {
        let sample: Sample = serde_json::from_value(json!({
            "entries": [1, "two", 3],
            "amount": "not a number",
            "when": 17,
            "nested": {"name": 42}
        }))
        .unwrap();

        assert_eq!(sample.entries, vec![1, 3]);
        assert!(sample.amount.is_none());
        assert!(sample.when.is_none());
        assert!(sample.nested.is_none());
    }

    #[test]
    fn text_accepts_scalars_only() {
        let label = |value: Value| {
            serde_json::from_value::<Sample>(json!({ "label": value }))
                .unwrap()
                .label
        };
        assert_eq!(label(json!("Road works")), Some("Road works".to_string()));
        assert_eq!(label(json!(2024)), Some("2024".to_string()));
        assert_eq!(label(json!(false)), Some("false".to_string()));
        assert_eq!(label(json!({"en": "Road works"})), None);
        assert_eq!(label(json!(["a"])), None);
        assert_eq!(label(json!(null)), None);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let sample: Sample = serde_json::from_value(json!({"amount": " 1250.5 "})).unwrap();
        assert_eq!(sample.amount, Some(1250.5));
    }

    #[test]
    fn non_array_list_is_empty() {
        let sample: Sample = serde_json::from_value(json!({"entries": {"details": []}})).unwrap();
        assert!(sample.entries.is_empty());
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse_timestamp("2024-03-01T10:00:00+02:00").unwrap();
        assert_eq!(parsed.hour(), 8);
    }

    #[test]
    fn parses_naive_datetime_and_date() {
        let naive = parse_timestamp("2023-11-05T07:30:00").unwrap();
        assert_eq!(naive.day(), 5);
        assert_eq!(naive.hour(), 7);

        let date = parse_timestamp("2023-11-05").unwrap();
        assert_eq!(date.hour(), 0);
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
